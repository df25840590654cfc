//! Single-slot block clipboard.

use crate::block::BlockState;

#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    content: Option<BlockState>,
}

impl Clipboard {
    /// Store a copy of a block. The stored state carries no identity.
    pub fn store(&mut self, state: BlockState) {
        self.content = Some(state.detached());
    }

    pub fn content(&self) -> Option<&BlockState> {
        self.content.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none()
    }

    pub fn clear(&mut self) {
        self.content = None;
    }
}
