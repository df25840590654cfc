//! Integration test crate for Tactline.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on the tactline crates to verify they work together.

#[cfg(test)]
mod timeline;

#[cfg(test)]
mod audio;
