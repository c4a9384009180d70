//! Generic project tree model.
//!
//! # Responsibility
//! - Define the node/param/value shapes every other layer operates on.
//! - Own identifier bookkeeping for a parsed document.
//!
//! # Invariants
//! - The model has no tag allow-list; domain meaning lives in `view`.
//! - Every node keeps enough source text to reproduce itself unchanged.

pub mod document;
pub mod guid;
pub mod node;
pub mod value;
