//! # Walker Module
//!
//! Attraversamento ricorsivo della directory radice:
//! - `directory_walker`: probe → listing → elaborazione per voce → ritorno
//!
//! Il walk è sequenziale e depth-first; i contatori viaggiano per valore
//! lungo lo stack delle chiamate.

pub mod directory_walker;

pub use directory_walker::DirectoryWalker;
