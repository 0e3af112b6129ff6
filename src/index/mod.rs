//! Index persistence: the in-memory store and its on-disk artifacts.

pub mod artifacts;
pub mod store;

pub use store::IndexStore;
