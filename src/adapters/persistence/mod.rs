//! Persistence Adapters - JSONL-based File Storage
//!
//! Implements the `PickRepository` port with an append-only JSONL
//! file. No database dependency on the write side.

pub mod picks;

pub use picks::JsonlPickStore;
