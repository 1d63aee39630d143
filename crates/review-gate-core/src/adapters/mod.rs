//! # Infrastructure Adapters
//!
//! Concrete implementations of the store, debug sink and review backend traits.

pub mod filesystem_debug;
pub mod http_review;
pub mod memory_store;

pub use filesystem_debug::FilesystemDebugSink;
pub use http_review::HttpReviewForwarder;
pub use memory_store::InMemoryStore;
