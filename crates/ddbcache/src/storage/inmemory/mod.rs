//! In-memory item backend.

mod backend;

pub use backend::InMemoryBackend;
