//! Adapters for the primary store and the reporting mirror.

pub mod memory;
pub mod postgrest;
pub mod sheets;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;
pub use sheets::{NoopMirror, SheetsWebhookSink};
