pub mod memory;
pub mod persistent;
pub mod rest;

pub use memory::MemoryStore;
pub use persistent::PersistentStore;
pub use rest::{RestConfig, RestStore};
