pub mod preferences;
pub mod store;

pub use preferences::{EngineConfig, Preferences};
pub use store::{ConfigStore, JsonFileStore, MemoryStore, StoreError};
