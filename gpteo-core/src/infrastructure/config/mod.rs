// gpteo-core/src/infrastructure/config/mod.rs

pub mod registry;
pub mod settings;

pub use registry::{YamlRegistrySource, registry_source};
pub use settings::{
    FetchSettings, ModeTimeouts, QueueSettings, RegistrySettings, Settings, StoreBackend,
    StoreSettings, load_settings,
};
