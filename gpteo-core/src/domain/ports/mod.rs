// gpteo-core/src/domain/ports/mod.rs

pub mod registry;
pub mod renderer;

pub use registry::RegistrySource;
pub use renderer::FixRenderer;
