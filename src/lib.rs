#![allow(dead_code)]

// Library exports for the andamio scaffolding generator
pub mod config;
pub mod emitter;
pub mod iac;
pub mod naming;
pub mod pipelines;

// Re-export key types for convenience
pub use config::{AndamioConfig, ResourceNames, CONFIG_FILENAME};
pub use emitter::{FileSet, GeneratedFile};
pub use iac::{Provider, PulumiRuntime, RenderError};
pub use naming::{NameStyle, NamingError};
pub use pipelines::{Framework, PipelineError};
