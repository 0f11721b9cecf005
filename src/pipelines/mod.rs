//! Pipeline framework scaffolding
//!
//! Renders the framework-side half of the generator: component manifests,
//! their Python task sources, the pipeline definition, and the submission
//! service. Kubeflow Pipelines is the only framework currently wired in;
//! the enum is the seam for others.

pub mod cloudrun;
pub mod component;
pub mod pipeline;
pub mod spec;

use crate::config::AndamioConfig;
use crate::emitter::{EmitError, FileSet};
use crate::naming::NamingError;
use serde::{Deserialize, Serialize};
use self::spec::{ComponentSpec, SpecError};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Errors produced while scaffolding pipeline artifacts
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Naming(#[from] NamingError),

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error("unknown framework: {0}. Use: kfp")]
    UnknownFramework(String),
}

/// Pipeline framework to scaffold for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Kfp,
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Framework::Kfp => write!(f, "kfp"),
        }
    }
}

impl FromStr for Framework {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kfp" | "kubeflow" => Ok(Framework::Kfp),
            _ => Err(PipelineError::UnknownFramework(s.to_string())),
        }
    }
}

/// Render every framework artifact for the given component specs:
/// one manifest + task source per component, the shared component base,
/// the pipeline definition and runner, and the Cloud Run submission
/// service.
pub fn scaffold(
    config: &AndamioConfig,
    specs: &[ComponentSpec],
) -> Result<FileSet, PipelineError> {
    match config.pipeline.framework {
        Framework::Kfp => {
            info!("scaffolding kfp artifacts for {} component(s)", specs.len());
            let mut files = FileSet::new();
            for spec in specs {
                files.merge(component::build_component(spec, config)?)?;
            }
            files.merge(component::build_component_base(config)?)?;
            files.merge(pipeline::build_pipeline(config, specs)?)?;
            files.merge(cloudrun::build_cloudrun(config)?)?;
            Ok(files)
        }
    }
}
