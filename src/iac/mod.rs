//! Infrastructure-as-code rendering
//!
//! Turns a validated [`AndamioConfig`](crate::config::AndamioConfig) into
//! provider-specific stack definitions. The typed resource model and its
//! dependency ordering live in [`resources`]; [`pulumi`] renders that model
//! into a Pulumi project.

pub mod pulumi;
pub mod resources;

use crate::config::AndamioConfig;
use crate::emitter::{EmitError, FileSet};
use crate::naming::NamingError;
use self::resources::ResourceError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Errors produced while rendering infrastructure definitions
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Naming(#[from] NamingError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error("unknown provider: {0}. Use: pulumi")]
    UnknownProvider(String),

    #[error("unknown pulumi runtime: {0}. Use: python, nodejs, go")]
    UnknownRuntime(String),
}

/// IaC provider the generator renders for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Pulumi,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Pulumi => write!(f, "pulumi"),
        }
    }
}

impl FromStr for Provider {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pulumi" => Ok(Provider::Pulumi),
            _ => Err(RenderError::UnknownProvider(s.to_string())),
        }
    }
}

/// Pulumi program runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PulumiRuntime {
    Python,
    Nodejs,
    Go,
}

impl PulumiRuntime {
    /// Runtime name as it appears in Pulumi.yaml
    pub fn as_str(&self) -> &'static str {
        match self {
            PulumiRuntime::Python => "python",
            PulumiRuntime::Nodejs => "nodejs",
            PulumiRuntime::Go => "go",
        }
    }
}

impl std::fmt::Display for PulumiRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PulumiRuntime {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "python" | "py" => Ok(PulumiRuntime::Python),
            "nodejs" | "node" => Ok(PulumiRuntime::Nodejs),
            "go" => Ok(PulumiRuntime::Go),
            _ => Err(RenderError::UnknownRuntime(s.to_string())),
        }
    }
}

/// Render the infrastructure definitions for the configured provider
pub fn provision(config: &AndamioConfig) -> Result<FileSet, RenderError> {
    match config.infra.provider {
        Provider::Pulumi => {
            info!(
                "rendering pulumi stack for model '{}'",
                config.project.model_name
            );
            pulumi::render(config)
        }
    }
}
