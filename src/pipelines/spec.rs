//! Component spec model
//!
//! The YAML a user authors to describe one pipeline component: name,
//! typed inputs/outputs, and the container that executes it. The shape
//! follows the Kubeflow Pipelines component schema, so existing component
//! files load unchanged.

use crate::naming::{self, NameStyle, NamingError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors produced while loading or validating a component spec
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("reading component spec: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing component spec: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("component '{name}': {source}")]
    InvalidName {
        name: String,
        source: NamingError,
    },

    #[error("component '{component}': parameter '{parameter}' is not a valid Python identifier")]
    InvalidParameter {
        component: String,
        parameter: String,
    },
}

/// Parameter type vocabulary of the component schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterType {
    String,
    Integer,
    Float,
    Boolean,
    Dict,
    List,
}

impl ParameterType {
    /// Python type annotation used in generated sources
    pub fn python_annotation(&self) -> &'static str {
        match self {
            ParameterType::String => "str",
            ParameterType::Integer => "int",
            ParameterType::Float => "float",
            ParameterType::Boolean => "bool",
            ParameterType::Dict => "dict",
            ParameterType::List => "list",
        }
    }
}

/// One typed input or output parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "type")]
    pub param_type: ParameterType,
}

/// Container block of a component implementation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub image: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<serde_yaml::Value>,
}

/// Implementation block of a component spec
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImplementationSpec {
    pub container: ContainerSpec,
}

/// A user-authored component spec
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<ParameterSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<ParameterSpec>,

    pub implementation: ImplementationSpec,
}

impl ComponentSpec {
    /// Load and validate a component spec from a YAML file
    pub fn load(path: &Path) -> Result<Self, SpecError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate a component spec from YAML text
    pub fn parse(content: &str) -> Result<Self, SpecError> {
        let spec: Self = serde_yaml::from_str(content)?;
        spec.validate()?;
        Ok(spec)
    }

    /// The sanitized snake_case component name used for directories,
    /// files and the generated task function
    pub fn task_name(&self) -> Result<String, SpecError> {
        naming::resource_name(&self.name, NameStyle::Snake).map_err(|source| {
            SpecError::InvalidName {
                name: self.name.clone(),
                source,
            }
        })
    }

    /// Inline Python task source carried in the container command, if any.
    /// Components authored without inline source get a stub generated from
    /// their input signature instead.
    pub fn inline_source(&self) -> Option<&str> {
        let task = self.task_name().ok()?;
        let needle = format!("def {}(", task);
        self.implementation
            .container
            .command
            .iter()
            .map(String::as_str)
            .find(|cmd| cmd.contains(&needle))
    }

    fn validate(&self) -> Result<(), SpecError> {
        let task = self.task_name()?;
        for parameter in self.inputs.iter().chain(self.outputs.iter()) {
            if !naming::is_python_identifier(&parameter.name) {
                return Err(SpecError::InvalidParameter {
                    component: task,
                    parameter: parameter.name.clone(),
                });
            }
        }
        Ok(())
    }
}
