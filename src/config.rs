use crate::iac::{Provider, PulumiRuntime};
use crate::naming::{self, NameStyle, NamingError};
use crate::pipelines::Framework;
use serde::{Deserialize, Serialize};

/// Default configuration filename written by `andamio init`
pub const CONFIG_FILENAME: &str = "andamio.toml";

/// Andamio project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AndamioConfig {
    /// Configuration file version
    pub version: String,

    /// Project metadata
    pub project: ProjectConfig,

    /// Infrastructure provisioning settings
    pub infra: InfraConfig,

    /// Pipeline scaffolding settings
    pub pipeline: PipelineConfig,
}

impl Default for AndamioConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            project: ProjectConfig::default(),
            infra: InfraConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Cloud project ID resources are provisioned in
    pub project_id: String,

    /// Name of the model the pipeline serves
    pub model_name: String,

    /// Default region for regional resources
    pub region: String,

    /// Stack environment (dev, staging, prod)
    pub environment: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project_id: "my-project".to_string(),
            model_name: "my-model".to_string(),
            region: "us-central1".to_string(),
            environment: "dev".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfraConfig {
    /// IaC provider to render for
    pub provider: Provider,

    /// Pulumi program runtime
    pub pulumi_runtime: PulumiRuntime,

    /// Storage bucket for pipeline artifacts (derived from the project and
    /// model when unset)
    pub bucket_name: Option<String>,

    /// Artifact registry holding component images
    pub artifact_repo_name: Option<String>,

    /// Source repository the build trigger watches
    pub source_repo_name: Option<String>,

    /// Task queue used for scheduled pipeline submissions
    pub task_queue_name: Option<String>,

    /// Build trigger that rebuilds component images
    pub build_trigger_name: Option<String>,

    /// Branch the build trigger watches
    pub build_branch: String,
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Pulumi,
            pulumi_runtime: PulumiRuntime::Python,
            bucket_name: None,
            artifact_repo_name: None,
            source_repo_name: None,
            task_queue_name: None,
            build_trigger_name: None,
            build_branch: "main".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline framework to scaffold for
    pub framework: Framework,

    /// Base image for the component container
    pub base_image: String,

    /// Pipeline display name (derived from the model when unset)
    pub name: Option<String>,

    /// Directory component specs are read from
    pub components_dir: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            framework: Framework::Kfp,
            base_image: "python:3.10-slim".to_string(),
            name: None,
            components_dir: "component_specs".to_string(),
        }
    }
}

/// Sanitized resource names derived from a configuration.
///
/// Each field has already been through the naming style its resource kind
/// requires; renderers interpolate these verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    /// Snake-case model identifier
    pub model: String,
    /// Artifact bucket (hyphens kept)
    pub bucket: String,
    /// Kebab-case artifact registry name
    pub artifact_repo: String,
    /// Kebab-case source repository name
    pub source_repo: String,
    /// Kebab-case task queue name
    pub task_queue: String,
    /// Kebab-case build trigger name
    pub build_trigger: String,
    /// Kebab-case pipeline display name
    pub pipeline: String,
}

impl AndamioConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Derive the sanitized resource names for this configuration.
    ///
    /// Unset optional names fall back to deterministic `<model>`-derived
    /// defaults, so a minimal config (project + model) provisions a complete
    /// stack.
    pub fn resource_names(&self) -> Result<ResourceNames, NamingError> {
        let model = naming::resource_name(&self.project.model_name, NameStyle::Snake)?;

        let bucket_raw = match &self.infra.bucket_name {
            Some(name) => name.clone(),
            None => format!(
                "{}-{}-artifacts",
                self.project.project_id, self.project.model_name
            ),
        };

        let kebab = |explicit: &Option<String>, suffix: &str| -> Result<String, NamingError> {
            let raw = match explicit {
                Some(name) => name.clone(),
                None => format!("{}-{}", self.project.model_name, suffix),
            };
            naming::resource_name(&raw, NameStyle::Kebab)
        };

        Ok(ResourceNames {
            model,
            bucket: naming::resource_name(&bucket_raw, NameStyle::Bucket)?,
            artifact_repo: kebab(&self.infra.artifact_repo_name, "artifact-registry")?,
            source_repo: kebab(&self.infra.source_repo_name, "repository")?,
            task_queue: kebab(&self.infra.task_queue_name, "queue")?,
            build_trigger: kebab(&self.infra.build_trigger_name, "build-trigger")?,
            pipeline: kebab(&self.pipeline.name, "pipeline")?,
        })
    }
}
