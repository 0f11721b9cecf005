//! Component manifest and task source rendering
//!
//! One component spec becomes two files: the manifest under
//! `components/<task>/component.yaml` with the image pinned to the
//! configured artifact registry, and the Python task source under the
//! shared `components/component_base/src/` tree. The component base
//! (Dockerfile + requirements) is rendered once per run.

use crate::config::AndamioConfig;
use crate::emitter::{generated_banner, FileSet};
use crate::pipelines::spec::{ComponentSpec, SpecError};
use crate::pipelines::PipelineError;
use std::path::PathBuf;

/// Image path components are built and pulled from
pub fn component_image(config: &AndamioConfig) -> Result<String, PipelineError> {
    let names = config.resource_names()?;
    Ok(format!(
        "{}-docker.pkg.dev/{}/{}/components/component_base:latest",
        config.project.region, config.project.project_id, names.artifact_repo
    ))
}

/// Render the manifest and task source for one component
pub fn build_component(
    spec: &ComponentSpec,
    config: &AndamioConfig,
) -> Result<FileSet, PipelineError> {
    let task = spec.task_name()?;

    let mut manifest = spec.clone();
    manifest.implementation.container.image = component_image(config)?;
    if manifest.implementation.container.command.is_empty() {
        manifest.implementation.container.command = vec![
            "python3".to_string(),
            format!("/pipelines/component/src/{}.py", task),
        ];
    }
    if manifest.implementation.container.args.is_empty() {
        let mut executor_input = serde_yaml::Mapping::new();
        executor_input.insert("executorInput".into(), serde_yaml::Value::Null);
        manifest.implementation.container.args = vec![
            serde_yaml::Value::from("--executor_input"),
            serde_yaml::Value::Mapping(executor_input),
            serde_yaml::Value::from("--function_to_execute"),
            serde_yaml::Value::from(task.clone()),
        ];
    }

    let yaml = serde_yaml::to_string(&manifest).map_err(SpecError::from)?;

    let mut files = FileSet::new();
    files.push(
        PathBuf::from("components").join(&task).join("component.yaml"),
        format!("{}{}", generated_banner("#"), yaml),
    )?;
    files.push(
        PathBuf::from("components/component_base/src").join(format!("{}.py", task)),
        render_task_source(spec, &task),
    )?;
    Ok(files)
}

/// Render the shared component base image context
pub fn build_component_base(config: &AndamioConfig) -> Result<FileSet, PipelineError> {
    let banner = generated_banner("#");

    let dockerfile = format!(
        "{banner}FROM {base}\n\
         \n\
         RUN python -m pip install --upgrade pip\n\
         COPY requirements.txt .\n\
         RUN python -m pip install --no-cache-dir -r requirements.txt\n\
         \n\
         COPY src /pipelines/component/src\n",
        banner = banner,
        base = config.pipeline.base_image
    );

    let requirements = format!(
        "{banner}kfp\n\
         google-cloud-aiplatform\n\
         google-cloud-storage\n\
         pyyaml\n",
        banner = banner
    );

    let mut files = FileSet::new();
    files.push("components/component_base/Dockerfile", dockerfile)?;
    files.push("components/component_base/requirements.txt", requirements)?;
    Ok(files)
}

/// The Python source backing a component: the inline source carried in the
/// spec when present, otherwise a stub with the spec's signature.
fn render_task_source(spec: &ComponentSpec, task: &str) -> String {
    let mut out = generated_banner("#");
    match spec.inline_source() {
        Some(source) => {
            out.push_str(source);
            if !source.ends_with('\n') {
                out.push('\n');
            }
        }
        None => out.push_str(&render_stub(spec, task)),
    }
    out
}

fn render_stub(spec: &ComponentSpec, task: &str) -> String {
    let mut out = format!("def {}(\n", task);
    for input in &spec.inputs {
        out.push_str(&format!(
            "    {}: {},\n",
            input.name,
            input.param_type.python_annotation()
        ));
    }
    out.push_str("):\n");

    // docstring from the spec's description and parameter docs
    out.push_str(&format!(
        "    \"\"\"{}\n",
        spec.description.as_deref().unwrap_or("Pipeline component.")
    ));
    if !spec.inputs.is_empty() {
        out.push_str("\n    Args:\n");
        for input in &spec.inputs {
            out.push_str(&format!(
                "        {}: {}\n",
                input.name,
                input.description.as_deref().unwrap_or("No description provided.")
            ));
        }
    }
    out.push_str("    \"\"\"\n");
    out.push_str(&format!(
        "    raise NotImplementedError(\"implement {}\")\n",
        task
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AndamioConfig {
        let mut config = AndamioConfig::default();
        config.project.project_id = "acme-ml".to_string();
        config.project.model_name = "churn-predictor".to_string();
        config
    }

    fn spec_with_source() -> ComponentSpec {
        ComponentSpec::parse(
            r#"
name: create_dataset
description: Writes the dataset out as CSV.
inputs:
  - name: data_path
    description: Where the CSV lands.
    type: String
implementation:
  container:
    image: TBD
    command:
      - sh
      - -c
      - |
        def create_dataset(
            data_path: str,
        ):
            write_csv(data_path)
"#,
        )
        .unwrap()
    }

    fn spec_without_source() -> ComponentSpec {
        ComponentSpec::parse(
            r#"
name: train_model
description: Trains the model.
inputs:
  - name: epochs
    type: Integer
  - name: learning_rate
    type: Float
implementation:
  container:
    image: TBD
"#,
        )
        .unwrap()
    }

    // ========================================================================
    // IMAGE TESTS
    // ========================================================================

    #[test]
    fn test_component_image_path() {
        let image = component_image(&test_config()).unwrap();
        assert_eq!(
            image,
            "us-central1-docker.pkg.dev/acme-ml/churn-predictor-artifact-registry/components/component_base:latest"
        );
    }

    // ========================================================================
    // MANIFEST TESTS
    // ========================================================================

    #[test]
    fn test_build_component_paths() {
        let files = build_component(&spec_with_source(), &test_config()).unwrap();

        assert_eq!(files.len(), 2);
        assert!(files.contains("components/create_dataset/component.yaml"));
        assert!(files.contains("components/component_base/src/create_dataset.py"));
    }

    #[test]
    fn test_manifest_pins_image() {
        let files = build_component(&spec_with_source(), &test_config()).unwrap();
        let yaml = files.get("components/create_dataset/component.yaml").unwrap();

        assert!(!yaml.contains("image: TBD"));
        assert!(yaml.contains("us-central1-docker.pkg.dev/acme-ml/"));
    }

    #[test]
    fn test_manifest_defaults_command_and_args() {
        let files = build_component(&spec_without_source(), &test_config()).unwrap();
        let yaml = files.get("components/train_model/component.yaml").unwrap();

        assert!(yaml.contains("/pipelines/component/src/train_model.py"));
        assert!(yaml.contains("--function_to_execute"));
        assert!(yaml.contains("train_model"));
    }

    #[test]
    fn test_manifest_roundtrips_as_yaml() {
        let files = build_component(&spec_with_source(), &test_config()).unwrap();
        let yaml = files.get("components/create_dataset/component.yaml").unwrap();

        // banner lines are comments, so the manifest stays parseable
        let reparsed = ComponentSpec::parse(yaml).unwrap();
        assert_eq!(reparsed.name, "create_dataset");
    }

    // ========================================================================
    // TASK SOURCE TESTS
    // ========================================================================

    #[test]
    fn test_task_source_inline() {
        let files = build_component(&spec_with_source(), &test_config()).unwrap();
        let py = files.get("components/component_base/src/create_dataset.py").unwrap();

        assert!(py.starts_with("# Generated by andamio"));
        assert!(py.contains("def create_dataset("));
        assert!(py.contains("write_csv(data_path)"));
    }

    #[test]
    fn test_task_source_stub() {
        let files = build_component(&spec_without_source(), &test_config()).unwrap();
        let py = files.get("components/component_base/src/train_model.py").unwrap();

        assert!(py.contains("def train_model("));
        assert!(py.contains("epochs: int,"));
        assert!(py.contains("learning_rate: float,"));
        assert!(py.contains("\"\"\"Trains the model."));
        assert!(py.contains("raise NotImplementedError(\"implement train_model\")"));
    }

    // ========================================================================
    // COMPONENT BASE TESTS
    // ========================================================================

    #[test]
    fn test_component_base_files() {
        let files = build_component_base(&test_config()).unwrap();

        let dockerfile = files.get("components/component_base/Dockerfile").unwrap();
        assert!(dockerfile.contains("FROM python:3.10-slim"));
        assert!(dockerfile.contains("COPY src /pipelines/component/src"));

        let requirements = files.get("components/component_base/requirements.txt").unwrap();
        assert!(requirements.contains("google-cloud-aiplatform"));
    }
}
