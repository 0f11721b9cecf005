//! Pipeline definition and runner rendering
//!
//! Emits the `pipelines/` tree: a KFP v2 pipeline that loads every
//! generated component manifest and chains the tasks in spec order, the
//! runner that submits the compiled spec as a PipelineJob, a starter
//! runtime parameter file, and the Python requirements.

use crate::config::AndamioConfig;
use crate::emitter::{generated_banner, FileSet};
use crate::pipelines::spec::{ComponentSpec, ParameterSpec, ParameterType};
use crate::pipelines::PipelineError;
use tracing::warn;

/// Render the pipeline scaffolding for the given components
pub fn build_pipeline(
    config: &AndamioConfig,
    specs: &[ComponentSpec],
) -> Result<FileSet, PipelineError> {
    let names = config.resource_names()?;
    let tasks: Vec<(String, &ComponentSpec)> = specs
        .iter()
        .map(|spec| -> Result<(String, &ComponentSpec), PipelineError> {
            Ok((spec.task_name()?, spec))
        })
        .collect::<Result<_, _>>()?;
    let parameters = pipeline_parameters(&tasks);

    let mut files = FileSet::new();
    files.push(
        "pipelines/pipeline.py",
        render_pipeline_py(&names.pipeline, &names.model, &tasks, &parameters),
    )?;
    files.push(
        "pipelines/pipeline_runner.py",
        render_runner_py(config, &names.pipeline, &names.bucket),
    )?;
    files.push(
        "pipelines/runtime_parameters/pipeline_parameter_values.yaml",
        render_parameter_values(&parameters),
    )?;
    files.push(
        "pipelines/requirements.txt",
        format!(
            "{}kfp\ngoogle-cloud-aiplatform\npyyaml\n",
            generated_banner("#")
        ),
    )?;
    Ok(files)
}

/// Union of all component inputs, first occurrence wins. A name reused
/// with a different type keeps the first type; the mismatch is logged.
fn pipeline_parameters<'a>(
    tasks: &[(String, &'a ComponentSpec)],
) -> Vec<&'a ParameterSpec> {
    let mut parameters: Vec<&ParameterSpec> = Vec::new();
    for (task, spec) in tasks {
        for input in &spec.inputs {
            match parameters.iter().find(|p| p.name == input.name) {
                None => parameters.push(input),
                Some(existing) if existing.param_type != input.param_type => {
                    warn!(
                        "component '{}' redeclares parameter '{}' as {:?} (keeping {:?})",
                        task, input.name, input.param_type, existing.param_type
                    );
                }
                Some(_) => {}
            }
        }
    }
    parameters
}

fn render_pipeline_py(
    pipeline_name: &str,
    model: &str,
    tasks: &[(String, &ComponentSpec)],
    parameters: &[&ParameterSpec],
) -> String {
    let mut out = generated_banner("#");
    out.push_str("import argparse\n\nimport kfp\nfrom kfp import compiler, dsl\n\n");

    for (task, _) in tasks {
        out.push_str(&format!(
            "{task} = kfp.components.load_component_from_file(\n\
             \x20   \"components/{task}/component.yaml\"\n\
             )\n",
            task = task
        ));
    }

    out.push_str(&format!(
        "\n\n@dsl.pipeline(\n\
         \x20   name=\"{name}\",\n\
         \x20   description=\"Training pipeline for the {model} model.\",\n\
         )\n",
        name = pipeline_name,
        model = model
    ));
    out.push_str("def pipeline(\n");
    for parameter in parameters {
        out.push_str(&format!(
            "    {}: {},\n",
            parameter.name,
            parameter.param_type.python_annotation()
        ));
    }
    out.push_str("):\n");

    if tasks.is_empty() {
        out.push_str("    pass\n");
    }
    let mut previous: Option<&str> = None;
    for (task, spec) in tasks {
        out.push_str(&format!("    {}_task = {}(\n", task, task));
        for input in &spec.inputs {
            out.push_str(&format!("        {name}={name},\n", name = input.name));
        }
        out.push_str("    )");
        if let Some(prev) = previous {
            out.push_str(&format!(".after({}_task)", prev));
        }
        out.push('\n');
        previous = Some(task);
    }

    out.push_str(
        "\n\ndef compile_pipeline(spec_path: str):\n\
         \x20   \"\"\"Compiles the pipeline into a job spec file.\"\"\"\n\
         \x20   compiler.Compiler().compile(\n\
         \x20       pipeline_func=pipeline,\n\
         \x20       package_path=spec_path,\n\
         \x20   )\n\
         \n\
         \n\
         if __name__ == \"__main__\":\n\
         \x20   parser = argparse.ArgumentParser()\n\
         \x20   parser.add_argument(\"--spec-path\", default=\"pipeline_spec.yaml\")\n\
         \x20   compile_pipeline(parser.parse_args().spec_path)\n",
    );
    out
}

fn render_runner_py(config: &AndamioConfig, pipeline_name: &str, bucket: &str) -> String {
    let mut out = generated_banner("#");
    out.push_str(
        "import argparse\n\
         import logging\n\
         \n\
         import yaml\n\
         from google.cloud import aiplatform\n\
         \n\
         \n",
    );
    out.push_str(&format!(
        "def run_pipeline(\n\
         \x20   project_id: str,\n\
         \x20   pipeline_root: str,\n\
         \x20   pipeline_runner_sa: str,\n\
         \x20   parameter_values_path: str,\n\
         \x20   pipeline_spec_path: str,\n\
         \x20   display_name: str = \"{name}\",\n\
         \x20   enable_caching: bool = False,\n\
         ):\n\
         \x20   \"\"\"Submits the compiled pipeline spec as a PipelineJob.\"\"\"\n\
         \x20   with open(parameter_values_path, \"r\", encoding=\"utf-8\") as param_file:\n\
         \x20       parameter_values = yaml.safe_load(param_file)\n\
         \n\
         \x20   logging.info(\"Submitting pipeline job: %s\", display_name)\n\
         \x20   job = aiplatform.PipelineJob(\n\
         \x20       display_name=display_name,\n\
         \x20       template_path=pipeline_spec_path,\n\
         \x20       pipeline_root=pipeline_root,\n\
         \x20       parameter_values=parameter_values,\n\
         \x20       enable_caching=enable_caching,\n\
         \x20   )\n\
         \x20   job.submit(service_account=pipeline_runner_sa)\n\
         \n\
         \n",
        name = pipeline_name
    ));
    out.push_str(&format!(
        "if __name__ == \"__main__\":\n\
         \x20   parser = argparse.ArgumentParser()\n\
         \x20   parser.add_argument(\"--project-id\", default=\"{project}\")\n\
         \x20   parser.add_argument(\"--pipeline-root\", default=\"gs://{bucket}/pipeline_root\")\n\
         \x20   parser.add_argument(\n\
         \x20       \"--pipeline-runner-sa\",\n\
         \x20       default=\"pipeline-runner-sa@{project}.iam.gserviceaccount.com\",\n\
         \x20   )\n\
         \x20   parser.add_argument(\n\
         \x20       \"--parameter-values-path\",\n\
         \x20       default=\"pipelines/runtime_parameters/pipeline_parameter_values.yaml\",\n\
         \x20   )\n\
         \x20   parser.add_argument(\"--pipeline-spec-path\", default=\"pipeline_spec.yaml\")\n\
         \x20   run_pipeline(**vars(parser.parse_args()))\n",
        project = config.project.project_id,
        bucket = bucket
    ));
    out
}

/// Starter runtime parameter file with a neutral value per parameter type
fn render_parameter_values(parameters: &[&ParameterSpec]) -> String {
    let mut out = generated_banner("#");
    if parameters.is_empty() {
        out.push_str("{}\n");
        return out;
    }
    for parameter in parameters {
        let placeholder = match parameter.param_type {
            ParameterType::String => "\"\"",
            ParameterType::Integer => "0",
            ParameterType::Float => "0.0",
            ParameterType::Boolean => "false",
            ParameterType::Dict => "{}",
            ParameterType::List => "[]",
        };
        out.push_str(&format!("{}: {}\n", parameter.name, placeholder));
    }
    out
}
