//! Pulumi project rendering
//!
//! Emits a complete Pulumi project under `<model>/`: the project file, the
//! per-environment stack configuration, and (for the Python runtime) a
//! `__main__.py` program. The program's resource blocks are emitted in
//! [`ResourceGraph::ordered`] order and every `depends_on` list is derived
//! from the graph's edges rather than written into the template.

use crate::config::{AndamioConfig, ResourceNames};
use crate::emitter::{generated_banner, FileSet};
use crate::iac::resources::{Resource, ResourceGraph, ResourceSpec};
use crate::iac::{PulumiRuntime, RenderError};
use std::path::PathBuf;

/// Pulumi project name for a sanitized model identifier
pub fn project_name(model: &str) -> String {
    format!("mlops_andamio_{}", model)
}

/// Render the Pulumi project for `config`
pub fn render(config: &AndamioConfig) -> Result<FileSet, RenderError> {
    let names = config.resource_names()?;
    let graph = ResourceGraph::standard(&config.project, &names, &config.infra.build_branch);

    let folder = PathBuf::from(&names.model);
    let mut files = FileSet::new();

    files.push(
        folder.join("Pulumi.yaml"),
        render_project_yaml(&names, config.infra.pulumi_runtime),
    )?;
    files.push(
        folder.join(format!("Pulumi.{}.yaml", config.project.environment)),
        render_stack_yaml(config, &names, &graph),
    )?;

    // only the Python runtime gets a generated program; other runtimes
    // receive the project skeleton and author their own
    if config.infra.pulumi_runtime == PulumiRuntime::Python {
        files.push(folder.join("__main__.py"), render_main_py(&graph)?)?;
    }

    Ok(files)
}

fn render_project_yaml(names: &ResourceNames, runtime: PulumiRuntime) -> String {
    let mut out = generated_banner("#");
    out.push_str(&format!("name: {}\n", project_name(&names.model)));
    out.push_str("runtime:\n");
    out.push_str(&format!("  name: {}\n", runtime.as_str()));
    out.push_str(&format!(
        "description: Pulumi stack for the \"{}\" model pipeline infrastructure\n",
        names.model
    ));
    out
}

fn render_stack_yaml(config: &AndamioConfig, names: &ResourceNames, graph: &ResourceGraph) -> String {
    let project = project_name(&names.model);
    let mut out = generated_banner("#");
    out.push_str("config:\n");

    out.push_str(&format!("  {}:general:\n", project));
    out.push_str(&format!("    project_id: {}\n", config.project.project_id));
    out.push_str(&format!("    model_name: {}\n", names.model));
    out.push_str(&format!("    environment: {}\n", config.project.environment));
    out.push_str(&format!("    default_region: {}\n", config.project.region));

    for resource in graph.iter() {
        match &resource.spec {
            ResourceSpec::Buckets(buckets) => {
                out.push_str(&format!("  {}:buckets:\n", project));
                for bucket in buckets {
                    out.push_str(&format!("    - name: {}\n", bucket.name));
                    out.push_str(&format!("      location: {}\n", bucket.location));
                    out.push_str("      labels:\n");
                    for (key, value) in &bucket.labels {
                        out.push_str(&format!("        {}: {}\n", key, value));
                    }
                }
            }
            ResourceSpec::ServiceAccounts(accounts) => {
                out.push_str(&format!("  {}:service_accounts:\n", project));
                for account in accounts {
                    out.push_str(&format!("    - account_id: {}\n", account.account_id));
                    out.push_str(&format!("      display_name: {}\n", account.display_name));
                    out.push_str(&format!("      description: {}\n", account.description));
                }
            }
            ResourceSpec::IamBindings(bindings) => {
                out.push_str(&format!("  {}:service_accounts_iam:\n", project));
                for binding in bindings {
                    let member = format!(
                        "serviceAccount:{}@{}.iam.gserviceaccount.com",
                        binding.account_id, config.project.project_id
                    );
                    out.push_str(&format!("    - name: {}\n", binding.account_id));
                    out.push_str(&format!("      member: {}\n", member));
                    out.push_str(&format!("      description: {}\n", binding.description));
                    out.push_str("      role_bindings:\n");
                    for role in &binding.roles {
                        out.push_str(&format!("        - {}\n", role));
                    }
                }
            }
            // singletons are fully rendered into the program
            _ => {}
        }
    }

    out
}

/// Python expression used to reference an emitted resource group in a
/// `depends_on` list
enum Handle {
    /// Collected into a list variable; splatted into `depends_on`
    List(&'static str),
    /// Bound to a single variable
    Var(&'static str),
}

fn python_handle(spec: &ResourceSpec) -> Handle {
    match spec {
        ResourceSpec::Buckets(_) => Handle::List("created_buckets"),
        ResourceSpec::ServiceAccounts(_) => Handle::List("created_accounts"),
        ResourceSpec::IamBindings(_) => Handle::List("created_bindings"),
        ResourceSpec::ArtifactRegistry(_) => Handle::Var("artifact_registry_repo"),
        ResourceSpec::SourceRepository(_) => Handle::Var("source_repo"),
        ResourceSpec::TaskQueue(_) => Handle::Var("tasks_queue"),
        ResourceSpec::BuildTrigger(_) => Handle::Var("build_trigger"),
    }
}

/// `depends_on=[...]` expression for a resource, derived from graph edges
fn depends_on_expr(resource: &Resource, graph: &ResourceGraph) -> Result<String, RenderError> {
    let mut parts = Vec::with_capacity(resource.depends_on.len());
    for dep in &resource.depends_on {
        let target = graph
            .get(dep)
            .ok_or_else(|| crate::iac::resources::ResourceError::UnknownDependency {
                from: resource.id.clone(),
                to: dep.clone(),
            })?;
        parts.push(match python_handle(&target.spec) {
            Handle::List(name) => format!("*{}", name),
            Handle::Var(name) => name.to_string(),
        });
    }
    Ok(format!("[{}]", parts.join(", ")))
}

fn section(out: &mut String, title: &str) {
    out.push_str("\n# ---------------------------------------------------------------------------\n");
    out.push_str(&format!("# {}\n", title));
    out.push_str("# ---------------------------------------------------------------------------\n");
}

fn render_main_py(graph: &ResourceGraph) -> Result<String, RenderError> {
    let mut out = generated_banner("#");
    out.push_str("import pulumi_gcp as gcp\n");
    out.push_str("from pulumi import Config, ResourceOptions\n");
    out.push_str("\nconfig = Config()\n");

    section(&mut out, "General settings");
    out.push_str(
        "general_cfg = config.require_object(\"general\")\n\
         project_id = general_cfg.get(\"project_id\")\n\
         model_name = general_cfg.get(\"model_name\")\n\
         environment = general_cfg.get(\"environment\")\n\
         default_region = general_cfg.get(\"default_region\")\n\
         \n\
         stack_infra = f\"{model_name}-{environment}\"\n",
    );

    for resource in graph.ordered()? {
        let deps = depends_on_expr(resource, graph)?;
        match &resource.spec {
            ResourceSpec::Buckets(_) => {
                section(&mut out, "Storage buckets");
                out.push_str(&format!(
                    "buckets_cfg = config.require_object(\"buckets\") or []\n\
                     created_buckets = []\n\
                     for i, bucket in enumerate(buckets_cfg):\n\
                     \x20   created_buckets.append(\n\
                     \x20       gcp.storage.Bucket(\n\
                     \x20           resource_name=f\"{{stack_infra}}-{{bucket['name']}}-{{i}}\",\n\
                     \x20           project=project_id,\n\
                     \x20           name=bucket[\"name\"],\n\
                     \x20           location=bucket[\"location\"],\n\
                     \x20           labels=bucket[\"labels\"],\n\
                     \x20           opts=ResourceOptions(depends_on={deps}),\n\
                     \x20       )\n\
                     \x20   )\n",
                    deps = deps
                ));
            }
            ResourceSpec::ServiceAccounts(_) => {
                section(&mut out, "Service accounts");
                out.push_str(&format!(
                    "accounts_cfg = config.require_object(\"service_accounts\") or []\n\
                     created_accounts = []\n\
                     for i, svc in enumerate(accounts_cfg):\n\
                     \x20   created_accounts.append(\n\
                     \x20       gcp.serviceaccount.Account(\n\
                     \x20           resource_name=f\"{{stack_infra}}-{{svc['account_id']}}-{{i}}\",\n\
                     \x20           project=project_id,\n\
                     \x20           account_id=svc[\"account_id\"],\n\
                     \x20           display_name=svc[\"display_name\"],\n\
                     \x20           description=svc[\"description\"],\n\
                     \x20           opts=ResourceOptions(depends_on={deps}),\n\
                     \x20       )\n\
                     \x20   )\n",
                    deps = deps
                ));
            }
            ResourceSpec::IamBindings(_) => {
                section(&mut out, "IAM role bindings");
                out.push_str(&format!(
                    "iam_cfg = config.require_object(\"service_accounts_iam\") or []\n\
                     created_bindings = []\n\
                     for binding in iam_cfg:\n\
                     \x20   for i, role in enumerate(binding[\"role_bindings\"]):\n\
                     \x20       created_bindings.append(\n\
                     \x20           gcp.projects.IAMMember(\n\
                     \x20               resource_name=f\"{{stack_infra}}-{{binding['name']}}-{{i}}\",\n\
                     \x20               project=project_id,\n\
                     \x20               member=binding[\"member\"],\n\
                     \x20               role=role,\n\
                     \x20               opts=ResourceOptions(depends_on={deps}),\n\
                     \x20           )\n\
                     \x20       )\n",
                    deps = deps
                ));
            }
            ResourceSpec::ArtifactRegistry(repo) => {
                section(&mut out, "Artifact registry");
                out.push_str(&format!(
                    "artifact_registry_repo = gcp.artifactregistry.Repository(\n\
                     \x20   resource_name=f\"{{stack_infra}}-{id}\",\n\
                     \x20   project=project_id,\n\
                     \x20   description=\"{desc}\",\n\
                     \x20   format=\"{format}\",\n\
                     \x20   location=default_region,\n\
                     \x20   repository_id=\"{id}\",\n\
                     \x20   opts=ResourceOptions(depends_on={deps}),\n\
                     )\n",
                    id = repo.repository_id,
                    desc = repo.description,
                    format = repo.format,
                    deps = deps
                ));
            }
            ResourceSpec::SourceRepository(repo) => {
                section(&mut out, "Source repository");
                out.push_str(&format!(
                    "source_repo = gcp.sourcerepo.Repository(\n\
                     \x20   resource_name=f\"{{stack_infra}}-{name}\",\n\
                     \x20   name=\"{name}\",\n\
                     \x20   project=project_id,\n\
                     \x20   opts=ResourceOptions(depends_on={deps}),\n\
                     )\n",
                    name = repo.name,
                    deps = deps
                ));
            }
            ResourceSpec::TaskQueue(queue) => {
                section(&mut out, "Task queue");
                out.push_str(&format!(
                    "tasks_queue = gcp.cloudtasks.Queue(\n\
                     \x20   resource_name=f\"{{stack_infra}}-{name}\",\n\
                     \x20   name=\"{name}\",\n\
                     \x20   project=project_id,\n\
                     \x20   location=default_region,\n\
                     \x20   opts=ResourceOptions(depends_on={deps}),\n\
                     )\n",
                    name = queue.name,
                    deps = deps
                ));
            }
            ResourceSpec::BuildTrigger(trigger) => {
                section(&mut out, "Build trigger");
                out.push_str(&format!(
                    "build_trigger = gcp.cloudbuild.Trigger(\n\
                     \x20   resource_name=f\"{{stack_infra}}-{name}\",\n\
                     \x20   name=\"{name}\",\n\
                     \x20   project=project_id,\n\
                     \x20   filename=\"{filename}\",\n\
                     \x20   service_account=f\"projects/{{project_id}}/serviceAccounts/{sa}@{{project_id}}.iam.gserviceaccount.com\",\n\
                     \x20   location=default_region,\n\
                     \x20   trigger_template=gcp.cloudbuild.TriggerTriggerTemplateArgs(\n\
                     \x20       branch_name=\"{branch}\",\n\
                     \x20       repo_name=\"{repo}\",\n\
                     \x20   ),\n\
                     \x20   opts=ResourceOptions(depends_on={deps}),\n\
                     )\n",
                    name = trigger.name,
                    filename = trigger.filename,
                    sa = trigger.service_account_id,
                    branch = trigger.branch,
                    repo = trigger.repo,
                    deps = deps
                ));
            }
        }
    }

    Ok(out)
}
