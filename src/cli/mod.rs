//! CLI command logic - extracted for testability
//!
//! This module contains the command implementations behind the `andamio`
//! binary. Display glue stays in main.rs; everything here returns
//! `anyhow::Result` and is exercised directly by unit tests.

use crate::config::{AndamioConfig, CONFIG_FILENAME};
use crate::emitter::FileSet;
use crate::iac;
use crate::pipelines::{self, spec::ComponentSpec};
use anyhow::{bail, Context};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

// ============================================================================
// Run Manifest
// ============================================================================

/// Manifest of the last generation run, written at the output root
pub const MANIFEST_FILENAME: &str = ".andamio-manifest.json";

/// Record of what the last run generated, for tooling and cleanup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Generator version that produced the files
    pub generator_version: String,

    /// Relative paths of every generated file
    pub files: Vec<PathBuf>,
}

impl RunManifest {
    fn for_files(files: &FileSet) -> Self {
        Self {
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            files: files.manifest(),
        }
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Load the project configuration, with a pointer to `init` when missing
pub fn load_config(path: &Path) -> anyhow::Result<AndamioConfig> {
    if !path.exists() {
        bail!(
            "configuration not found at {} (run `andamio init` first)",
            path.display()
        );
    }
    AndamioConfig::load(path).with_context(|| format!("loading {}", path.display()))
}

/// Load component specs from explicit paths, or from the configured
/// components directory when none are given (sorted for determinism).
pub fn load_specs(
    explicit: &[PathBuf],
    config: &AndamioConfig,
) -> anyhow::Result<Vec<ComponentSpec>> {
    let paths = if explicit.is_empty() {
        let dir = PathBuf::from(&config.pipeline.components_dir);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut found: Vec<PathBuf> = std::fs::read_dir(&dir)
            .with_context(|| format!("reading {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .collect();
        found.sort();
        found
    } else {
        explicit.to_vec()
    };

    let mut specs = Vec::with_capacity(paths.len());
    for path in &paths {
        let spec = ComponentSpec::load(path)
            .with_context(|| format!("loading component spec {}", path.display()))?;
        info!("loaded component spec '{}'", spec.name);
        specs.push(spec);
    }
    Ok(specs)
}

/// Write (or list, for dry runs) a rendered file set
pub fn emit(files: &FileSet, output: &Path, dry_run: bool) -> anyhow::Result<()> {
    if dry_run {
        println!("{}", "Would generate:".bold());
        for file in files.iter() {
            println!(
                "  {} ({} bytes)",
                output.join(&file.path).display(),
                file.contents.len()
            );
        }
        return Ok(());
    }

    let written = files.write_to(output)?;
    for path in &written {
        println!("  {} {}", "wrote".green(), path.display());
    }

    let manifest = serde_json::to_string_pretty(&RunManifest::for_files(files))?;
    std::fs::write(output.join(MANIFEST_FILENAME), manifest)?;

    println!(
        "{}",
        format!("Generated {} file(s) under {}", written.len(), output.display()).green()
    );
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

/// `andamio init` - write a starter configuration
pub fn cmd_init(output: &Path, force: bool) -> anyhow::Result<()> {
    let path = output.join(CONFIG_FILENAME);
    if path.exists() && !force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    AndamioConfig::default().save(&path)?;
    println!(
        "{}",
        format!("Wrote starter configuration to {}", path.display()).green()
    );
    println!("Edit the [project] section, then run `andamio generate`.");
    Ok(())
}

/// `andamio provision` - render the IaC stack
pub fn cmd_provision(
    config_path: &Path,
    runtime: Option<String>,
    environment: Option<String>,
    output: &Path,
    dry_run: bool,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(runtime) = runtime {
        config.infra.pulumi_runtime = runtime.parse()?;
    }
    if let Some(environment) = environment {
        config.project.environment = environment;
    }

    let files = iac::provision(&config)?;
    emit(&files, output, dry_run)
}

/// `andamio component` - render component manifests and task sources
pub fn cmd_component(
    config_path: &Path,
    spec_paths: &[PathBuf],
    output: &Path,
    dry_run: bool,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let specs = load_specs(spec_paths, &config)?;
    if specs.is_empty() {
        bail!(
            "no component specs found (pass paths or populate {}/)",
            config.pipeline.components_dir
        );
    }

    let mut files = FileSet::new();
    for spec in &specs {
        files.merge(pipelines::component::build_component(spec, &config)?)?;
    }
    files.merge(pipelines::component::build_component_base(&config)?)?;
    emit(&files, output, dry_run)
}

/// `andamio pipeline` - render the pipeline definition and runner
pub fn cmd_pipeline(
    config_path: &Path,
    spec_paths: &[PathBuf],
    output: &Path,
    dry_run: bool,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let specs = load_specs(spec_paths, &config)?;

    let files = pipelines::pipeline::build_pipeline(&config, &specs)?;
    emit(&files, output, dry_run)
}

/// `andamio generate` - full run: IaC stack plus every framework artifact
pub fn cmd_generate(
    config_path: &Path,
    spec_paths: &[PathBuf],
    output: &Path,
    dry_run: bool,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let specs = load_specs(spec_paths, &config)?;

    let mut files = iac::provision(&config)?;
    files.merge(pipelines::scaffold(&config, &specs)?)?;
    emit(&files, output, dry_run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &Path) -> PathBuf {
        let path = dir.join(CONFIG_FILENAME);
        let mut config = AndamioConfig::default();
        config.project.project_id = "acme-ml".to_string();
        config.project.model_name = "churn-predictor".to_string();
        config.save(&path).unwrap();
        path
    }

    fn write_spec(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(format!("{}.yaml", name));
        std::fs::write(
            &path,
            format!(
                "name: {}\nimplementation:\n  container:\n    image: TBD\n",
                name
            ),
        )
        .unwrap();
        path
    }

    // ========================================================================
    // CONFIG LOADING TESTS
    // ========================================================================

    #[test]
    fn test_load_config_missing_mentions_init() {
        let temp = TempDir::new().unwrap();
        let err = load_config(&temp.path().join(CONFIG_FILENAME)).unwrap_err();
        assert!(err.to_string().contains("andamio init"));
    }

    // ========================================================================
    // SPEC DISCOVERY TESTS
    // ========================================================================

    #[test]
    fn test_load_specs_explicit_paths() {
        let temp = TempDir::new().unwrap();
        let spec = write_spec(temp.path(), "create_dataset");
        let config = AndamioConfig::default();

        let specs = load_specs(&[spec], &config).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "create_dataset");
    }

    #[test]
    fn test_load_specs_scans_components_dir_sorted() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("component_specs");
        std::fs::create_dir(&dir).unwrap();
        write_spec(&dir, "train_model");
        write_spec(&dir, "create_dataset");
        std::fs::write(dir.join("notes.txt"), "not a spec").unwrap();

        let mut config = AndamioConfig::default();
        config.pipeline.components_dir = dir.to_string_lossy().to_string();

        let specs = load_specs(&[], &config).unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["create_dataset", "train_model"]);
    }

    #[test]
    fn test_load_specs_missing_dir_is_empty() {
        let mut config = AndamioConfig::default();
        config.pipeline.components_dir = "/nonexistent/specs".to_string();
        assert!(load_specs(&[], &config).unwrap().is_empty());
    }

    // ========================================================================
    // COMMAND TESTS
    // ========================================================================

    #[test]
    fn test_cmd_init_writes_config() {
        let temp = TempDir::new().unwrap();
        cmd_init(temp.path(), false).unwrap();

        let loaded = AndamioConfig::load(&temp.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(loaded.version, "1.0");
    }

    #[test]
    fn test_cmd_init_refuses_overwrite_without_force() {
        let temp = TempDir::new().unwrap();
        cmd_init(temp.path(), false).unwrap();
        assert!(cmd_init(temp.path(), false).is_err());
        assert!(cmd_init(temp.path(), true).is_ok());
    }

    #[test]
    fn test_cmd_provision_writes_stack() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(temp.path());
        let out = temp.path().join("out");

        cmd_provision(&config_path, None, None, &out, false).unwrap();

        assert!(out.join("churn_predictor/Pulumi.yaml").exists());
        assert!(out.join("churn_predictor/Pulumi.dev.yaml").exists());
        assert!(out.join("churn_predictor/__main__.py").exists());

        let manifest: RunManifest = serde_json::from_str(
            &std::fs::read_to_string(out.join(MANIFEST_FILENAME)).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest.files.len(), 3);
        assert!(manifest
            .files
            .contains(&PathBuf::from("churn_predictor/__main__.py")));
    }

    #[test]
    fn test_cmd_provision_dry_run_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(temp.path());
        let out = temp.path().join("out");

        cmd_provision(&config_path, None, None, &out, true).unwrap();
        assert!(!out.exists());
    }

    #[test]
    fn test_cmd_provision_runtime_override() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(temp.path());
        let out = temp.path().join("out");

        cmd_provision(&config_path, Some("nodejs".to_string()), None, &out, false).unwrap();
        assert!(!out.join("churn_predictor/__main__.py").exists());
    }

    #[test]
    fn test_cmd_component_requires_specs() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(temp.path());
        let out = temp.path().join("out");

        assert!(cmd_component(&config_path, &[], &out, false).is_err());
    }

    #[test]
    fn test_cmd_generate_full_tree() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(temp.path());
        let spec = write_spec(temp.path(), "create_dataset");
        let out = temp.path().join("out");

        cmd_generate(&config_path, &[spec], &out, false).unwrap();

        assert!(out.join("churn_predictor/__main__.py").exists());
        assert!(out.join("components/create_dataset/component.yaml").exists());
        assert!(out
            .join("components/component_base/src/create_dataset.py")
            .exists());
        assert!(out.join("components/component_base/Dockerfile").exists());
        assert!(out.join("pipelines/pipeline.py").exists());
        assert!(out.join("cloud_run/run_pipeline/main.py").exists());
    }
}
