mod cli;
mod config;
mod emitter;
mod iac;
mod naming;
mod pipelines;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "andamio")]
#[command(version, about = "Scaffolding generator for MLOps pipeline infrastructure", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter andamio.toml
    Init {
        /// Directory the configuration is written to
        #[arg(long, default_value = ".")]
        output: PathBuf,

        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Render the infrastructure stack for the configured provider
    Provision {
        /// Path to the project configuration
        #[arg(long, short = 'c', default_value = "andamio.toml")]
        config: PathBuf,

        /// Override the Pulumi runtime (python, nodejs, go)
        #[arg(long)]
        runtime: Option<String>,

        /// Override the stack environment (dev, staging, prod)
        #[arg(long)]
        env: Option<String>,

        /// Output directory
        #[arg(long, short = 'o', default_value = ".")]
        output: PathBuf,

        /// List files without writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Render component manifests and task sources from spec files
    Component {
        /// Path to the project configuration
        #[arg(long, short = 'c', default_value = "andamio.toml")]
        config: PathBuf,

        /// Component spec files (defaults to the configured components dir)
        specs: Vec<PathBuf>,

        /// Output directory
        #[arg(long, short = 'o', default_value = ".")]
        output: PathBuf,

        /// List files without writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Render the pipeline definition, runner and requirements
    Pipeline {
        /// Path to the project configuration
        #[arg(long, short = 'c', default_value = "andamio.toml")]
        config: PathBuf,

        /// Component spec files (defaults to the configured components dir)
        specs: Vec<PathBuf>,

        /// Output directory
        #[arg(long, short = 'o', default_value = ".")]
        output: PathBuf,

        /// List files without writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Full run: infrastructure stack plus every pipeline artifact
    Generate {
        /// Path to the project configuration
        #[arg(long, short = 'c', default_value = "andamio.toml")]
        config: PathBuf,

        /// Component spec files (defaults to the configured components dir)
        specs: Vec<PathBuf>,

        /// Output directory
        #[arg(long, short = 'o', default_value = ".")]
        output: PathBuf,

        /// List files without writing them
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter_layer = if cli.debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::new("info")
    } else {
        tracing_subscriber::EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("andamio v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Init { output, force } => {
            info!("writing starter configuration to {:?}", output);
            cli::cmd_init(&output, force)?;
        }
        Commands::Provision {
            config,
            runtime,
            env,
            output,
            dry_run,
        } => {
            info!("provisioning from {:?}", config);
            cli::cmd_provision(&config, runtime, env, &output, dry_run)?;
        }
        Commands::Component {
            config,
            specs,
            output,
            dry_run,
        } => {
            info!("building {} component spec(s)", specs.len());
            cli::cmd_component(&config, &specs, &output, dry_run)?;
        }
        Commands::Pipeline {
            config,
            specs,
            output,
            dry_run,
        } => {
            info!("building pipeline scaffolding");
            cli::cmd_pipeline(&config, &specs, &output, dry_run)?;
        }
        Commands::Generate {
            config,
            specs,
            output,
            dry_run,
        } => {
            info!("running full generation");
            cli::cmd_generate(&config, &specs, &output, dry_run)?;
        }
    }

    Ok(())
}
