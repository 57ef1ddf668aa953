mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfyfetch_core::{AcquisitionMode, ModelCategory};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "comfyfetch")]
#[command(author, version, about = "Download the models a workflow depends on", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the models referenced by a workflow
    Fetch {
        #[command(flatten)]
        source: SourceArgs,

        /// Also fetch these categories
        #[arg(short, long, value_enum)]
        include: Vec<CategoryArg>,

        /// Skip these categories
        #[arg(short = 'x', long, value_enum)]
        exclude: Vec<CategoryArg>,

        /// Models directory (overrides config)
        #[arg(long)]
        models_dir: Option<PathBuf>,

        /// Downloads to run at once (overrides config)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Hide download progress bars
        #[arg(short, long)]
        quiet: bool,
    },

    /// List the models a workflow references without downloading
    Scan {
        #[command(flatten)]
        source: SourceArgs,

        /// Print the references as JSON
        #[arg(long)]
        as_json: bool,
    },

    /// List workflow files that can be passed to --file
    Workflows,

    /// View or set configuration
    Config {
        /// Config key (e.g., "paths.base_path", "categories.loras")
        key: Option<String>,

        /// Value to set (if omitted, shows current value)
        value: Option<String>,
    },
}

#[derive(Args)]
pub struct SourceArgs {
    /// Where to take the workflow from
    #[arg(short, long, value_enum, default_value_t = ModeArg::CurrentWorkflow)]
    pub mode: ModeArg,

    /// Workflow file relative to the base path (see `comfyfetch workflows`)
    #[arg(short, long)]
    pub file: Option<String>,

    /// Workflow JSON text; `-` reads it from stdin
    #[arg(long)]
    pub json: Option<String>,

    /// JSON file with the host's `extra_pnginfo` and `prompt`
    #[arg(short, long)]
    pub context: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    CurrentWorkflow,
    FromFile,
}

impl From<ModeArg> for AcquisitionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::CurrentWorkflow => AcquisitionMode::CurrentWorkflow,
            ModeArg::FromFile => AcquisitionMode::FromFile,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CategoryArg {
    Checkpoints,
    Vae,
    Controlnet,
    Loras,
}

impl From<CategoryArg> for ModelCategory {
    fn from(category: CategoryArg) -> Self {
        match category {
            CategoryArg::Checkpoints => ModelCategory::Checkpoint,
            CategoryArg::Vae => ModelCategory::Vae,
            CategoryArg::Controlnet => ModelCategory::ControlNet,
            CategoryArg::Loras => ModelCategory::Lora,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Fetch {
            source,
            include,
            exclude,
            models_dir,
            jobs,
            quiet,
        } => {
            let options = commands::fetch::FetchOptions {
                include: include.into_iter().map(Into::into).collect(),
                exclude: exclude.into_iter().map(Into::into).collect(),
                models_dir,
                jobs,
                quiet,
            };
            let ok = commands::fetch::execute(&source, options).await?;
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Scan { source, as_json } => {
            commands::scan::execute(&source, as_json).await?;
        }
        Commands::Workflows => {
            commands::workflows::execute().await?;
        }
        Commands::Config { key, value } => {
            commands::config::execute(key.as_deref(), value.as_deref()).await?;
        }
    }

    Ok(())
}
