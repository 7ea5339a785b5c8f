//! Gemforge CLI - drive the design-to-mesh pipeline from the command line

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{artifact, design, runs};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gemforge")]
#[command(about = "Turn a jewellery design idea into a 3D model", long_about = None)]
#[command(version)]
struct Cli {
    /// Backend to use (openai, mock); defaults to the configured provider
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every stage for one design and verify the mesh
    Generate {
        /// Design prompt (e.g. "a ring with a ruby")
        prompt: String,

        /// Style to include; repeat for several
        #[arg(long = "style", short)]
        styles: Vec<String>,

        /// Use this image prompt instead of the expanded one
        #[arg(long)]
        image_prompt: Option<String>,
    },

    /// Stage 1: start a run and expand the design prompt
    Prompt {
        /// Design prompt
        prompt: String,

        /// Style to include; repeat for several
        #[arg(long = "style", short)]
        styles: Vec<String>,
    },

    /// Stage 2: render an image for a run
    Image {
        /// Run ID
        #[arg(long)]
        run: String,

        /// Use this prompt instead of the expanded one
        #[arg(long)]
        prompt: Option<String>,
    },

    /// Stage 3: request a 3D model for a run
    Mesh {
        /// Run ID
        #[arg(long)]
        run: String,

        /// Use this image URL instead of the rendered one
        #[arg(long)]
        image_url: Option<String>,
    },

    /// Check the mesh session and download the mesh if it is ready
    Fetch {
        /// Run ID
        #[arg(long)]
        run: String,
    },

    /// Verify that a run's mesh file is present
    Verify {
        /// Run ID
        #[arg(long)]
        run: String,
    },

    /// Show a saved run
    Status {
        /// Run ID
        #[arg(long)]
        run: String,
    },

    /// List saved runs
    Runs,

    /// Store a local file in the artifact store
    Upload {
        /// Path to the file (e.g. model.glb)
        path: String,
    },

    /// Copy a stored artifact to a destination
    Download {
        /// Artifact path
        path: String,

        /// Destination file
        #[arg(short, long)]
        output: String,
    },

    /// List the style catalog
    Styles,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "gemforge_gen={lvl},gemforge_cli={lvl}",
            lvl = default_level
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let provider = cli.provider.as_deref();
    match cli.command {
        Commands::Generate {
            prompt,
            styles,
            image_prompt,
        } => design::run_generate(provider, &prompt, styles, image_prompt.as_deref()),
        Commands::Prompt { prompt, styles } => design::run_prompt(provider, &prompt, styles),
        Commands::Image { run, prompt } => design::run_image(provider, &run, prompt.as_deref()),
        Commands::Mesh { run, image_url } => design::run_mesh(provider, &run, image_url.as_deref()),
        Commands::Fetch { run } => design::run_fetch(provider, &run),
        Commands::Verify { run } => design::run_verify(provider, &run),
        Commands::Status { run } => runs::run_status(&run),
        Commands::Runs => runs::run_list(),
        Commands::Upload { path } => artifact::run_upload(&path),
        Commands::Download { path, output } => artifact::run_download(&path, &output),
        Commands::Styles => {
            for style in gemforge_gen::style::STYLE_OPTIONS {
                println!("{}", style);
            }
            Ok(())
        }
    }
}
