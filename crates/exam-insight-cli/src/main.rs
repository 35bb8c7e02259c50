//! exam-insight CLI: analyze exam attempts and print coaching suggestions.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "exam-insight",
    version,
    about = "Exam performance reports with personalized study suggestions"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze exam attempts
    Analyze {
        /// Path to a .json/.toml request or a directory of them
        #[arg(long)]
        request: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Backend to use (overrides default_provider)
        #[arg(long)]
        provider: Option<String>,

        /// Model to use (overrides default_model)
        #[arg(long)]
        model: Option<String>,

        /// Backend timeout in seconds (overrides timeout_secs)
        #[arg(long)]
        timeout: Option<u64>,

        /// Max concurrent analyses (overrides parallelism)
        #[arg(long)]
        parallelism: Option<usize>,

        /// Also write the results as JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Do not append results to the analysis store
        #[arg(long)]
        no_store: bool,

        /// Analysis store path (overrides store_path)
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Validate request files without analyzing them
    Validate {
        /// Path to a request file or directory
        #[arg(long)]
        request: PathBuf,
    },

    /// Show stored analyses
    History {
        /// Analysis store path (overrides store_path)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Show at most this many of the most recent analyses
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and example request
    Init,
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        "exam_insight=info"
            .parse()
            .unwrap_or_else(|_| tracing::Level::INFO.into()),
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            request,
            config,
            provider,
            model,
            timeout,
            parallelism,
            output,
            format,
            no_store,
            store,
        } => {
            commands::analyze::execute(commands::analyze::AnalyzeArgs {
                request,
                config,
                provider,
                model,
                timeout,
                parallelism,
                output,
                format,
                no_store,
                store,
            })
            .await
        }
        Commands::Validate { request } => commands::validate::execute(request),
        Commands::History {
            store,
            limit,
            config,
        } => commands::history::execute(store, limit, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
