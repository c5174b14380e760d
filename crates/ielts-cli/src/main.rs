//! ielts CLI: grade practice tests and drive persisted exam sessions.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ielts", version, about = "IELTS practice grading and exam sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a response file against a test definition
    Grade {
        /// Path to the test definition JSON
        #[arg(long)]
        test: PathBuf,

        /// Path to the responses JSON (question key -> answer)
        #[arg(long)]
        responses: PathBuf,

        /// Module used for band conversion (listening, reading)
        #[arg(long)]
        module: Option<String>,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,

        /// Directory to save the graded attempt JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Convert a raw score to a band
    Band {
        /// Module: listening, reading
        #[arg(long)]
        module: String,

        /// Raw score (questions correct)
        #[arg(long)]
        raw: u32,
    },

    /// Validate test definition files
    Validate {
        /// Path to a test definition file or directory
        #[arg(long)]
        tests: PathBuf,
    },

    /// Work through a test in a persisted session
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,

        /// Path to the test definition JSON
        #[arg(long, global = true)]
        test: Option<PathBuf>,

        /// Module the session belongs to
        #[arg(long, global = true)]
        module: Option<String>,

        /// Config file path
        #[arg(long, global = true)]
        config: Option<PathBuf>,
    },

    /// Create a starter config and sample test
    Init,
}

fn main() {
    // "ielts" also matches the ielts_core target by prefix.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ielts=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Grade {
            test,
            responses,
            module,
            format,
            output,
        } => commands::grade::execute(test, responses, module, format, output),
        Commands::Band { module, raw } => commands::band::execute(module, raw),
        Commands::Validate { tests } => commands::validate::execute(tests),
        Commands::Session {
            action,
            test,
            module,
            config,
        } => commands::session::execute(action, test, module, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
