// croptaxa CLI - reconcile crop and land-cover class schemas onto one taxonomy

mod exit_codes;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use exit_codes::{taxonomy_exit_code, EXIT_IO, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "croptaxa")]
#[command(about = "Reconcile crop and land-cover class schemas onto one canonical taxonomy")]
#[command(version)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve, index and report: writes the JSON artifact and prints the text report
    #[command(after_help = "\
Examples:
  croptaxa run
  croptaxa run --output out/hierarchy.json --quiet
  croptaxa run --catalogue ./catalogue --config report.toml
  croptaxa run --json > hierarchy.json
  croptaxa run --stamp-today")]
    Run {
        /// Catalogue directory holding hierarchy.toml and sources.toml (default: built-in)
        #[arg(long, env = "CROPTAXA_CATALOGUE")]
        catalogue: Option<PathBuf>,

        /// Report settings file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Artifact path (overrides the settings file)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Generation marker written to `_generated`
        #[arg(long, conflicts_with = "stamp_today")]
        generated: Option<String>,

        /// Use today's date as the generation marker (output is no longer reproducible)
        #[arg(long)]
        stamp_today: bool,

        /// Print the JSON document to stdout instead of the text report
        #[arg(long)]
        json: bool,

        /// Print nothing on success
        #[arg(long, short = 'q', conflicts_with = "json")]
        quiet: bool,
    },

    /// Load and validate a catalogue without writing anything
    #[command(after_help = "\
Examples:
  croptaxa validate
  croptaxa validate --catalogue ./catalogue")]
    Validate {
        /// Catalogue directory holding hierarchy.toml and sources.toml (default: built-in)
        #[arg(long, env = "CROPTAXA_CATALOGUE")]
        catalogue: Option<PathBuf>,
    },

    /// Show how one class code resolves its lifecycle duration
    #[command(after_help = "\
Examples:
  croptaxa explain crome AC66
  croptaxa explain usda-cdl 58 --json")]
    Explain {
        /// Source id (e.g. crome, usda-cdl)
        source: String,

        /// Class code within that source
        code: String,

        /// Catalogue directory holding hierarchy.toml and sources.toml (default: built-in)
        #[arg(long, env = "CROPTAXA_CATALOGUE")]
        catalogue: Option<PathBuf>,

        /// Output JSON instead of the human summary
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<croptaxa_recon::TaxonomyError> for CliError {
    fn from(err: croptaxa_recon::TaxonomyError) -> Self {
        let code = taxonomy_exit_code(&err);
        let hint = if err.is_catalogue_error() {
            Some("check hierarchy.toml and sources.toml in the catalogue directory".to_string())
        } else {
            None
        };
        Self { code, message: err.to_string(), hint }
    }
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            catalogue,
            config,
            output,
            generated,
            stamp_today,
            json,
            quiet,
        } => recon::cmd_run(recon::RunArgs {
            catalogue,
            config,
            output,
            generated,
            stamp_today,
            json,
            quiet,
        }),
        Commands::Validate { catalogue } => recon::cmd_validate(catalogue),
        Commands::Explain { source, code, catalogue, json } => {
            recon::cmd_explain(&source, &code, catalogue, json)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
