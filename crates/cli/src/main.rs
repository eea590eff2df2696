// casegrid CLI - bulk edit test cases headlessly
// Load records, replay grid interactions, save the resulting changes

mod exit_codes;
mod records;
mod script;

use std::path::PathBuf;
use std::process::ExitCode;

use casegrid_api_client::ApiError;
use casegrid_config::Settings;
use clap::{Parser, Subcommand};

use exit_codes::{
    EXIT_API_NETWORK, EXIT_API_NOT_AUTH, EXIT_ERROR, EXIT_IO, EXIT_PARSE, EXIT_SUCCESS,
};

#[derive(Parser)]
#[command(name = "casegrid")]
#[command(about = "Bulk edit test cases: select, copy, paste, fill and save")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Settings file (default: ~/.config/casegrid/settings.json)
    #[arg(long, global = true, env = "CASEGRID_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store an API token
    Login {
        /// Bearer token
        #[arg(long, env = "CASEGRID_TOKEN")]
        token: String,

        /// API base URL (default: api.base from settings)
        #[arg(long)]
        api_base: Option<String>,
    },

    /// Delete the stored API token
    Logout,

    /// Fetch a team's test cases as a JSON snapshot
    #[command(after_help = "\
Examples:
  casegrid pull --team 7 -o cases.json
  casegrid pull --team 7 | jq length")]
    Pull {
        /// Team id
        #[arg(long)]
        team: String,

        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Replay an edit script against a team's test cases and save the result
    #[command(after_help = "\
Script ops (JSON array or one JSON object per line):
  click / shift_click / ctrl_click   {\"record\": 1, \"column\": \"priority\"}
  select_column                      {\"column\": \"priority\"}
  drag                               {\"from\": CELL, \"through\": [CELL...], \"to\": CELL}
  view_order                         {\"records\": [3, 1, 2]}
  set                                {\"record\": 1, \"column\": \"title\", \"value\": \"...\"}
  fill                               {\"value\": \"Low\"}
  copy, paste, undo, redo, clear_selection

Examples:
  casegrid apply edits.json --team 7 --dry-run
  casegrid apply edits.jsonl --snapshot cases.json --json")]
    Apply {
        /// Script file ('-' for stdin)
        script: String,

        /// Load records from a JSON snapshot instead of the API
        #[arg(long, conflicts_with = "team", required_unless_present = "team")]
        snapshot: Option<PathBuf>,

        /// Load records for this team from the API
        #[arg(long)]
        team: Option<String>,

        /// Field schema TOML (default: grid.schemaPath from settings, else built-in)
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Print pending changes without saving
        #[arg(long)]
        dry_run: bool,

        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },

    /// Print the built-in field schema as TOML
    Schema,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  casegrid-engine ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

/// Install the stderr subscriber. `log` records from the library crates are
/// forwarded to it. Filter with CASEGRID_LOG (default: warn).
fn init_logging() {
    use tracing_subscriber::{
        fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
    };

    let filter = EnvFilter::try_from_env("CASEGRID_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = Registry::default().with(
        fmt::layer()
            .without_time()
            .with_writer(std::io::stderr)
            .with_filter(filter),
    );

    if let Err(e) = subscriber.try_init() {
        eprintln!("warning: logging disabled: {}", e);
    }
}

fn load_settings(path: Option<PathBuf>) -> Settings {
    match path {
        Some(path) => Settings::load_from(&path),
        None => Settings::load(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: casegrid <command> [options]");
            eprintln!("       casegrid --help for more information");
            Ok(())
        }
        Some(Commands::Login { token, api_base }) => {
            let settings = load_settings(cli.config);
            records::cmd_login(&settings, token, api_base)
        }
        Some(Commands::Logout) => records::cmd_logout(),
        Some(Commands::Pull { team, output }) => {
            let settings = load_settings(cli.config);
            records::cmd_pull(&settings, &team, output)
        }
        Some(Commands::Apply { script, snapshot, team, schema, dry_run, json }) => {
            let settings = load_settings(cli.config);
            records::RecordSource::from_args(snapshot, team).and_then(|source| {
                records::cmd_apply(&settings, records::ApplyArgs { script, source, schema, dry_run, json })
            })
        }
        Some(Commands::Schema) => records::cmd_schema(),
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

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(EXIT_PARSE, msg)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Exit with `code` without printing anything (output already written).
    pub fn silent(code: u8) -> Self {
        Self::new(code, "")
    }
}

impl From<ApiError> for CliError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::NotAuthenticated => CliError::new(EXIT_API_NOT_AUTH, "Not authenticated")
                .with_hint("run `casegrid login --token <TOKEN>` first"),
            ApiError::Network(msg) => CliError::new(EXIT_API_NETWORK, msg),
            ApiError::Http(code, msg) => {
                CliError::new(EXIT_API_NETWORK, format!("HTTP {}: {}", code, msg))
            }
            ApiError::Validation(msg) => CliError::new(EXIT_ERROR, msg),
            ApiError::Parse(msg) => {
                CliError::new(EXIT_API_NETWORK, format!("Unexpected response: {}", msg))
            }
        }
    }
}
