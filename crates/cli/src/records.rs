//! Test case commands: login, logout, pull, apply, schema.
//!
//! `casegrid login`   store API token
//! `casegrid pull`    team's test cases as a JSON snapshot
//! `casegrid apply`   replay an edit script, then save pending changes

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use casegrid_api_client::{records_from_json, ApiClient, AuthCredentials, CredentialStore};
use casegrid_config::Settings;
use casegrid_engine::{BulkEditGrid, GridOptions, SaveReport, Schema};
use serde_json::{json, Map, Value};

use crate::exit_codes::*;
use crate::script::{self, ReplaySummary};
use crate::CliError;

// ── Login ───────────────────────────────────────────────────────────

pub fn cmd_login(
    settings: &Settings,
    token: String,
    api_base: Option<String>,
) -> Result<(), CliError> {
    let token = token.trim().to_string();
    if token.is_empty() {
        return Err(CliError::new(EXIT_USAGE, "No token provided")
            .with_hint("pass --token or set CASEGRID_TOKEN"));
    }

    let api_base = api_base.unwrap_or_else(|| settings.api_base().to_string());
    let creds = AuthCredentials::new(token, api_base);
    credential_store()?
        .save(&creds)
        .map_err(|e| CliError::new(EXIT_ERROR, e))?;

    eprintln!("Saved token for {}", creds.api_base);
    Ok(())
}

pub fn cmd_logout() -> Result<(), CliError> {
    let removed = credential_store()?
        .clear()
        .map_err(|e| CliError::new(EXIT_ERROR, e))?;
    eprintln!("{}", if removed { "Logged out" } else { "Not logged in" });
    Ok(())
}

fn credential_store() -> Result<CredentialStore, CliError> {
    CredentialStore::user()
        .ok_or_else(|| CliError::new(EXIT_ERROR, "Could not determine config directory"))
}

// ── Pull ────────────────────────────────────────────────────────────

pub fn cmd_pull(settings: &Settings, team: &str, output: Option<PathBuf>) -> Result<(), CliError> {
    let client = ApiClient::from_saved_auth(settings.api_timeout())?;
    let records = client.list_records(team)?;

    let text = serde_json::to_string_pretty(&records)
        .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
    match output {
        Some(path) => {
            std::fs::write(&path, text + "\n")
                .map_err(|e| CliError::io(format!("failed to write {}: {}", path.display(), e)))?;
            eprintln!("Wrote {} test case(s) to {}", records.len(), path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

// ── Schema ──────────────────────────────────────────────────────────

pub fn cmd_schema() -> Result<(), CliError> {
    let text = Schema::test_cases()
        .to_toml()
        .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
    print!("{}", text);
    Ok(())
}

// ── Apply ───────────────────────────────────────────────────────────

pub enum RecordSource {
    Snapshot(PathBuf),
    Team(String),
}

impl RecordSource {
    pub fn from_args(snapshot: Option<PathBuf>, team: Option<String>) -> Result<Self, CliError> {
        match (snapshot, team) {
            (Some(path), None) => Ok(RecordSource::Snapshot(path)),
            (None, Some(team)) => Ok(RecordSource::Team(team)),
            _ => Err(CliError::new(EXIT_USAGE, "pass exactly one of --snapshot or --team")),
        }
    }
}

pub struct ApplyArgs {
    pub script: String,
    pub source: RecordSource,
    pub schema: Option<PathBuf>,
    pub dry_run: bool,
    pub json: bool,
}

pub fn cmd_apply(settings: &Settings, args: ApplyArgs) -> Result<(), CliError> {
    let script_text = read_input(&args.script)?;
    let ops = script::parse_script(&script_text).map_err(CliError::parse)?;

    let schema_path = args.schema.as_deref().or(settings.schema_path.as_deref());
    let schema = load_schema(schema_path)?;

    let records = match &args.source {
        RecordSource::Snapshot(path) => load_snapshot(path)?,
        RecordSource::Team(team) => {
            ApiClient::from_saved_auth(settings.api_timeout())?.list_records(team)?
        }
    };

    let options = GridOptions {
        undo_limit: settings.undo_limit,
        cache_ttl: settings.cache_ttl(),
    };
    let mut grid = BulkEditGrid::with_options(schema, options);
    let loaded = grid.load_records(records);
    log::info!("loaded {} test case(s)", loaded);

    let summary = script::replay(&mut grid, &ops).map_err(|e| {
        CliError::new(EXIT_SCRIPT_REJECTED, e.to_string())
            .with_hint("no changes were saved")
    })?;
    let payloads = grid.pending_payloads();

    if args.dry_run || payloads.is_empty() {
        if args.json {
            print_json(&apply_json(&summary, &payloads, None, args.dry_run));
        } else {
            print_pending(&summary, &payloads);
            if payloads.is_empty() {
                eprintln!("No changes to save");
            }
        }
        return Ok(());
    }

    let client = ApiClient::from_saved_auth(settings.api_timeout())?;
    let report = grid
        .save(&client)
        .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;

    if args.json {
        print_json(&apply_json(&summary, &payloads, Some(&report), false));
    } else {
        print_pending(&summary, &payloads);
        println!("{}", report);
        for (id, message) in &report.failed {
            eprintln!("  {}: {}", id, message);
        }
    }

    if report.all_succeeded() {
        Ok(())
    } else if report.is_partial() {
        Err(CliError::silent(EXIT_SAVE_PARTIAL))
    } else {
        Err(CliError::silent(EXIT_SAVE_FAILED))
    }
}

fn read_input(arg: &str) -> Result<String, CliError> {
    if arg == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)
            .map_err(|e| CliError::io(format!("failed to read stdin: {}", e)))?;
        Ok(buf)
    } else {
        std::fs::read_to_string(arg)
            .map_err(|e| CliError::io(format!("failed to read {}: {}", arg, e)))
    }
}

fn load_schema(path: Option<&Path>) -> Result<Schema, CliError> {
    let Some(path) = path else {
        return Ok(Schema::test_cases());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("failed to read {}: {}", path.display(), e)))?;
    Schema::from_toml(&text)
        .map_err(|e| CliError::parse(format!("{}: {}", path.display(), e)))
}

fn load_snapshot(path: &Path) -> Result<Vec<Value>, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("failed to read {}: {}", path.display(), e)))?;
    let json: Value = serde_json::from_str(&text)
        .map_err(|e| CliError::parse(format!("{}: {}", path.display(), e)))?;
    records_from_json(json).map_err(|e| CliError::parse(format!("{}: {}", path.display(), e)))
}

fn print_pending(summary: &ReplaySummary, payloads: &[(casegrid_core::RecordId, Map<String, Value>)]) {
    println!(
        "{} op(s) applied, {} ignored; {} test case(s) with pending changes",
        summary.applied,
        summary.ignored,
        payloads.len()
    );
    for (id, payload) in payloads {
        println!("  {}  {}", id, Value::Object(payload.clone()));
    }
}

fn apply_json(
    summary: &ReplaySummary,
    payloads: &[(casegrid_core::RecordId, Map<String, Value>)],
    report: Option<&SaveReport>,
    dry_run: bool,
) -> Value {
    let pending: Vec<Value> = payloads
        .iter()
        .map(|(id, payload)| json!({ "id": id, "payload": payload }))
        .collect();

    let mut out = json!({
        "dry_run": dry_run,
        "applied": summary.applied,
        "ignored": summary.ignored,
        "pending": pending,
    });
    if let Some(report) = report {
        out["saved"] = json!(report.succeeded);
        out["failed"] = json!(report.failed);
    }
    out
}

fn print_json(value: &Value) {
    let mut stdout = io::stdout().lock();
    // Ignore a closed pipe
    let _ = serde_json::to_writer_pretty(&mut stdout, value);
    let _ = writeln!(stdout);
}
