//! division-ledger: ingest division order PDFs and manage the well-record ledger.
//!
//! Usage:
//!   division-ledger ingest a.pdf b.pdf [--deploy]
//!   division-ledger list [--state TX]
//!   division-ledger update 0 --status "Title issue" --notes "missing curative"
//!   division-ledger delete 0
//!   division-ledger dedup | normalize | clear
//!   division-ledger import-legacy ./old-snapshots
//!   division-ledger segment extracted.txt
//!   division-ledger state-name TX

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use division_ledger_lib::config::{LedgerConfig, APP_VERSION};
use division_ledger_lib::ledger::StoreError;
use division_ledger_lib::models::RecordUpdate;
use division_ledger_lib::pipeline::processor::{build_processor, Document};
use division_ledger_lib::pipeline::segment::segment_wells;
use division_ledger_lib::service::{state_name, LedgerService, ServiceError};

#[derive(Parser)]
#[command(name = "division-ledger", version = APP_VERSION, about = "Division order ingestion and well-record ledger")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract well records from PDF documents
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Merge the extracted records into the store
        #[arg(long)]
        deploy: bool,
    },
    /// Show stored records, newest effective date first
    List {
        /// Only records in this state (name or code)
        #[arg(long)]
        state: Option<String>,
    },
    /// Edit notes and/or status of the record at a list index
    Update {
        index: usize,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    /// Delete the record at a list index
    Delete { index: usize },
    /// Remove duplicate records
    Dedup,
    /// Re-normalize state codes and decimal interests
    Normalize,
    /// Remove every record
    Clear,
    /// Merge every *.json snapshot in a directory
    ImportLegacy { dir: PathBuf },
    /// Split an extracted text file into well blocks
    Segment { file: PathBuf },
    /// Full name for a state code
    StateName { code: String },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Count {
    count: usize,
}

fn main() -> ExitCode {
    division_ledger_lib::init_tracing();
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(code = e.code(), error = %e, "Command failed");
            match serde_json::to_string_pretty(&e.body()) {
                Ok(body) => eprintln!("{body}"),
                Err(_) => eprintln!("{e}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<String, ServiceError> {
    let open = || -> Result<LedgerService, ServiceError> {
        let config = LedgerConfig::from_env()?;
        LedgerService::open(&config)
    };

    match command {
        Command::Ingest { files, deploy } => {
            let documents = files
                .iter()
                .map(|path| Document::from_path(path))
                .collect::<Result<Vec<_>, _>>()?;
            let config = LedgerConfig::from_env()?;
            let service = LedgerService::open(&config)?.with_processor(build_processor(&config)?);
            if deploy {
                to_json(&service.ingest_and_deploy(&documents)?)
            } else {
                to_json(&service.ingest(&documents)?)
            }
        }
        Command::List { state: Some(state) } => to_json(&open()?.records_by_state(&state)?),
        Command::List { state: None } => to_json(&open()?.snapshot()?),
        Command::Update {
            index,
            notes,
            status,
        } => to_json(&open()?.update(index, RecordUpdate { notes, status })?),
        Command::Delete { index } => to_json(&open()?.delete(index)?),
        Command::Dedup => to_json(&Count {
            count: open()?.dedup()?,
        }),
        Command::Normalize => to_json(&Count {
            count: open()?.normalize_all()?,
        }),
        Command::Clear => to_json(&Count {
            count: open()?.clear()?,
        }),
        Command::ImportLegacy { dir } => to_json(&open()?.import_legacy_dir(&dir)?),
        Command::Segment { file } => {
            let text = std::fs::read_to_string(&file).map_err(|source| ServiceError::Read {
                path: file.display().to_string(),
                source,
            })?;
            to_json(&segment_wells(&text))
        }
        Command::StateName { code } => to_json(&state_name(&code)),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ServiceError> {
    Ok(serde_json::to_string_pretty(value).map_err(StoreError::Json)?)
}
