//! Command-line front end for layered section layouts.
//!
//! Provides the `masterblock` binary, which composes and reads document
//! layouts stored in a SQLite database through the same
//! [`SectionInstances`] service a builder backend would use.
//!
//! Configuration comes from flags, falling back to environment variables:
//! - `MASTERBLOCK_DB_PATH`: SQLite database file path (default: "masterblock.db")
//! - `MASTERBLOCK_CATALOG`: section catalog JSON file (optional)
//!
//! Logging goes to stderr and is filtered with `RUST_LOG` (default: "warn").

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use masterblock_core::{DocumentId, FieldMap, Section, SettingsRequest, StaticCatalog};
use masterblock_layout::{Composition, LayoutError, LegacyKeys, SectionInstances};
use masterblock_storage::{DocumentStore, SqliteStore};

const EXIT_OK: i32 = 0;
const EXIT_INPUT: i32 = 1;
const EXIT_GAPS: i32 = 2;
const EXIT_STORAGE: i32 = 3;

/// Layered section storage for page layouts.
#[derive(Parser)]
#[command(name = "masterblock", about = "Compose and read layered section layouts")]
struct Cli {
    /// Path to the layout database file.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Section catalog JSON file.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Create a document (or a revision snapshot of one) and print its ID.
    NewDocument {
        /// Create a snapshot of this document instead.
        #[arg(long)]
        revision_of: Option<i64>,
    },

    /// Save a JSON array of sections as the document's layout.
    Compose {
        /// Document ID.
        #[arg(short, long)]
        document: i64,

        /// JSON file holding the raw section maps.
        #[arg(short, long)]
        input: PathBuf,

        /// Legacy meta key to delete before saving (repeatable).
        #[arg(long = "purge-key")]
        purge_keys: Vec<String>,

        /// Legacy meta key prefix to delete before saving (repeatable).
        #[arg(long = "purge-prefix")]
        purge_prefixes: Vec<String>,
    },

    /// Print the document's merged layout.
    Read {
        /// Document ID.
        #[arg(short, long)]
        document: i64,
    },

    /// Print every section type's default fields.
    Defaults,

    /// Print the settings controls of a section type.
    Settings {
        /// Section type.
        #[arg(short = 't', long = "type")]
        section_type: Option<String>,

        /// Builder-side section ID, echoed back.
        #[arg(long)]
        id: Option<String>,
    },
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq)]
struct Config {
    db_path: String,
    catalog_path: Option<PathBuf>,
}

impl Config {
    fn resolve(cli: &Cli) -> Self {
        Self::from_parts(
            cli.db.clone(),
            cli.catalog.clone(),
            std::env::var("MASTERBLOCK_DB_PATH").ok(),
            std::env::var("MASTERBLOCK_CATALOG").ok(),
        )
    }

    fn from_parts(
        db: Option<String>,
        catalog: Option<PathBuf>,
        env_db: Option<String>,
        env_catalog: Option<String>,
    ) -> Self {
        Config {
            db_path: db
                .or(env_db)
                .unwrap_or_else(|| "masterblock.db".to_string()),
            catalog_path: catalog.or(env_catalog.map(PathBuf::from)),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::resolve(&cli);
    tracing::debug!(db = %config.db_path, catalog = ?config.catalog_path, "resolved configuration");

    let exit_code = match cli.command {
        Commands::NewDocument { revision_of } => run_new_document(&config, revision_of),
        Commands::Compose {
            document,
            input,
            purge_keys,
            purge_prefixes,
        } => run_compose(
            &config,
            DocumentId(document),
            &input,
            LegacyKeys {
                exact: purge_keys,
                prefixes: purge_prefixes,
            },
        ),
        Commands::Read { document } => run_read(&config, DocumentId(document)),
        Commands::Defaults => run_defaults(&config),
        Commands::Settings { section_type, id } => {
            run_settings(&config, SettingsRequest { section_type, id })
        }
    };
    process::exit(exit_code);
}

fn load_catalog(config: &Config) -> Result<StaticCatalog, String> {
    let Some(path) = &config.catalog_path else {
        return Ok(StaticCatalog::default());
    };
    let json = fs::read_to_string(path)
        .map_err(|e| format!("failed to read catalog '{}': {}", path.display(), e))?;
    StaticCatalog::from_json(&json)
        .map_err(|e| format!("failed to parse catalog '{}': {}", path.display(), e))
}

fn open_store(config: &Config) -> Result<SqliteStore, i32> {
    SqliteStore::new(&config.db_path).map_err(|e| {
        eprintln!("Error: failed to open database '{}': {}", config.db_path, e);
        EXIT_STORAGE
    })
}

fn print_json(value: &serde_json::Value) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize output: {}\"}}", e));
    println!("{}", json);
}

/// Prints a saved composition. The save already happened, so a report that
/// fails to serialize is a storage-side failure.
fn print_composition(composition: &Composition) -> i32 {
    match serde_json::to_value(composition) {
        Ok(value) => {
            print_json(&value);
            EXIT_OK
        }
        Err(e) => {
            eprintln!("Error: failed to serialize save report: {}", e);
            EXIT_STORAGE
        }
    }
}

/// Maps a layout error to an exit code, printing it.
fn report_error(err: &LayoutError) -> i32 {
    eprintln!("Error: {}", err);
    match err {
        LayoutError::UnknownSection { .. }
        | LayoutError::ForeignSection { .. }
        | LayoutError::DuplicateSection { .. }
        | LayoutError::InvalidSection(_) => EXIT_INPUT,
        LayoutError::IdentityAllocationFailed { .. }
        | LayoutError::StoreWriteFailed(_)
        | LayoutError::StoreReadFailed(_) => EXIT_STORAGE,
    }
}

fn run_new_document(config: &Config, revision_of: Option<i64>) -> i32 {
    let mut store = match open_store(config) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let created = match revision_of {
        Some(of) => store.create_revision(DocumentId(of)),
        None => store.create_document(),
    };
    match created {
        Ok(id) => {
            print_json(&json!({ "document": id.0 }));
            EXIT_OK
        }
        Err(e) => {
            eprintln!("Error: failed to create document: {}", e);
            EXIT_STORAGE
        }
    }
}

fn run_compose(config: &Config, document: DocumentId, input: &Path, legacy: LegacyKeys) -> i32 {
    let catalog = match load_catalog(config) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return EXIT_INPUT;
        }
    };

    let raw: Vec<FieldMap> = match fs::read_to_string(input)
        .map_err(|e| e.to_string())
        .and_then(|json| serde_json::from_str(&json).map_err(|e| e.to_string()))
    {
        Ok(raw) => raw,
        Err(msg) => {
            eprintln!("Error: failed to load sections from '{}': {}", input.display(), msg);
            return EXIT_INPUT;
        }
    };

    let mut sections = match raw.into_iter().map(Section::from_raw).collect::<Result<Vec<_>, _>>() {
        Ok(sections) => sections,
        Err(e) => {
            eprintln!("Error: invalid section: {}", e);
            return EXIT_INPUT;
        }
    };

    let store = match open_store(config) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let defaults = catalog.defaults();
    let mut service = SectionInstances::new(store, catalog).with_legacy_keys(legacy);
    service.apply_defaults(&mut sections, &defaults);

    match service.compose(document, sections) {
        Ok(Composition::Skipped) => {
            eprintln!("Document {} is a revision snapshot; nothing saved.", document);
            print_json(&json!({ "status": "skipped" }));
            EXIT_OK
        }
        Ok(composition) => print_composition(&composition),
        Err(e) => report_error(&e),
    }
}

fn run_read(config: &Config, document: DocumentId) -> i32 {
    let catalog = match load_catalog(config) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return EXIT_INPUT;
        }
    };
    let store = match open_store(config) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let service = SectionInstances::new(store, catalog);

    match service.read(document) {
        Ok(None) => {
            eprintln!("Document {} has no saved layout.", document);
            print_json(&json!({ "sections": [], "gaps": [] }));
            EXIT_OK
        }
        Ok(Some(read)) => {
            let records: Vec<FieldMap> = read
                .sections
                .iter()
                .cloned()
                .map(Section::into_record)
                .collect();
            print_json(&json!({ "sections": records, "gaps": read.gaps }));
            if read.is_complete() {
                EXIT_OK
            } else {
                eprintln!("Layout has {} integrity gap(s):", read.gaps.len());
                for gap in &read.gaps {
                    eprintln!("  - {}", gap);
                }
                EXIT_GAPS
            }
        }
        Err(e) => report_error(&e),
    }
}

fn run_defaults(config: &Config) -> i32 {
    match load_catalog(config) {
        Ok(catalog) => {
            print_json(&json!(catalog.defaults()));
            EXIT_OK
        }
        Err(msg) => {
            eprintln!("Error: {}", msg);
            EXIT_INPUT
        }
    }
}

fn run_settings(config: &Config, request: SettingsRequest) -> i32 {
    match load_catalog(config) {
        Ok(catalog) => {
            print_json(&json!({
                "id": request.id,
                "settings": catalog.settings(&request),
            }));
            EXIT_OK
        }
        Err(msg) => {
            eprintln!("Error: {}", msg);
            EXIT_INPUT
        }
    }
}
