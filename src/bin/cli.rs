//! flatdoc CLI
//!
//! Command-line interface for inspecting and editing a flatdoc data directory.

use std::process;

use clap::{Parser, Subcommand};
use flatdoc::record::document_from_json;
use flatdoc::{Config, CorruptionPolicy, Database, Query, SortSpec, Update};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

/// flatdoc CLI
#[derive(Parser, Debug)]
#[command(name = "flatdoc-cli")]
#[command(about = "CLI for the flatdoc embedded document store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./flatdoc_data")]
    data_dir: String,

    /// Fail instead of treating unreadable collection files as empty
    #[arg(long)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List collections
    Collections,

    /// Query a collection
    Find {
        /// Collection name
        collection: String,

        /// Query as JSON, e.g. '{"status": "Pending"}'
        #[arg(short, long)]
        query: Option<String>,

        /// Sort spec as JSON, e.g. '{"createdAt": -1}'
        #[arg(long)]
        sort: Option<String>,

        /// Number of results to skip
        #[arg(long)]
        skip: Option<usize>,

        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Get a record by id
    Get {
        collection: String,
        id: String,
    },

    /// Insert a record given as JSON
    Insert {
        collection: String,
        document: String,
    },

    /// Merge JSON fields into a record
    Update {
        collection: String,
        id: String,
        fields: String,
    },

    /// Delete a record by id
    Delete {
        collection: String,
        id: String,
    },

    /// Remove every record from a collection
    Clear {
        collection: String,
    },
}

fn main() {
    // Initialize tracing/logging (stderr keeps stdout clean for JSON)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,flatdoc=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> flatdoc::Result<()> {
    let policy = if args.strict {
        CorruptionPolicy::Fail
    } else {
        CorruptionPolicy::TreatAsEmpty
    };

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .corruption_policy(policy)
        .build();

    let db = Database::open(config)?;

    let output = match args.command {
        Commands::Collections => serde_json::to_value(db.collection_names()?)?,
        Commands::Find {
            collection,
            query,
            sort,
            skip,
            limit,
        } => {
            let query = match query {
                Some(text) => Query::from_json(&parse_json(&text)?)?,
                None => Query::new(),
            };

            let mut cursor = db.collection(&collection)?.find(query);
            if let Some(text) = sort {
                cursor = cursor.sort(SortSpec::from_json(&parse_json(&text)?)?);
            }
            if let Some(n) = skip {
                cursor = cursor.skip(n);
            }
            if let Some(n) = limit {
                cursor = cursor.limit(n);
            }
            serde_json::to_value(cursor.resolve()?)?
        }
        Commands::Get { collection, id } => {
            let record = db.collection(&collection)?.find_by_id(&Value::String(id))?;
            serde_json::to_value(record)?
        }
        Commands::Insert {
            collection,
            document,
        } => {
            let doc = document_from_json(parse_json(&document)?)?;
            serde_json::to_value(db.collection(&collection)?.create(doc)?)?
        }
        Commands::Update {
            collection,
            id,
            fields,
        } => {
            let update = Update::from_json(parse_json(&fields)?)?;
            let record = db
                .collection(&collection)?
                .update_by_id(&Value::String(id), update)?;
            serde_json::to_value(record)?
        }
        Commands::Delete { collection, id } => {
            let removed = db.collection(&collection)?.delete_by_id(&Value::String(id))?;
            serde_json::to_value(removed)?
        }
        Commands::Clear { collection } => {
            let count = db.collection(&collection)?.delete_many(Query::new())?;
            serde_json::json!({ "deletedCount": count })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn parse_json(text: &str) -> flatdoc::Result<Value> {
    Ok(serde_json::from_str(text)?)
}
