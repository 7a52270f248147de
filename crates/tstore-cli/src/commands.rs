use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;
use tstore_engine::config::{open, StorageConfig};
use tstore_engine::{Document, Filter, Record, RecordId, TopicStorage, Value};
use tstore_types::codec::{document_from_json, document_to_json, value_to_json};

use crate::cli::*;

const DEFAULT_CONFIG: &str = "tstore.toml";
const DEFAULT_ROOT: &str = ".tstore";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let json = matches!(cli.format, OutputFormat::Json);
    match cli.command {
        Command::Insert(args) => cmd_insert(&open(&config)?, args, json),
        Command::Get(args) => cmd_get(&open(&config)?, args, json),
        Command::Find(args) => cmd_find(&open(&config)?, args, json),
        Command::Delete(args) => cmd_delete(&open(&config)?, args, json),
        Command::Sessions => cmd_sessions(&open(&config)?, json),
        Command::Config => cmd_config(&config, json),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<StorageConfig> {
    let mut config = match &cli.config {
        Some(path) => StorageConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG).is_file() => StorageConfig::load(Path::new(DEFAULT_CONFIG))?,
        None => StorageConfig::local(DEFAULT_ROOT),
    };
    if let Some(root) = &cli.root {
        config.endpoint = StorageConfig::local(root).endpoint;
    }
    if let Some(collection) = &cli.collection {
        config.collection = collection.clone();
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_insert(storage: &TopicStorage, args: InsertArgs, json: bool) -> anyhow::Result<()> {
    let id = insert(storage, &args)?;
    if json {
        println!("{}", json!({ "_id": id.to_string() }));
    } else {
        println!("{} Inserted record {}", "✓".green().bold(), id.to_string().yellow());
        if !args.attachments.is_empty() {
            println!("  Attachments: {}", args.attachments.len());
        }
    }
    Ok(())
}

fn insert(storage: &TopicStorage, args: &InsertArgs) -> anyhow::Result<RecordId> {
    let body = build_body(&args.json, &args.attachments)?;
    let mut record = Record::new(body);
    if let Some(session) = &args.session {
        record = record.with_session(session.clone());
    }
    Ok(storage.insert_one(&record)?)
}

fn cmd_get(storage: &TopicStorage, args: GetArgs, json: bool) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    let record = storage.find_by_id(&id)?;

    let written = match &args.out {
        Some(dir) => write_binaries(&record.body, dir)?,
        None => Vec::new(),
    };

    if json {
        let mut out = record_header(&record);
        out["body"] = document_to_json(&record.body);
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_record(&record);
    for path in &written {
        println!("  {} {}", "wrote".green(), path.display());
    }
    Ok(())
}

fn cmd_find(storage: &TopicStorage, args: FindArgs, json: bool) -> anyhow::Result<()> {
    let cursor = match &args.session {
        Some(session) => storage.find_by_session_id(session)?,
        None => storage.find(&Filter::all())?,
    };
    let limit = args.limit.unwrap_or(usize::MAX);
    let mut shown = 0;
    for record in cursor.take(limit) {
        let record = record?;
        if json {
            let mut line = record_header(&record);
            line["keys"] = json!(record.body.keys().collect::<Vec<_>>());
            println!("{line}");
        } else {
            let keys: Vec<&str> = record.body.keys().map(String::as_str).collect();
            println!(
                "{}  {}  {}  {}",
                record.id.short_id().yellow(),
                record.session().unwrap_or("-").cyan(),
                format_time(&record).dimmed(),
                keys.join(", ")
            );
        }
        shown += 1;
    }
    if !json && shown == 0 {
        println!("No records.");
    }
    Ok(())
}

fn cmd_delete(storage: &TopicStorage, args: DeleteArgs, json: bool) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    let report = storage.delete_by_id(&id)?;
    if json {
        println!(
            "{}",
            json!({
                "_id": id.to_string(),
                "records": report.records,
                "blobs_deleted": report.blobs.deleted.len(),
                "blobs_missing": report.blobs.missing.len(),
            })
        );
    } else {
        println!("{} Deleted record {}", "✓".green().bold(), id.to_string().yellow());
        println!("  Blobs removed: {}", report.blobs.deleted.len());
        if !report.blobs.missing.is_empty() {
            println!("  Blobs already missing: {}", report.blobs.missing.len().to_string().red());
        }
    }
    Ok(())
}

fn cmd_sessions(storage: &TopicStorage, json: bool) -> anyhow::Result<()> {
    let sessions = storage.get_unique_sessions()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }
    if sessions.is_empty() {
        println!("No sessions.");
    }
    for (session, info) in &sessions {
        let time = info
            .time
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".into());
        println!("{}  {} record(s)  first seen {}", session.cyan().bold(), info.count, time.dimmed());
    }
    Ok(())
}

fn cmd_config(config: &StorageConfig, json: bool) -> anyhow::Result<()> {
    let endpoint = config.resolve_endpoint()?;
    if json {
        let out = json!({ "config": config, "endpoint": endpoint.to_string() });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Endpoint: {}", endpoint.to_string().bold());
        print!("{}", config.to_toml_string()?);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_id(raw: &str) -> anyhow::Result<RecordId> {
    raw.parse()
        .with_context(|| format!("'{raw}' is not a record id"))
}

/// Parse the JSON body and splice in `KEY=PATH` attachments as binary values.
fn build_body(json: &str, attachments: &[String]) -> anyhow::Result<Document> {
    let parsed: serde_json::Value =
        serde_json::from_str(json).context("record body is not valid JSON")?;
    if !parsed.is_object() {
        bail!("record body must be a JSON object");
    }
    let mut body = document_from_json(parsed)?;
    for spec in attachments {
        let (key, path) = spec
            .split_once('=')
            .with_context(|| format!("attachment '{spec}' is not KEY=PATH"))?;
        let data = std::fs::read(path).with_context(|| format!("cannot read {path}"))?;
        insert_path(&mut body, key, Value::from(data))?;
    }
    Ok(body)
}

fn insert_path(doc: &mut Document, path: &str, value: Value) -> anyhow::Result<()> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    if head.is_empty() {
        bail!("empty key segment in '{path}'");
    }
    let Some(rest) = rest else {
        doc.insert(head, value);
        return Ok(());
    };
    if !doc.contains_key(head) {
        doc.insert(head, Document::new());
    }
    match doc.get_mut(head) {
        Some(Value::Document(child)) => insert_path(child, rest, value),
        _ => bail!("'{head}' is not an object"),
    }
}

/// Write every binary leaf under `dir`, one file per dotted key.
fn write_binaries(body: &Document, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    let mut leaves = Vec::new();
    collect_binaries(body, "", &mut leaves);
    let mut written = Vec::with_capacity(leaves.len());
    for (key, data) in leaves {
        let path = dir.join(&key);
        std::fs::write(&path, data).with_context(|| format!("cannot write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

fn collect_binaries<'a>(doc: &'a Document, prefix: &str, out: &mut Vec<(String, &'a [u8])>) {
    for (key, value) in doc {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Binary(data) => out.push((path, &data[..])),
            Value::Document(child) => collect_binaries(child, &path, out),
            _ => {}
        }
    }
}

fn record_header(record: &Record) -> serde_json::Value {
    json!({
        "_id": record.id.to_string(),
        "session": record.session(),
        "sys_time": record.meta.sys_time.map(|t| t.to_rfc3339()),
    })
}

fn format_time(record: &Record) -> String {
    record
        .meta
        .sys_time
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".into())
}

fn print_record(record: &Record) {
    println!("Record {}", record.id.to_string().yellow().bold());
    println!("  Session: {}", record.session().unwrap_or("-").cyan());
    println!("  Captured: {}", format_time(record));
    print_fields(&record.body, 1);
}

fn print_fields(doc: &Document, depth: usize) {
    let indent = "  ".repeat(depth);
    for (key, value) in doc {
        match value {
            Value::Document(child) => {
                println!("{indent}{}:", key.bold());
                print_fields(child, depth + 1);
            }
            Value::Binary(data) => {
                println!("{indent}{}: {}", key.bold(), format!("<{} bytes>", data.len()).dimmed());
            }
            other => println!("{indent}{}: {}", key.bold(), value_to_json(other)),
        }
    }
}
