use anyhow::{Context, Result};
use clap::Parser;
use http_transport_firehose::constants::DEFAULT_SCHEME;
use http_transport_firehose::envelope::DeliveryRequest;
use http_transport_firehose::record::parse_request;
use jsonschema::JSONSchema;
use serde_json::Value;
use std::{fs, path::PathBuf};

const DELIVERY_REQUEST_SCHEMA: &str = include_str!("../../schemas/delivery_request.v1.json");

/// Validate a delivery request body and dry-run-parse its records without replaying them.
#[derive(Parser, Debug)]
#[command(name = "validate-batch", version, about = "Validate a Firehose delivery request JSON file")]
struct Cli {
    /// Path to the delivery request JSON file to validate
    path: PathBuf,

    /// Optional path to a schema file (defaults to the bundled delivery_request.v1.json)
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Scheme used for origin-form request targets
    #[arg(long, default_value = DEFAULT_SCHEME)]
    scheme: String,
}

fn load_json(path: &PathBuf) -> Result<Value> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let json: Value = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse JSON in {}", path.display()))?;
    Ok(json)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let schema_json = match &args.schema {
        Some(path) => load_json(path)?,
        None => serde_json::from_str(DELIVERY_REQUEST_SCHEMA).context("Bundled schema is invalid")?,
    };
    let instance = load_json(&args.path)?;

    // jsonschema 0.17 expects a schema with 'static lifetime; leak the parsed schema for CLI lifetime
    let schema_static: &'static Value = Box::leak(Box::new(schema_json));
    let compiled = JSONSchema::options()
        .compile(schema_static)
        .context("Failed to compile JSON Schema")?;

    if let Err(errors) = compiled.validate(&instance) {
        eprintln!("invalid:");
        for error in errors {
            eprintln!("- {} at {}", error, error.instance_path);
        }
        std::process::exit(1)
    }

    let request: DeliveryRequest =
        serde_json::from_value(instance).context("Failed to decode delivery request")?;
    let mut malformed = 0;
    for (index, record) in request.records.iter().enumerate() {
        match parse_request(&record.data, &args.scheme) {
            Ok(req) => println!("{:>4}  {} {}", index, req.method(), req.uri()),
            Err(e) => {
                malformed += 1;
                println!("{:>4}  skip: {}", index, e);
            }
        }
    }
    println!(
        "valid: {} records, {} would be skipped",
        request.records.len(),
        malformed
    );
    Ok(())
}
