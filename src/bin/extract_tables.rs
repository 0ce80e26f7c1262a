//! Extract tables from documents with parsed layout
//!
//! Runs each document through the ingestion pipeline and prints the tables
//! found, as Markdown or JSON. Layout is read from `<file>.layout.json`
//! sidecars (or the file itself when it is `.json`).
//!
//! Usage:
//!   cargo run --release --bin extract_tables -- report.pdf invoice.pdf
//!   cargo run --release --bin extract_tables -- --method ai --format json report.pdf
//!   RUST_LOG=tablesift=debug cargo run --bin extract_tables -- --config pipeline.json scans/*.pdf

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tablesift::document::Document;
use tablesift::pipeline::{IngestionPipeline, JsonLayoutParser, PipelineConfig, ProcessedDocument};
use tablesift::tables::{
    DetectionMethod, EmbeddedLayoutModel, ExtractorRegistry, TableExtractionService,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Markdown,
    Json,
}

struct CliConfig {
    documents: Vec<PathBuf>,
    method: Option<DetectionMethod>,
    min_confidence: Option<f32>,
    config_path: Option<PathBuf>,
    format: OutputFormat,
    concurrency: Option<usize>,
}

impl CliConfig {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let mut config = CliConfig {
            documents: Vec::new(),
            method: None,
            min_confidence: None,
            config_path: None,
            format: OutputFormat::Markdown,
            concurrency: None,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--method" | "-m" => {
                    let value = next_value(&args, &mut i, "--method")?;
                    let method = value
                        .parse::<DetectionMethod>()
                        .map_err(|e| e.to_string())?;
                    config.method = Some(method);
                },
                "--min-confidence" => {
                    let value = next_value(&args, &mut i, "--min-confidence")?;
                    let threshold: f32 = value
                        .parse()
                        .map_err(|_| format!("invalid confidence '{}'", value))?;
                    config.min_confidence = Some(threshold);
                },
                "--config" | "-c" => {
                    let path = next_value(&args, &mut i, "--config")?;
                    config.config_path = Some(PathBuf::from(path));
                },
                "--format" | "-f" => {
                    config.format = match next_value(&args, &mut i, "--format")? {
                        "markdown" | "md" => OutputFormat::Markdown,
                        "json" => OutputFormat::Json,
                        other => return Err(format!("unknown format '{}'", other)),
                    };
                },
                "--concurrency" | "-j" => {
                    let value = next_value(&args, &mut i, "--concurrency")?;
                    config.concurrency = Some(
                        value
                            .parse()
                            .map_err(|_| format!("invalid concurrency '{}'", value))?,
                    );
                },
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                },
                flag if flag.starts_with('-') => return Err(format!("unknown option '{}'", flag)),
                path => config.documents.push(PathBuf::from(path)),
            }
            i += 1;
        }

        if config.documents.is_empty() {
            return Err("no documents given".to_string());
        }
        Ok(config)
    }
}

fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires a value", flag))
}

fn print_usage() {
    eprintln!("Usage: extract_tables [OPTIONS] <DOCUMENT>...");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -m, --method <ai|rule|hybrid>   Method to try before rule-based");
    eprintln!("      --min-confidence <0..1>     Confidence that ends the fallback chain");
    eprintln!("  -c, --config <FILE>             Pipeline configuration (JSON)");
    eprintln!("  -f, --format <markdown|json>    Output format (default: markdown)");
    eprintln!("  -j, --concurrency <N>           Documents processed at once");
}

fn print_markdown(processed: &ProcessedDocument) {
    let document = &processed.document;
    println!("# {} ({})", document.filename, document.status());
    println!();

    match &processed.outcome {
        Ok(result) if result.is_empty() => {
            println!("_No tables found._");
            println!();
        },
        Ok(result) => {
            println!(
                "Method: {}, confidence: {:.2}",
                result.method().map_or("none", |m| m.as_str()),
                result.confidence()
            );
            println!();
            for table in result.tables() {
                println!("## {}", table.id);
                println!();
                println!("{}", table.to_markdown());
                println!();
            }
        },
        Err(e) => {
            println!("Error: {}", e);
            println!();
        },
    }
}

fn print_json(processed: &[ProcessedDocument]) -> Result<(), serde_json::Error> {
    let entries: Vec<serde_json::Value> = processed
        .iter()
        .map(|p| {
            serde_json::json!({
                "document": p.document,
                "result": p.result(),
                "error": p.outcome.as_ref().err().map(|e| e.to_string()),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let cli = match CliConfig::from_args() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            return ExitCode::from(2);
        },
    };

    let mut config = match &cli.config_path {
        Some(path) => match PipelineConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading {}: {}", path.display(), e);
                return ExitCode::from(2);
            },
        },
        None => PipelineConfig::default(),
    };
    if let Some(threshold) = cli.min_confidence {
        config.extraction.min_confidence_threshold = threshold;
    }
    if let Some(concurrency) = cli.concurrency {
        config = config.with_max_concurrent_documents(concurrency);
    }
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::from(2);
    }

    let registry = ExtractorRegistry::with_defaults(
        &config.extraction,
        Some(Arc::new(EmbeddedLayoutModel)),
    );
    let service = TableExtractionService::new(registry, config.extraction.clone());
    let pipeline = IngestionPipeline::new(Arc::new(JsonLayoutParser), Arc::new(service), config)
        .with_preferred_method(cli.method);

    let documents = cli.documents.into_iter().map(Document::new).collect();
    let processed = pipeline.process_batch(documents).await;

    match cli.format {
        OutputFormat::Markdown => processed.iter().for_each(print_markdown),
        OutputFormat::Json => {
            if let Err(e) = print_json(&processed) {
                eprintln!("Error writing JSON: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }

    let failed = processed.iter().filter(|p| p.outcome.is_err()).count();
    if failed > 0 {
        eprintln!("{} of {} document(s) failed", failed, processed.len());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
