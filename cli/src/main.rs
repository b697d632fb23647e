mod output;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use page_schema_core::{
    ComposeOptions, FieldPath, Generation, NormalizationCache, PageComposer, SchemaRegistry, Validator,
    classify_with_hint,
};
use page_schema_db::{
    CompositionStatus, Document, DocumentEntry, DocumentStore, EngineConfig, Manifest, OptionsFingerprint,
};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::output::{
    DataFormat, ListingFormat, describe_classification, describe_error, format_data, format_registry,
};

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "page-compose")]
#[command(about = "Validate, normalize and compose CMS page documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compose page documents into canonical pages.
    Compose(ComposeArgs),
    /// Validate and normalize a single content record.
    Validate(ValidateArgs),
    /// Print the variant and schema generation of a content record.
    Classify(ClassifyArgs),
    /// List the registered content variants and generations.
    Registry(RegistryArgs),
}

#[derive(Debug, Args)]
struct ComposeArgs {
    /// Page document files and/or directories of documents.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Output directory for composed pages.
    #[arg(long)]
    output: PathBuf,
    /// Engine configuration YAML file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Manifest JSON file recording composition state between runs.
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// Output format for composed pages.
    #[arg(long, default_value = "json")]
    format: DataFormat,
    /// Number of parallel composition jobs (default: number of CPUs).
    #[arg(long)]
    jobs: Option<usize>,
    /// Compose every document even if the manifest says it is unchanged.
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Content record file (JSON or YAML).
    file: PathBuf,
    /// Force a schema generation instead of best-fit discrimination.
    #[arg(long)]
    generation: Option<u32>,
    /// Output format for the canonical record.
    #[arg(long, default_value = "json")]
    format: DataFormat,
}

#[derive(Debug, Args)]
struct ClassifyArgs {
    /// Content record file (JSON or YAML).
    file: PathBuf,
    /// Print the classification as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct RegistryArgs {
    /// Listing format.
    #[arg(long, default_value = "table")]
    format: ListingFormat,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Compose(args) => run_compose(args),
        Command::Validate(args) => run_validate(args),
        Command::Classify(args) => run_classify(args),
        Command::Registry(args) => run_registry(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// compose command
// ---------------------------------------------------------------------------

/// Result of composing one document on a worker thread.
struct CompositionOutcome {
    name: String,
    checksum: String,
    page_type: Option<String>,
    reason: &'static str,
    output_file: Option<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl CompositionOutcome {
    fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

fn run_compose(args: ComposeArgs) -> Result<(), String> {
    use rayon::prelude::*;

    let registry = SchemaRegistry::builtin();

    // 1. Load and check the engine configuration
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?,
        None => EngineConfig::default(),
    };
    config
        .validate(registry)
        .map_err(|e| format!("Invalid config: {e}"))?;
    let options = config.into_options();
    let fingerprint = OptionsFingerprint::from(&options);

    // 2. Load documents
    let store = DocumentStore::from_paths(&args.inputs)
        .map_err(|e| format!("Failed to load documents: {e}"))?;
    if store.is_empty() {
        return Err("no page documents found in the given inputs".to_string());
    }

    // 3. Load or create the manifest
    let mut manifest = match &args.manifest {
        Some(path) if path.exists() => Manifest::load(path)
            .map_err(|e| format!("Failed to load manifest '{}': {e}", path.display()))?,
        _ => Manifest::new(PACKAGE_VERSION.to_string(), fingerprint.clone()),
    };
    let options_changed = manifest.options != fingerprint || manifest.tool_version != PACKAGE_VERSION;

    fs::create_dir_all(&args.output).map_err(|e| {
        format!(
            "Failed to create output directory '{}': {e}",
            args.output.display()
        )
    })?;

    // 4. Build the work list
    let mut work: Vec<(&Document, &'static str)> = Vec::new();
    let mut skipped = 0usize;
    for document in store.documents() {
        let output_file = format!("{}.{}", document.name, args.format.extension());
        let reason = if args.force {
            Some("forced")
        } else if options_changed {
            Some("options changed")
        } else if !manifest.contains(&document.name) {
            Some("new")
        } else if manifest.needs_composition(&document.name, &document.checksum) {
            Some("checksum changed")
        } else if manifest
            .get(&document.name)
            .is_some_and(|entry| entry.status == CompositionStatus::Failed)
        {
            Some("previously failed")
        } else if !args.output.join(&output_file).exists() {
            Some("output missing")
        } else {
            None
        };
        match reason {
            Some(reason) => work.push((document, reason)),
            None => {
                debug!(document = %document.name, "unchanged, skipping");
                skipped += 1;
            }
        }
    }

    // 5. Compose in parallel with a shared normalization cache
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = args.jobs {
        builder = builder.num_threads(jobs);
    }
    let pool = builder
        .build()
        .map_err(|e| format!("Failed to create thread pool: {e}"))?;

    let cache = NormalizationCache::new();
    let use_cache = options.cache;
    let mut composer = PageComposer::new(registry).with_options(options);
    if use_cache {
        composer = composer.with_cache(&cache);
    }
    let composer = &composer;
    let output_dir = &args.output;
    let format = args.format;

    let outcomes: Vec<CompositionOutcome> = pool.install(|| {
        work.par_iter()
            .map(|&(document, reason)| {
                let mut outcome = CompositionOutcome {
                    name: document.name.clone(),
                    checksum: document.checksum.clone(),
                    page_type: document.page_type().map(String::from),
                    reason,
                    output_file: None,
                    warnings: Vec::new(),
                    errors: Vec::new(),
                };
                match composer.compose(&document.value) {
                    Ok(composed) => {
                        outcome.warnings = composed.warnings.iter().map(ToString::to_string).collect();
                        let output_file = format!("{}.{}", document.name, format.extension());
                        let written = format_data(&composed.page, format).and_then(|text| {
                            fs::write(output_dir.join(&output_file), text)
                                .map_err(|e| format!("Failed to write '{output_file}': {e}"))
                        });
                        match written {
                            Ok(()) => {
                                info!(
                                    document = %document.name,
                                    elements = composed.page.element_count(),
                                    "composed page"
                                );
                                outcome.output_file = Some(output_file);
                            }
                            Err(err) => outcome.errors.push(err),
                        }
                    }
                    Err(errors) => {
                        outcome.errors = errors.iter().map(describe_error).collect();
                    }
                }
                outcome
            })
            .collect()
    });

    // 6. Record outcomes
    for outcome in &outcomes {
        let entry = DocumentEntry {
            checksum: outcome.checksum.clone(),
            page_type: outcome.page_type.clone(),
            status: if outcome.succeeded() {
                CompositionStatus::Composed
            } else {
                CompositionStatus::Failed
            },
            error_count: outcome.errors.len(),
            warning_count: outcome.warnings.len(),
            composed_at: chrono::Utc::now(),
            output_file: outcome.output_file.clone(),
        };
        manifest.update_entry(outcome.name.clone(), entry);
    }
    manifest.options = fingerprint;
    manifest.tool_version = PACKAGE_VERSION.to_string();

    if let Some(path) = &args.manifest {
        manifest
            .save(path)
            .map_err(|e| format!("Failed to save manifest '{}': {e}", path.display()))?;
    }

    // 7. Report
    let composed_count = outcomes.iter().filter(|o| o.succeeded()).count();
    let failed_count = outcomes.len() - composed_count;

    println!("Compose Summary:");
    println!("  Documents: {}", store.len());
    println!("  Composed: {composed_count}");
    println!("  Skipped: {skipped} (unchanged)");
    println!("  Failed: {failed_count}");
    if use_cache {
        println!("  Cached records: {}", cache.len());
    }

    for outcome in outcomes.iter().filter(|o| !o.warnings.is_empty()) {
        for warning in &outcome.warnings {
            eprintln!("warning: {}: {warning}", outcome.name);
        }
    }

    if failed_count > 0 {
        eprintln!("\nFailures:");
        for outcome in outcomes.iter().filter(|o| !o.succeeded()) {
            eprintln!("  {} ({}):", outcome.name, outcome.reason);
            for err in &outcome.errors {
                eprintln!("    {err}");
            }
        }
        return Err(format!("{failed_count} document(s) failed to compose"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// validate / classify commands
// ---------------------------------------------------------------------------

fn read_record(path: &Path) -> Result<Value, String> {
    Document::read(path)
        .map(|document| document.value)
        .map_err(|e| format!("Failed to read '{}': {e}", path.display()))
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let raw = read_record(&args.file)?;
    let registry = SchemaRegistry::builtin();

    let mut options = ComposeOptions::default();
    if let Some(generation) = args.generation {
        let template = raw
            .get("inputTemplate")
            .and_then(Value::as_str)
            .ok_or("--generation needs a record with an inputTemplate")?;
        options = options.with_hint(template, Generation::new(generation));
    }

    let mut validator = Validator::new(registry, &options);
    match validator.content(&raw, &FieldPath::root()) {
        Ok(Some(content)) => {
            for warning in validator.warnings() {
                eprintln!("warning: {warning}");
            }
            println!("{}", format_data(&content, args.format)?);
            Ok(())
        }
        Ok(None) => Err(format!(
            "{}: not a registered content variant",
            args.file.display()
        )),
        Err(errors) => {
            for err in &errors {
                eprintln!("  [{}] {err}", err.kind());
            }
            Err(format!("{} validation error(s)", errors.len()))
        }
    }
}

fn run_classify(args: ClassifyArgs) -> Result<(), String> {
    let raw = read_record(&args.file)?;
    let classification = classify_with_hint(SchemaRegistry::builtin(), &raw, None);
    if args.json {
        println!("{}", format_data(&classification, DataFormat::Json)?);
    } else {
        println!("{}", describe_classification(&classification));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// registry command
// ---------------------------------------------------------------------------

fn run_registry(args: RegistryArgs) -> Result<(), String> {
    let listing = format_registry(SchemaRegistry::builtin(), args.format)?;
    print!("{listing}");
    Ok(())
}
