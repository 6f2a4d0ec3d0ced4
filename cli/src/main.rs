use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use docmap_core::{MapError, Mapper, MapperOptions, RegistryBuilder, RegistrySpec, TypeRegistry};
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "docmap")]
#[command(about = "Map parsed JSON documents onto registered record types")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Map a JSON document onto a registered type
    Map {
        /// Input document file (defaults to stdin if not specified)
        input: Option<PathBuf>,

        /// Registry declaration file
        #[arg(short, long)]
        registry: PathBuf,

        /// Target type name
        #[arg(short, long)]
        r#type: String,

        /// Treat the input as a sequence and map each element
        #[arg(long)]
        array: bool,

        /// Fail when a document key has no matching field
        #[arg(long)]
        fail_on_undefined: bool,

        /// Fail when a required field is missing from the document
        #[arg(long)]
        fail_on_missing_required: bool,

        /// Output mapped JSON file (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Validate a registry declaration without mapping anything
    Check {
        /// Registry declaration file
        #[arg(short, long)]
        registry: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    Pretty,
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing - logs go to stderr so stdout stays clean for JSON
    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Map {
            input,
            registry,
            r#type,
            array,
            fail_on_undefined,
            fail_on_missing_required,
            output,
            format,
        } => {
            let registry = load_registry(&registry)?;
            let document = read_document(input.as_ref())?;

            let options = MapperOptions {
                fail_on_undefined_field: fail_on_undefined,
                fail_on_missing_required_field: fail_on_missing_required,
                ..MapperOptions::default()
            };
            let mapper = Mapper::with_options(registry, options);

            let mapped = if array {
                map_sequence(&mapper, &document, &r#type)
            } else {
                map_single(&mapper, &document, &r#type)
            }
            .map_err(|e| {
                // Structured error for tooling on stderr; human-readable
                // context goes through the anyhow chain.
                eprintln!("{}", e.to_json());
                anyhow::Error::from(e).context("Mapping failed")
            })?;

            write_json(&mapped, output.as_ref(), format)?;
        }
        Commands::Check { registry } => {
            let registry = load_registry(&registry)?;
            println!("ok: {} registered types", registry.len());
        }
    }

    Ok(())
}

fn map_single(mapper: &Mapper, document: &Value, type_name: &str) -> Result<Value, MapError> {
    let mapped = mapper.map_class(document, type_name)?;
    Ok(mapped.map(|i| i.to_value()).unwrap_or(Value::Null))
}

fn map_sequence(mapper: &Mapper, document: &Value, type_name: &str) -> Result<Value, MapError> {
    let mapped = mapper.map_class_array(document, type_name)?;
    Ok(mapped
        .map(|items| Value::Array(items.iter().map(|m| m.to_value()).collect()))
        .unwrap_or(Value::Null))
}

fn load_registry(path: &PathBuf) -> Result<TypeRegistry> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open registry file: {}", path.display()))?;
    let reader = BufReader::new(file);
    let spec: RegistrySpec = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse registry from: {}", path.display()))?;
    RegistryBuilder::from_spec(spec)
        .build()
        .map_err(|e| anyhow::Error::from(e).context("Invalid registry"))
}

fn read_document(path: Option<&PathBuf>) -> Result<Value> {
    if let Some(path) = path {
        let file = File::open(path)
            .with_context(|| format!("Failed to open input file: {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse document from: {}", path.display()))
    } else {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read document from stdin")?;
        serde_json::from_str(&buf).context("Failed to parse document from stdin")
    }
}

fn write_json<T: serde::Serialize>(
    val: &T,
    path: Option<&PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let mut writer: Box<dyn Write> = if let Some(p) = path {
        let file = File::create(p)
            .with_context(|| format!("Failed to create output file: {}", p.display()))?;
        Box::new(BufWriter::new(file))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };

    match format {
        OutputFormat::Pretty => {
            serde_json::to_writer_pretty(&mut writer, val).context("Failed to write JSON")?;
        }
        OutputFormat::Compact => {
            serde_json::to_writer(&mut writer, val).context("Failed to write JSON")?;
        }
    }

    // Ensure trailing newline
    writeln!(writer).context("Failed to write trailing newline")?;

    Ok(())
}
