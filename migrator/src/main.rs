//! Order Migrate CLI - Convert Magento order exports to Shopify imports
//!
//! # Main Commands
//!
//! ```bash
//! order-migrate migrate orders.csv            # 900 rows per chunk, extended schema
//! order-migrate migrate orders.csv unlimited  # a single CSV in the archive
//! order-migrate migrate orders.csv 500 --schema simple
//! order-migrate migrate orders.csv --report report.json
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! order-migrate parse orders.csv              # Just parse CSV to JSON
//! order-migrate schema show extended          # Print a built-in schema
//! order-migrate schema check my_schema.json   # Validate a schema file
//! ```

use clap::{ArgAction, Parser, Subcommand};
use order_migrate::logging::{init_logging, LogConfig};
use order_migrate::transform::pipeline::format_delimiter;
use order_migrate::{
    builtin, migrate_file, parse_file, MigrateOptions, MigrationSchema, RowLimit, SchemaSource,
    BUILTIN_NAMES,
};
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "order-migrate", version)]
#[command(about = "Convert Magento order exports into Shopify order import files", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full migration: CSV → expanded rows → zipped CSV chunks
    Migrate {
        /// Input order export CSV
        input: PathBuf,

        /// Rows per output file: a number, or "unlimited" (0 also means unlimited)
        #[arg(default_value = "900")]
        limit: RowLimit,

        /// Built-in schema to use
        #[arg(short, long, env = "ORDER_MIGRATE_SCHEMA", default_value = "extended")]
        schema: String,

        /// JSON schema file (overrides --schema)
        #[arg(long)]
        schema_file: Option<PathBuf>,

        /// Directory receiving the archive
        #[arg(short, long, env = "ORDER_MIGRATE_OUTPUT_DIR", default_value = ".")]
        output_dir: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,

        /// Write the migration report as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Parse a CSV file and output JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect mapping schemas
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
}

#[derive(Subcommand)]
enum SchemaAction {
    /// Print a built-in schema as JSON
    Show {
        /// Schema name (simple or extended)
        name: String,
    },

    /// Validate a schema JSON file
    Check {
        /// Schema JSON file
        file: PathBuf,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_config =
        LogConfig::from_verbosity(cli.verbose).with_ansi(std::io::stderr().is_terminal());
    if let Err(e) = init_logging(&log_config) {
        eprintln!("⚠️  Logging unavailable: {}", e);
    }

    let result = match cli.command {
        Commands::Migrate {
            input,
            limit,
            schema,
            schema_file,
            output_dir,
            delimiter,
            no_progress,
            report,
        } => {
            let schema = match schema_file {
                Some(path) => SchemaSource::File(path),
                None => SchemaSource::Builtin(schema),
            };
            let options = MigrateOptions {
                schema,
                row_limit: limit,
                output_dir,
                delimiter,
                show_progress: !no_progress,
            };
            cmd_migrate(&input, &options, report.as_deref())
        }

        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::Schema { action } => match action {
            SchemaAction::Show { name } => cmd_schema_show(&name),
            SchemaAction::Check { file } => cmd_schema_check(&file),
        },
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_migrate(input: &Path, options: &MigrateOptions, report_path: Option<&Path>) -> CliResult {
    eprintln!("📄 Processing: {}", input.display());
    match &options.schema {
        SchemaSource::Builtin(name) => eprintln!("   Schema: {}", name),
        SchemaSource::File(path) => eprintln!("   Schema file: {}", path.display()),
    }
    eprintln!("   Rows per file: {}", options.row_limit);

    let report = migrate_file(input, options)?;

    eprintln!("   Encoding: {}", report.csv_info.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(report.csv_info.delimiter));
    eprintln!("   Source rows: {}", report.csv_info.row_count);
    if report.csv_info.skipped > 0 {
        eprintln!("   ⚠️  Skipped unreadable records: {}", report.csv_info.skipped);
    }

    let stats = &report.stats;
    eprintln!("\n⚙️  Expanded: {} output rows", stats.output_rows());
    eprintln!("   Line items: {}", stats.line_items);
    eprintln!("   Fulfillment lines: {}", stats.fulfillment_lines);
    eprintln!("   Shipping lines: {}", stats.shipping_lines);
    eprintln!("   Transactions: {}", stats.transactions);

    eprintln!("\n📦 Archive: {}", report.archive.display());
    for chunk in &report.chunks {
        eprintln!("   {} ({} rows)", chunk.name, chunk.rows);
    }

    if let Some(path) = report_path {
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        eprintln!("📝 Report written to: {}", path.display());
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_parse(input: &Path, delimiter: Option<char>, output: Option<&Path>) -> CliResult {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = parse_file(input, delimiter)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(result.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    eprintln!("   Columns: {}", result.headers.join(", "));
    if result.skipped > 0 {
        eprintln!("   ⚠️  Skipped unreadable records: {}", result.skipped);
    }
    eprintln!("✅ Parsed {} records", result.rows.len());

    let json = serde_json::to_string_pretty(&result.rows)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_schema_show(name: &str) -> CliResult {
    let schema = builtin(name)?;
    println!("{}", schema.to_json()?);
    Ok(())
}

fn cmd_schema_check(file: &Path) -> CliResult {
    eprintln!("✔️  Checking schema: {}", file.display());

    let schema = MigrationSchema::from_file(file)?;

    eprintln!("   Name: {}", schema.name);
    eprintln!("   Rules: {}", schema.rules.len());
    eprintln!("   Source columns: {}", schema.source_columns().join(", "));
    eprintln!(
        "   Auxiliary lines: fulfillment={} shipping={} transaction={}",
        schema.fulfillment.is_some(),
        schema.shipping.is_some(),
        schema.transaction.is_some()
    );
    if BUILTIN_NAMES.contains(&schema.name.as_str()) {
        eprintln!("   ℹ️  Same name as a built-in schema");
    }
    eprintln!("✅ Schema is valid");
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> CliResult {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
