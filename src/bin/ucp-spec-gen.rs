//! UCP Spec Generator CLI
//!
//! Command-line interface for generating, inspecting and linting UCP schemas.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use ucp_spec_gen::{
    build_registry, canonical_path, generate, lint, load_schema, validate_annotations,
    CatalogOptions, FileStatus, GenerateError, GenerateOptions, GenerateReport, Operation,
    Selector, Severity, Transform,
};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

#[derive(Parser)]
#[command(name = "ucp-spec-gen")]
#[command(about = "Generate per-operation UCP schemas and the embedded OpenRPC catalog")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the output tree from annotated source schemas
    Generate {
        /// Source directory
        #[arg(long, default_value = "source")]
        source: PathBuf,

        /// Output directory
        #[arg(long, default_value = "spec")]
        output: PathBuf,

        /// Keep existing files in the output directory
        #[arg(long)]
        no_clean: bool,

        /// Skip the embedded protocol OpenRPC catalog
        #[arg(long)]
        no_catalog: bool,

        /// Catalog entry document, relative to the source directory
        #[arg(long, conflicts_with = "no_catalog")]
        catalog_entry: Option<PathBuf>,

        /// Catalog output path, relative to the output directory
        #[arg(long, conflicts_with = "no_catalog")]
        catalog_output: Option<PathBuf>,

        /// Only print errors and the summary
        #[arg(long, short)]
        quiet: bool,
    },

    /// Print a single variant of one schema
    Transform {
        /// Schema file
        schema: PathBuf,

        /// Source root used to find annotated ref targets (default: schema's directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Transform for a request operation
        #[arg(long, conflicts_with = "response", requires = "op")]
        request: bool,

        /// Transform for responses
        #[arg(long, conflicts_with = "request", required_unless_present = "request")]
        response: bool,

        /// Request operation (create or update)
        #[arg(long, short)]
        op: Option<String>,

        /// Suffix appended to every title
        #[arg(long)]
        suffix: Option<String>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Lint schema files for errors (syntax, broken refs, invalid annotations)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Generate {
            source,
            output,
            no_clean,
            no_catalog,
            catalog_entry,
            catalog_output,
            quiet,
        } => {
            let catalog = (!no_catalog).then(|| {
                let mut catalog = CatalogOptions::default();
                if let Some(entry) = catalog_entry {
                    catalog = catalog.entry(entry);
                }
                if let Some(output) = catalog_output {
                    catalog = catalog.output(output);
                }
                catalog
            });
            let options = GenerateOptions::new(source, output)
                .clean(!no_clean)
                .catalog(catalog);
            run_generate(&options, quiet)
        }

        Commands::Transform {
            schema,
            root,
            request,
            response: _,
            op,
            suffix,
            output,
            pretty,
        } => run_transform(TransformArgs {
            schema,
            root,
            request,
            op,
            suffix,
            output,
            pretty,
        }),

        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Log to stderr. `-v` wins over `RUST_LOG`; otherwise `RUST_LOG` or warn.
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_generate(options: &GenerateOptions, quiet: bool) -> Result<(), u8> {
    let report = generate(options).map_err(|e| {
        eprintln!("{}Error: {}{}", RED, e, RESET);
        e.exit_code() as u8
    })?;

    print_report(&report, options, quiet);

    if report.is_ok() {
        Ok(())
    } else {
        Err(1)
    }
}

fn print_report(report: &GenerateReport, options: &GenerateOptions, quiet: bool) {
    if !quiet {
        println!(
            "{}Generating {} -> {}{}",
            CYAN,
            options.source_dir.display(),
            options.output_dir.display(),
            RESET
        );
        println!("  Found {} annotated schema(s)\n", report.annotated);
        for path in &report.generated {
            println!("{}✓{} {}", GREEN, RESET, path.display());
        }
        if let Some(stats) = report.catalog {
            println!(
                "\n  Catalog: {} entry method(s), {} extension method(s)",
                stats.entry_methods, stats.extension_methods
            );
        }
    }

    println!();
    if report.is_ok() {
        println!(
            "{}✅ Generated {} files.{}",
            GREEN,
            report.generated.len(),
            RESET
        );
        return;
    }

    println!("{}Errors:{}", RED, RESET);
    for err in &report.errors {
        match err {
            GenerateError::Annotation { file, errors } => {
                for e in errors {
                    println!("  {}✗{} {}: {}", RED, RESET, file.display(), e);
                }
            }
            other => println!("  {}✗{} {}", RED, RESET, other),
        }
    }
    println!(
        "\n{}🚨 Failed with {} errors.{}",
        RED,
        report.errors.len(),
        RESET
    );
}

struct TransformArgs {
    schema: PathBuf,
    root: Option<PathBuf>,
    request: bool,
    op: Option<String>,
    suffix: Option<String>,
    output: Option<PathBuf>,
    pretty: bool,
}

fn run_transform(args: TransformArgs) -> Result<(), u8> {
    let selector = if args.request {
        let op = args.op.as_deref().unwrap_or_default();
        let op = Operation::parse(op).ok_or_else(|| {
            eprintln!(
                "Error: unknown operation \"{}\": expected {}",
                op,
                Operation::names()
            );
            2u8
        })?;
        Selector::Request(op)
    } else {
        Selector::Response
    };

    let path = canonical_path(&args.schema);
    let root = match &args.root {
        Some(root) => canonical_path(root),
        None => path.parent().unwrap_or(Path::new("/")).to_path_buf(),
    };

    let document = load_schema(&path).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let errors = validate_annotations(&document);
    if !errors.is_empty() {
        eprintln!("Invalid annotations in {}:", args.schema.display());
        for e in errors {
            eprintln!("  {}", e);
        }
        return Err(2);
    }

    let registry = build_registry(&root);
    let suffix = args.suffix.unwrap_or_default();
    let resolved = Transform::new(selector, &path, &registry)
        .title_suffix(&suffix)
        .apply(document);

    let json_output = if args.pretty {
        serde_json::to_string_pretty(&resolved)
    } else {
        serde_json::to_string(&resolved)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);

    if format == "json" {
        let json = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", json);
    } else {
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => format!("{}✓{}", GREEN, RESET),
                FileStatus::Warning => format!("{}⚠{}", YELLOW, RESET),
                FileStatus::Error => format!("{}✗{}", RED, RESET),
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => (RED, "error"),
                    Severity::Warning => (YELLOW, "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]{}: {} - {}",
                        color, label, diag.code, RESET, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if result.failed == 0 {
            println!(
                "{}✓ {} files checked, all passed{}",
                GREEN, result.files_checked, RESET
            );
        } else {
            println!(
                "{}✗ {} files checked: {} passed, {} failed ({} errors, {} warnings){}",
                RED,
                result.files_checked,
                result.passed,
                result.failed,
                result.errors,
                result.warnings,
                RESET
            );
        }
    }

    if result.failed == 0 {
        Ok(())
    } else {
        Err(1)
    }
}
