//! CWL Schema CLI
//!
//! Command-line interface for resolving CWL schema graphs and generating
//! TypeScript declarations.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use cwl_schema_ts::{
    lint, load_document_set, render_declaration, render_file_name, resolve_graph,
    GenerateOptions, ResolvedGraph, SetStatus, Severity,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cwl-schema-ts")]
#[command(about = "Resolve CWL schema graphs into TypeScript declarations")]
#[command(long_about = "Resolve CWL schema graphs into TypeScript declarations.

`$import` entries are skipped, not followed. Every node named in `extends`
must be defined in the documents read for the draft (see --file).")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one TypeScript module per record and enum
    Generate {
        /// Schema source: directory or base URL containing one folder per draft
        source: String,

        /// Output directory; files are written to <out>/<draft>/<Name>.ts
        #[arg(long)]
        out: PathBuf,

        /// Draft to process (repeatable, default: draft-3 and draft-4)
        #[arg(long = "draft")]
        drafts: Vec<String>,

        /// Schema document to read from each draft (repeatable)
        #[arg(long = "file")]
        files: Vec<String>,
    },

    /// Print the resolved declarations of one draft as JSON
    Resolve {
        /// Schema source: directory or base URL containing one folder per draft
        source: String,

        /// Draft to resolve
        #[arg(long)]
        draft: String,

        /// Schema document to read (repeatable)
        #[arg(long = "file")]
        files: Vec<String>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Check schema drafts for errors (unreadable documents, broken extends,
    /// unresolved specializations)
    Check {
        /// Schema source: directory or base URL containing one folder per draft
        source: String,

        /// Draft to check (repeatable)
        #[arg(long = "draft")]
        drafts: Vec<String>,

        /// Schema document to read from each draft (repeatable)
        #[arg(long = "file")]
        files: Vec<String>,

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
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            source,
            out,
            drafts,
            files,
        } => run_generate(
            &source,
            &out,
            &GenerateOptions::new().drafts(drafts).files(files),
        ),

        Commands::Resolve {
            source,
            draft,
            files,
            output,
            pretty,
        } => run_resolve(&source, &draft, files, output, pretty),

        Commands::Check {
            source,
            drafts,
            files,
            format,
            strict,
            quiet,
        } => run_check(
            &source,
            &GenerateOptions::new().drafts(drafts).files(files),
            &format,
            strict,
            quiet,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_generate(source: &str, out: &Path, options: &GenerateOptions) -> Result<(), u8> {
    let mut exit = 0u8;

    // Drafts are independent: a failure in one does not stop the others.
    for draft in &options.drafts {
        let code = match generate_draft(source, draft, out, options) {
            Ok(graph) if graph.is_complete() => 0,
            Ok(_) => 1,
            Err(code) => code,
        };
        exit = exit.max(code);
    }

    if exit == 0 {
        Ok(())
    } else {
        Err(exit)
    }
}

fn generate_draft(
    source: &str,
    draft: &str,
    out: &Path,
    options: &GenerateOptions,
) -> Result<ResolvedGraph, u8> {
    let descriptors = load_document_set(source, draft, &options.files).map_err(|e| {
        eprintln!("Error: {}: {}", draft, e);
        e.exit_code() as u8
    })?;

    let graph = resolve_graph(&descriptors).map_err(|e| {
        eprintln!("Error: {}: {}", draft, e);
        e.exit_code() as u8
    })?;

    let dir = out.join(draft);
    std::fs::create_dir_all(&dir).map_err(|e| {
        eprintln!("Error creating {}: {}", dir.display(), e);
        3u8
    })?;

    for decl in graph.declarations.values() {
        let path = dir.join(render_file_name(decl));
        std::fs::write(&path, render_declaration(decl)).map_err(|e| {
            eprintln!("Error writing to {}: {}", path.display(), e);
            3u8
        })?;
    }

    // Reported after the whole draft is written so output stays reproducible.
    for unresolved in &graph.diagnostics {
        eprintln!("Warning: {}: {}", draft, unresolved);
    }

    println!(
        "{}: wrote {} declarations to {}",
        draft,
        graph.declarations.len(),
        dir.display()
    );
    Ok(graph)
}

fn run_resolve(
    source: &str,
    draft: &str,
    files: Vec<String>,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let options = GenerateOptions::new().files(files);

    let descriptors = load_document_set(source, draft, &options.files).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let graph = resolve_graph(&descriptors).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let json_output = if pretty {
        serde_json::to_string_pretty(&graph)
    } else {
        serde_json::to_string(&graph)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
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

    for unresolved in &graph.diagnostics {
        eprintln!("Warning: {}", unresolved);
    }

    if graph.is_complete() {
        Ok(())
    } else {
        Err(1)
    }
}

fn run_check(
    source: &str,
    options: &GenerateOptions,
    format: &str,
    strict: bool,
    quiet: bool,
) -> Result<(), u8> {
    let result = lint(source, options, strict);

    if format == "json" {
        let json_output = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", json_output);
    } else {
        if !quiet {
            println!("Checking {} ...\n", source);
        }

        for set_result in &result.results {
            let status_icon = match set_result.status {
                SetStatus::Ok => "\x1b[32m✓\x1b[0m",
                SetStatus::Warning => "\x1b[33m⚠\x1b[0m",
                SetStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || set_result.status != SetStatus::Ok {
                println!("  {} {}", status_icon, set_result.draft);
            }

            for diag in &set_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color,
                        label,
                        diag.code,
                        diag.node.as_deref().unwrap_or("-"),
                        diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} drafts checked, all passed\x1b[0m",
                result.sets_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} drafts checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.sets_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
