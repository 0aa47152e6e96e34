// src/main.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use subc::{CompileOptions, compile};
use tracing_subscriber::EnvFilter;

/// Compiles SUB scripts into a register/stack IR.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Source file to compile.
    input: PathBuf,

    /// Where to write the output. Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// What to print once the pipeline reaches that stage.
    #[arg(long, value_enum, default_value_t = Emit::Ir)]
    emit: Emit,

    /// Give every string literal its own pool entry.
    #[arg(long)]
    no_dedupe_strings: bool,

    /// Name of the function that runs the top-level statements.
    #[arg(long, value_name = "NAME", default_value = "main")]
    entry: String,

    /// More logging: -v for debug, -vv for trace. RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    Tokens,
    Ast,
    Ir,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read input file {}", cli.input.display()))?;
    let source_name = cli.input.to_string_lossy();

    let options = CompileOptions {
        dedupe_strings: !cli.no_dedupe_strings,
        entry_point: cli.entry.clone(),
    };
    let compilation = compile(&source, &options);

    // Tokens and the tree are still worth showing next to front-end errors.
    let output = match cli.emit {
        Emit::Tokens => Some(
            compilation
                .tokens
                .iter()
                .map(|t| format!("{}:{} {:?}\n", t.line, t.column, t.kind))
                .collect::<String>(),
        ),
        Emit::Ast => Some(format!("{:#?}\n", compilation.program)),
        Emit::Ir => compilation.module.as_ref().map(|module| module.to_string()),
    };

    if !compilation.diagnostics.is_empty() {
        compilation.diagnostics.print(&source_name);
    }
    if let Some(text) = output {
        write_output(cli.output.as_deref(), &text)?;
    }

    if compilation.has_errors() {
        eprintln!(
            "Compilation failed with {} error(s).",
            compilation.diagnostics.error_count()
        );
        process::exit(1);
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create directory {}", parent.display()))?;
                }
            }
            fs::write(path, text).with_context(|| format!("failed to write output file {}", path.display()))
        }
        None => {
            print!("{text}");
            Ok(())
        }
    }
}
