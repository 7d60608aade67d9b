//! The Sable transpiler CLI.
//!
//! - `sablec transpile <file>` - Lower a `.sable` file to host source
//! - `sablec check <file>` - Report diagnostics without writing output
//!
//! Configuration is read from `sable.toml` next to the input unless
//! `--config` names another file.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use sablec::diagnostics::{render_diagnostic, render_error, to_json};
use sablec::{compile_source, CompileError, Compiled, SableConfig};

#[derive(Parser)]
#[command(name = "sablec", version, about = "The Sable transpiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lower a Sable file to host source
    Transpile {
        /// Input file
        input: PathBuf,

        /// Output path (default: the input with a `.go` extension, `-` for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file (default: sable.toml next to the input)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output diagnostics as JSON (one object per line)
        #[arg(long)]
        json: bool,
    },
    /// Report diagnostics without writing output
    Check {
        /// Input file
        input: PathBuf,

        /// Configuration file (default: sable.toml next to the input)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output diagnostics as JSON (one object per line)
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    sablec::init_tracing();
    let cli = Cli::parse();

    let (input, output, config, json) = match cli.command {
        Commands::Transpile {
            input,
            output,
            config,
            json,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension("go"));
            (input, Some(output), config, json)
        }
        Commands::Check { input, config, json } => (input, None, config, json),
    };

    match run(&input, output.as_deref(), config.as_deref(), json) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(message) => {
            eprint!("{message}");
            process::exit(1);
        }
    }
}

/// Lower `input`; `Ok(false)` when an error diagnostic was reported.
fn run(input: &Path, output: Option<&Path>, config: Option<&Path>, json: bool) -> Result<bool, String> {
    let source = std::fs::read_to_string(input).map_err(|source| {
        CompileError::Io {
            path: input.to_path_buf(),
            source,
        }
        .to_string()
            + "\n"
    })?;
    let config = match config {
        Some(path) => SableConfig::from_file(path),
        None => SableConfig::discover(input.parent().unwrap_or(Path::new("."))),
    }
    .map_err(|err| format!("error: {err}\n"))?;

    let compiled = compile_source(&source, &config).map_err(|err| {
        if json {
            serde_json::json!({
                "severity": "error",
                "message": err.to_string(),
                "file": input.display().to_string(),
            })
            .to_string()
                + "\n"
        } else {
            render_error(&err, &source)
        }
    })?;
    report(&compiled, input, &source, json);
    if compiled.has_errors() {
        return Ok(false);
    }

    match output {
        Some(path) if path == Path::new("-") => print!("{}", compiled.code),
        Some(path) => std::fs::write(path, &compiled.code).map_err(|source| {
            CompileError::Io {
                path: path.to_path_buf(),
                source,
            }
            .to_string()
                + "\n"
        })?,
        None => {}
    }
    Ok(true)
}

fn report(compiled: &Compiled, input: &Path, source: &str, json: bool) {
    let file = input.display().to_string();
    for diagnostic in &compiled.diagnostics {
        if json {
            eprintln!("{}", to_json(diagnostic, &file));
        } else {
            eprint!("{}", render_diagnostic(diagnostic, source));
        }
    }
}
