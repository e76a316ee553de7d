//! Command-line lexer: `phrasing <input_file> <output_file>`.
//!
//! Reads the input file, tokenizes it, and appends the token listing and symbol tables to the
//! output file. This is the program the web server runs as its external transformer.

use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context;
use phrasectl::lexer;

const USAGE: &str = "Usage: phrasing <input_file> <output_file>";

fn run(input: &Path, output: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(input).with_context(|| format!("Cannot open input file {}", input.display()))?;
    let source = String::from_utf8_lossy(&bytes);

    let report = lexer::report(&source);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output)
        .with_context(|| format!("Cannot open output file {}", output.display()))?;
    file.write_all(report.as_bytes())
        .with_context(|| format!("Cannot write output file {}", output.display()))?;

    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();

    let [input, output] = args.as_slice() else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    match run(input, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
