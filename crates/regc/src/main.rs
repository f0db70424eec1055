//! regc - semantic checker for region/permission programs
//!
//! Usage: regc [OPTIONS] <input>

use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser as ClapParser;
use regc::common::DiagnosticReporter;
use regc::driver::{check_source, Config};
use regc::sema::Pass;

#[derive(ClapParser, Debug)]
#[command(name = "regc")]
#[command(version)]
#[command(about = "Name resolution, type and permission checking for region/permission programs", long_about = None)]
struct Args {
    /// Input source file
    #[arg(required = true)]
    input: PathBuf,

    /// Verbose output (also enables analyzer tracing)
    #[arg(short, long)]
    verbose: bool,

    /// Dump tokens (for debugging)
    #[arg(long)]
    dump_tokens: bool,

    /// Dump analyzed top-level declarations (for debugging)
    #[arg(long)]
    dump_ir: bool,

    /// Stop after this pass: global, resolve, typecheck or flow
    #[arg(long, value_parser = parse_pass)]
    stop_after: Option<Pass>,
}

fn parse_pass(name: &str) -> Result<Pass, String> {
    Pass::from_name(name).ok_or_else(|| {
        let names: Vec<_> = Pass::ALL.iter().map(|p| p.name()).collect();
        format!("unknown pass `{}` (expected one of: {})", name, names.join(", "))
    })
}

fn main() {
    let args = Args::parse();

    match run(&args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Returns whether the input checked clean
fn run(args: &Args) -> anyhow::Result<bool> {
    if args.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    }

    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("cannot read {}", args.input.display()))?;
    let filename = args.input.display().to_string();

    let mut reporter = DiagnosticReporter::new();
    let file_id = reporter.add_file(&filename, &source);

    if args.verbose {
        eprintln!("Checking {}", filename);
    }

    let config = Config {
        dump_tokens: args.dump_tokens,
        dump_ir: args.dump_ir,
        verbose: args.verbose,
        stop_after: args.stop_after,
    };

    let analysis = match check_source(&source, &config) {
        Ok(analysis) => analysis,
        Err(err) => {
            reporter.report_error(file_id, &err);
            return Ok(false);
        }
    };

    reporter.report_diagnostics(file_id, analysis.diagnostics.as_slice());

    if analysis.has_errors() {
        eprintln!("{} error(s) in {}", analysis.diagnostics.len(), filename);
        return Ok(false);
    }
    if args.verbose {
        eprintln!("{}: no errors", filename);
    }
    Ok(true)
}
