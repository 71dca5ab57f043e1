use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, bail};
use ariadne::{Report, Source};
use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use llvm_ops::asm::print_module;
use llvm_ops::catalog::Catalog;
use llvm_ops::check::{
    FileSpan, lowering_error_to_report, parse_error_to_report, verification_error_to_report,
    verify_module,
};
use llvm_ops::codegen::{RecordingHost, lower_functions_concurrently, lower_module};
use llvm_ops::parser::parse_module;
use llvm_ops::session::{Config, EmitKind, Session};

const DEFAULT_CONFIG: &str = "llvm-ops.toml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The textual module to read.
    input: PathBuf,

    /// Config file, `llvm-ops.toml` in the working directory if present.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// What to write to stdout.
    #[arg(short, long, value_enum, default_value_t = EmitKind::Asm)]
    emit: EmitKind,

    /// Only parse and verify.
    #[arg(long, default_value_t = false)]
    verify_only: bool,

    /// Number values instead of keeping source names.
    #[arg(long, default_value_t = false)]
    renumber: bool,

    /// Threads used to lower functions.
    #[arg(short, long)]
    jobs: Option<usize>,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None if PathBuf::from(DEFAULT_CONFIG).exists() => Config::load(DEFAULT_CONFIG.as_ref())?,
        None => Config::default(),
    };
    if args.renumber {
        config.printer.renumber = true;
    }
    if let Some(jobs) = args.jobs {
        config.lowering.jobs = jobs;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let start_time = Instant::now();
    let args = Args::parse();
    let config = load_config(&args)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // A broken catalog is a bug in this binary, surface it before any input.
    let catalog = Catalog::load()?;
    tracing::debug!("catalog has {} operations", catalog.len());

    let session = Session {
        input: args.input,
        emit: args.emit,
        verify_only: args.verify_only,
        config,
    };
    tracing::debug!("running with session: {:#?}", session);
    run(&session)?;

    tracing::debug!("done in {:?}", start_time.elapsed());
    Ok(())
}

fn eprint_report(
    report: Report<'static, FileSpan>,
    path: &str,
    source: &str,
) -> anyhow::Result<()> {
    report.eprint((path.to_string(), Source::from(source.to_string())))?;
    Ok(())
}

fn run(session: &Session) -> anyhow::Result<()> {
    let path = session.input.display().to_string();
    let source = std::fs::read_to_string(&session.input)
        .with_context(|| format!("failed to read {path}"))?;

    let module = match parse_module(&source) {
        Ok(module) => module,
        Err(error) => {
            eprint_report(parse_error_to_report(&path, &error), &path, &source)?;
            bail!("{path}: parse failed");
        }
    };
    let verified = match verify_module(&module) {
        Ok(verified) => verified,
        Err(error) => {
            eprint_report(verification_error_to_report(&path, &error), &path, &source)?;
            bail!("{path}: verification failed");
        }
    };
    if session.verify_only {
        eprintln!("{} {path}", "verified".green().bold());
        return Ok(());
    }

    match session.emit {
        EmitKind::Asm => print!("{}", print_module(&module, &session.config.printer)),
        EmitKind::Host if session.config.lowering.jobs > 1 => {
            let jobs = session.config.lowering.jobs;
            let mut failed = false;
            let lowered = lower_functions_concurrently(&verified, jobs, RecordingHost::new);
            for (name, lowered) in lowered {
                match lowered {
                    Ok(host) => match host.function(&name) {
                        Some(function) => print!("{}", host.listing(function)),
                        None => tracing::warn!("@{name} produced no function"),
                    },
                    Err(error) => {
                        failed = true;
                        eprint_report(lowering_error_to_report(&path, &error), &path, &source)?;
                    }
                }
            }
            if failed {
                bail!("{path}: lowering failed");
            }
        }
        EmitKind::Host | EmitKind::Mlir => {
            let mut host = RecordingHost::new();
            if let Err(error) = lower_module(&verified, &mut host) {
                eprint_report(lowering_error_to_report(&path, &error), &path, &source)?;
                bail!("{path}: lowering failed");
            }
            if session.emit == EmitKind::Host {
                print!("{host}");
            } else {
                emit_mlir(&host)?;
            }
        }
    }
    Ok(())
}

#[cfg(feature = "mlir")]
fn emit_mlir(host: &RecordingHost) -> anyhow::Result<()> {
    println!("{}", llvm_ops::codegen::mlir::to_mlir(host)?);
    Ok(())
}

#[cfg(not(feature = "mlir"))]
fn emit_mlir(_host: &RecordingHost) -> anyhow::Result<()> {
    bail!("--emit mlir needs llvm-ops built with the `mlir` feature")
}
