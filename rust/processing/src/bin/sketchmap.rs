// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI tool: score VR sketch meshes
//!
//! Usage:
//!   sketchmap <mesh.obj|dir>... [options]

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};
use sketchmap_processing::{
    collect_inputs, run_batch, ArtifactStore, Pipeline, PipelineConfig, SessionId,
};

struct Args {
    inputs: Vec<PathBuf>,
    output: PathBuf,
    config: Option<PathBuf>,
    threads: Option<usize>,
    rescore: bool,
    print_config: bool,
}

fn print_usage() {
    eprintln!("Usage: sketchmap <mesh.obj|dir>... [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --output <dir>     Artifact and score directory (default: sketchmap-out)");
    eprintln!("  --config <file>    JSON pipeline configuration");
    eprintln!("  --threads <n>      Sessions processed in parallel");
    eprintln!("  --rescore          Score again from artifacts already in --output;");
    eprintln!("                     inputs are session names such as adel_1");
    eprintln!("  --print-config     Print the effective configuration and exit");
}

fn parse_args() -> anyhow::Result<Option<Args>> {
    let mut args = Args {
        inputs: Vec::new(),
        output: PathBuf::from("sketchmap-out"),
        config: None,
        threads: None,
        rescore: false,
        print_config: false,
    };

    let mut it = env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--output" | "-o" => {
                args.output = it.next().context("--output needs a directory")?.into();
            }
            "--config" | "-c" => {
                args.config = Some(it.next().context("--config needs a file")?.into());
            }
            "--threads" | "-j" => {
                let value = it.next().context("--threads needs a number")?;
                args.threads = Some(value.parse().with_context(|| format!("invalid thread count {value:?}"))?);
            }
            "--rescore" => args.rescore = true,
            "--print-config" => args.print_config = true,
            other if other.starts_with('-') => bail!("unknown option {other}"),
            _ => args.inputs.push(PathBuf::from(arg)),
        }
    }
    Ok(Some(args))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,sketchmap_processing=debug".into()),
        )
        .init();

    let Some(args) = parse_args()? else {
        print_usage();
        return Ok(());
    };

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if args.threads.is_some() {
        config.worker_threads = args.threads;
    }
    config.validate().context("invalid configuration")?;

    if args.print_config {
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }
    if args.inputs.is_empty() {
        print_usage();
        bail!("no inputs given");
    }

    let store = ArtifactStore::new(&args.output)?;
    tracing::info!(
        output = %store.root().display(),
        worker_threads = config.worker_threads(),
        "Starting sketchmap"
    );

    if args.rescore {
        let pipeline = Pipeline::new(config.into(), store);
        let mut failed = 0;
        for name in &args.inputs {
            let session = SessionId::from_stem(&name.to_string_lossy())?;
            match pipeline.rescore_session(&session) {
                Ok(table) => println!("{}: {} records", session, table.len()),
                Err(_) => failed += 1,
            }
        }
        if failed > 0 {
            bail!("{failed} session(s) failed to rescore");
        }
        return Ok(());
    }

    let inputs = collect_inputs(&args.inputs).context("failed to list inputs")?;
    let report = run_batch(&inputs, &config, &store);

    println!(
        "{} of {} sessions scored, {} records, {} ms",
        report.completed.len(),
        report.total(),
        report.table.len(),
        report.elapsed_ms
    );
    for path in &report.tables {
        println!("  {}", path.display());
    }
    for err in &report.failed {
        eprintln!("  FAILED {err}");
    }
    if !report.is_success() {
        bail!("{} session(s) failed", report.failed.len());
    }
    Ok(())
}
