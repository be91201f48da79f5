//! Loudcheck - EBU R128 conformance harness
//!
//! Runs the standard battery against a loudness library and exits with
//! 0 (all passed), 1 (a vector failed), 2 (usage or configuration error)
//! or 3 (the library broke its contract).

use anyhow::Result;
use loudcheck::{
    cross_validate, report, BackendKind, HarnessConfig, Runner, Tolerance, EXIT_CONTRACT_VIOLATION,
    EXIT_SUCCESS, EXIT_USAGE,
};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Command-line overrides on top of the config file
#[derive(Debug, Default)]
struct Options {
    config: Option<PathBuf>,
    backend: Option<BackendKind>,
    filter: Option<String>,
    passes: Option<usize>,
    json: Option<PathBuf>,
    cross_validate: bool,
    list: bool,
}

fn main() {
    init_logging();

    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            EXIT_USAGE
        }
    };
    std::process::exit(code);
}

fn init_logging() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "loudcheck=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<i32> {
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--version" | "-v" => {
                println!("loudcheck {} (built {})", loudcheck::VERSION, loudcheck::BUILD_DATE);
                return Ok(EXIT_SUCCESS);
            }
            "--help" | "-h" => {
                print_help();
                return Ok(EXIT_SUCCESS);
            }
            "--list" | "-l" => options.list = true,
            "--cross-validate" => options.cross_validate = true,
            flag @ ("--backend" | "-b" | "--filter" | "-f" | "--passes" | "-n" | "--json"
            | "--config" | "-c") => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("Error: {} requires a value", flag);
                    return Ok(EXIT_USAGE);
                };
                match flag {
                    "--backend" | "-b" => options.backend = Some(value.parse()?),
                    "--filter" | "-f" => options.filter = Some(value.clone()),
                    "--passes" | "-n" => match value.parse() {
                        Ok(n) => options.passes = Some(n),
                        Err(_) => {
                            eprintln!("Error: Invalid pass count: {}", value);
                            return Ok(EXIT_USAGE);
                        }
                    },
                    "--json" => options.json = Some(PathBuf::from(value)),
                    _ => options.config = Some(PathBuf::from(value)),
                }
                i += 2;
                continue;
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                return Ok(EXIT_USAGE);
            }
        }
        i += 1;
    }

    let config = resolve_config(&options)?;
    execute(&config, &options)
}

/// Config file values with command-line flags applied on top
fn resolve_config(options: &Options) -> Result<HarnessConfig> {
    let mut config = match &options.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    if let Some(backend) = options.backend {
        config.backend = backend;
    }
    if let Some(filter) = &options.filter {
        config.filter = Some(filter.clone());
    }
    if let Some(passes) = options.passes {
        config.passes = passes;
    }
    if let Some(json) = &options.json {
        config.json_report = Some(json.clone());
    }
    config.validate()?;
    Ok(config)
}

fn execute(config: &HarnessConfig, options: &Options) -> Result<i32> {
    let backend = config.backend.make_backend()?;
    let mut runner =
        Runner::new(backend.as_ref()).with_relative_tolerance(config.relative_tolerance);
    if let Some(filter) = &config.filter {
        runner = runner.with_filter(filter);
    }

    if options.list {
        for vector in runner.vectors() {
            println!(
                "{:<34} {}ch {:>6} Hz  {}",
                vector.name, vector.channels, vector.sample_rate, vector.signal
            );
        }
        return Ok(EXIT_SUCCESS);
    }

    println!("Loudcheck v{} - EBU R128 conformance", loudcheck::VERSION);
    println!();

    let result = if options.cross_validate {
        let reference = BackendKind::Ebur128.make_backend()?;
        let candidate = BackendKind::LibEbur128.make_backend()?;
        info!(
            reference = reference.name(),
            candidate = candidate.name(),
            "Cross-validating backends"
        );
        cross_validate(
            reference.as_ref(),
            candidate.as_ref(),
            runner.vectors(),
            Tolerance::relative(config.relative_tolerance),
        )
    } else {
        runner.run_passes(config.passes)
    };

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            return Ok(EXIT_CONTRACT_VIOLATION);
        }
    };

    let code = report(&summary);
    if let Some(path) = &config.json_report {
        // The verdict exit code stands even when the report can't be written
        if let Err(e) = summary.write_json(path) {
            warn!(path = %path.display(), "Failed to write JSON report: {:#}", e);
            eprintln!("Warning: JSON report not written: {:#}", e);
        }
    }
    Ok(code)
}

fn print_help() {
    println!("Usage: loudcheck [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -b, --backend NAME    Library under test: ebur128 (default) or libebur128");
    println!("  -f, --filter TEXT     Only run vectors whose name contains TEXT");
    println!("  -n, --passes N        Run the battery N times and require identical results");
    println!("      --json PATH       Write a JSON run report");
    println!("  -c, --config PATH     Read settings from a JSON config file");
    println!("      --cross-validate  Compare libebur128 against ebur128 on every vector");
    println!("  -l, --list            List the vectors that would run");
    println!("  -v, --version         Show version");
    println!("  -h, --help            Show this help");
    println!();
    println!("Exit codes:");
    println!("  0  every vector passed");
    println!("  1  at least one vector failed");
    println!("  2  usage or configuration error");
    println!("  3  the library broke its contract (NaN reading or leaked meter)");
    println!();
    println!("Examples:");
    println!("  loudcheck --filter range");
    println!("  loudcheck --passes 3 --json report.json");
}
