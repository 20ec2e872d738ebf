mod build;
mod common;
mod select;
mod validate;

use std::path::PathBuf;
use std::time::Instant;

pub enum Command {
    Build {
        config: PathBuf,
        out: Option<PathBuf>,
    },
    Validate {
        config: PathBuf,
        strict: bool,
        out: Option<PathBuf>,
    },
    Select {
        config: PathBuf,
        support: PathBuf,
        fraction: Option<f64>,
    },
}

pub fn run(command: Command) -> Result<(), String> {
    let start = Instant::now();
    let (name, result) = match command {
        Command::Build { config, out } => ("build", build::run_build(config, out)),
        Command::Validate {
            config,
            strict,
            out,
        } => ("validate", validate::run_validate(config, strict, out)),
        Command::Select {
            config,
            support,
            fraction,
        } => ("select", select::run_select(config, support, fraction)),
    };
    let total_ms = start.elapsed().as_millis();
    metrics::histogram!("cryptoml.cli.total_ms", "command" => name).record(total_ms as f64);
    if result.is_ok() {
        println!("cryptoml cli: {} total_ms={}", name, total_ms);
    }
    result
}
