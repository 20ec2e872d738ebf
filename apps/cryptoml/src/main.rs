mod commands;
mod infra;
mod obs;

use clap::{Parser, Subcommand};
use commands::Command;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cryptoml")]
#[command(about = "CryptoML dataset builder", version, arg_required_else_help = true)]
#[command(
    after_help = "Examples:\n  cryptoml build --config configs/btc.toml\n  cryptoml validate --config configs/btc.toml --strict\n  cryptoml select --config configs/btc.toml --support out/support.csv\n"
)]
struct Cli {
    /// Log filter used when CRYPTOML_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// Log output: text | json
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
    /// Serve Prometheus metrics on host:port.
    #[arg(long, global = true)]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Assemble features, metadata and targets and write the dataset artifacts.
    Build {
        #[arg(long)]
        config: PathBuf,
        /// Overrides `paths.out_dir`.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Report input data quality.
    Validate {
        #[arg(long)]
        config: PathBuf,
        #[arg(long, default_value_t = false)]
        strict: bool,
        /// Also write the JSON report to this path.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Apply a `feature,selected` support table to the dataset info record.
    Select {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        support: PathBuf,
        /// Overrides `selection.train_fraction`.
        #[arg(long)]
        fraction: Option<f64>,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = obs::init_tracing(&cli.log_level, &cli.log_format) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
    if let Err(err) = obs::init_metrics(cli.metrics_addr.as_deref()) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }

    let command = match cli.command {
        CliCommand::Build { config, out } => Command::Build { config, out },
        CliCommand::Validate {
            config,
            strict,
            out,
        } => Command::Validate {
            config,
            strict,
            out,
        },
        CliCommand::Select {
            config,
            support,
            fraction,
        } => Command::Select {
            config,
            support,
            fraction,
        },
    };

    if let Err(err) = commands::run(command) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
