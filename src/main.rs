use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, ValueEnum};
use log::{error, info};

use profile_harness::config::{default_config_path, HarnessConfig, LogLevel};
use profile_harness::harness::{SimTestbed, SuiteReport, TestRunner};
use profile_harness::logging::{configure_logging, set_debug_flags, DebugFlags};
use profile_harness::suites::{suite_by_name, SUITE_NAMES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SuiteSelection {
    Aics,
    Hap,
    All,
}

impl SuiteSelection {
    fn names(self) -> Vec<&'static str> {
        match self {
            SuiteSelection::Aics => vec!["aics"],
            SuiteSelection::Hap => vec!["hap"],
            SuiteSelection::All => SUITE_NAMES.to_vec(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "profile-harness",
    about = "Bluetooth LE profile conformance harness (AICS, HAP)"
)]
struct Cli {
    /// Path to the JSON configuration; defaults to the user configuration directory.
    #[arg(long, env = "PROFILE_HARNESS_CONFIG")]
    config: Option<PathBuf>,

    /// Suite to run.
    #[arg(long, value_enum, default_value = "all")]
    suite: SuiteSelection,

    /// Print suite reports as JSON instead of a summary.
    #[arg(long)]
    json: bool,

    /// Override the configured log level (error, warn, info, debug, trace).
    #[arg(long)]
    log_level: Option<LogLevel>,
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let path = cli.config.unwrap_or_else(default_config_path);
    let config = HarnessConfig::load_from_path(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;

    let level = cli.log_level.unwrap_or(config.system.log_level);
    configure_logging(level, config.system.log_file.clone(), true).context("configuring logging")?;
    set_debug_flags(DebugFlags::from_categories(config.system.debug_categories.as_slice()));

    let mut reports: Vec<SuiteReport> = Vec::new();
    for name in cli.suite.names() {
        let suite = suite_by_name(name, &config.sequencer)
            .with_context(|| format!("building suite {}", name))?
            .ok_or_else(|| anyhow!("unknown suite {}", name))?;

        // Every class gets fresh devices on a fresh medium
        let testbed = Arc::new(SimTestbed::new(config.testbed.clone()));
        let mut runner = TestRunner::new(testbed);
        reports.push(runner.run(suite.as_ref()).await);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{}", report.summary());
            for test in &report.tests {
                match &test.message {
                    Some(message) => println!("  {:<45} {:?}: {}", test.name, test.outcome, message),
                    None => println!("  {:<45} {:?}", test.name, test.outcome),
                }
            }
        }
    }

    let success = reports.iter().all(SuiteReport::is_success);
    info!("Run {}", if success { "succeeded" } else { "failed" });
    Ok(success)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
