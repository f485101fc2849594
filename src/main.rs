use clap::{Args, Parser, Subcommand};
use custody::harness::{Harness, HarnessError, Transcript, CALIBRATION_SCRIPT};
use custody::{telemetry, BankConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "bank", version, about = "Drive a custodial ledger from scripts")]
struct Cli {
    #[command(flatten)]
    options: Options,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Options {
    /// Decimal places of the major unit
    #[arg(long, global = true, default_value_t = custody::units::DEFAULT_DECIMALS)]
    decimals: u8,

    /// Symbol printed after amounts
    #[arg(long, global = true, default_value = "ETH")]
    symbol: String,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the built-in two-account scenario
    Demo,
    /// Run a script file
    Run {
        /// Path to the script
        script: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = BankConfig::new()
        .with_decimals(cli.options.decimals)
        .with_symbol(&cli.options.symbol)
        .with_log_filter(&cli.options.log);

    telemetry::init(&config.log_filter);

    match run(config, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "run failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: BankConfig, command: Command) -> Result<(), HarnessError> {
    let mut harness = Harness::new(config)?;

    let transcript = match command {
        Command::Demo => harness.run_script(CALIBRATION_SCRIPT)?,
        Command::Run { script } => harness.run_file(&script)?,
    };

    report(&harness, &transcript);
    Ok(())
}

fn report(harness: &Harness, transcript: &Transcript) {
    for (name, account) in harness.signers() {
        println!("{:<8} {}", name, account);
    }
    println!();
    print!("{}", harness.render(transcript));

    let stats = harness.ledger().statistics();
    println!();
    println!(
        "pool {} across {} accounts ({} journal entries)",
        harness.display_amount(stats.pool),
        stats.accounts,
        stats.journal_entries
    );
}
