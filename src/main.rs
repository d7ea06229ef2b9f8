use clap::{Parser, Subcommand};

mod cmd;
mod disposal;
mod ledger;
mod matching;
mod tax_year;
mod trade;
mod utils;

/// Calculate UK Capital Gains Tax disposals from broker trade ledgers
#[derive(Parser, Debug)]
#[command(name = "ukcgt", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Match trades into disposals under HMRC share identification rules
    Match(cmd::match_trades::MatchCommand),
    /// Report gains and losses for a UK tax year
    Report(cmd::report::ReportCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    match Cli::parse().command {
        Command::Match(cmd) => cmd.exec(),
        Command::Report(cmd) => cmd.exec(),
    }
}
