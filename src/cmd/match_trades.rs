//! Match command - partition the trade ledger into disposals

use crate::cmd::{load_ledger, InstrumentTypeArg};
use crate::disposal::DisposalCsvRecord;
use crate::matching;
use crate::utils;
use anyhow::Context;
use clap::Args;
use std::fs::File;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct MatchCommand {
    /// CSV file containing the parsed trade ledger
    #[arg(short, long)]
    trades: PathBuf,

    /// Instrument types to include
    #[arg(
        short = 'i',
        long = "instrument-types",
        value_enum,
        value_delimiter = ',',
        default_values_t = [InstrumentTypeArg::Stocks]
    )]
    instrument_types: Vec<InstrumentTypeArg>,

    /// Where to write trades left unmatched after processing
    #[arg(short, long, default_value = "unmatched.csv")]
    unmatched: PathBuf,

    /// Optional CSV summary of the matched disposals
    #[arg(short, long)]
    matched: Option<PathBuf>,
}

impl MatchCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let mut ledger = load_ledger(&self.trades, &self.instrument_types)?;
        log::info!(
            "loaded {} trades from {}",
            ledger.len(),
            self.trades.display()
        );

        let disposals = matching::match_trades(&mut ledger)?;

        for disposal in &disposals {
            println!("{}", disposal);
            println!();
        }
        println!(
            "{} disposals, {} trades left unmatched",
            disposals.len(),
            ledger.unmatched().len()
        );

        let unmatched_file = File::create(&self.unmatched).with_context(|| {
            format!("failed to create unmatched file {}", self.unmatched.display())
        })?;
        ledger.write_unmatched_csv(unmatched_file)?;
        log::info!("wrote unmatched trades to {}", self.unmatched.display());

        if let Some(matched) = &self.matched {
            let records = disposals.iter().map(DisposalCsvRecord::from);
            let matched_file = File::create(matched)
                .with_context(|| format!("failed to create matched file {}", matched.display()))?;
            utils::write_csv(records, matched_file)?;
            log::info!("wrote matched disposals to {}", matched.display());
        }

        Ok(())
    }
}
