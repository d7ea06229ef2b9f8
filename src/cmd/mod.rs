pub mod match_trades;
pub mod report;

use crate::ledger::Ledger;
use crate::trade::InstrumentType;
use anyhow::Context;
use clap::ValueEnum;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InstrumentTypeArg {
    Stocks,
    Futures,
    Forex,
    EquityAndIndexOptions,
    Bonds,
}

impl From<InstrumentTypeArg> for InstrumentType {
    fn from(arg: InstrumentTypeArg) -> Self {
        match arg {
            InstrumentTypeArg::Stocks => InstrumentType::Stocks,
            InstrumentTypeArg::Futures => InstrumentType::Futures,
            InstrumentTypeArg::Forex => InstrumentType::Forex,
            InstrumentTypeArg::EquityAndIndexOptions => InstrumentType::EquityAndIndexOptions,
            InstrumentTypeArg::Bonds => InstrumentType::Bonds,
        }
    }
}

/// Read the trade ledger CSV, keeping only the selected instrument types
pub fn load_ledger(path: &Path, types: &[InstrumentTypeArg]) -> anyhow::Result<Ledger> {
    let types: Vec<InstrumentType> = types.iter().copied().map(Into::into).collect();
    let file = File::open(path)
        .with_context(|| format!("failed to open trades file {}", path.display()))?;
    Ledger::read_csv(BufReader::new(file), &types)
}
