//! Report command - gains and losses for a UK tax year

use crate::cmd::{load_ledger, InstrumentTypeArg};
use crate::disposal::Disposal;
use crate::matching;
use crate::tax_year::TaxYear;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ReportCommand {
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

    /// Tax year to report (e.g., 2025 for 2024/25)
    #[arg(short, long)]
    year: Option<i32>,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// Totals across the reported disposals, in the original sign convention:
/// costs and losses are negated into positive magnitudes for display
#[derive(Debug, Default, PartialEq, Eq)]
struct Totals {
    disposals: usize,
    proceeds: Decimal,
    costs: Decimal,
    gains: Decimal,
    losses: Decimal,
}

impl Totals {
    fn of(disposals: &[&Disposal]) -> Totals {
        Totals {
            disposals: disposals.len(),
            proceeds: disposals.iter().map(|d| d.proceeds()).sum(),
            costs: -disposals.iter().map(|d| d.costs()).sum::<Decimal>(),
            gains: disposals.iter().map(|d| d.gain()).sum(),
            losses: -disposals.iter().map(|d| d.loss()).sum::<Decimal>(),
        }
    }

    fn net(&self) -> Decimal {
        self.gains - self.losses
    }
}

/// Summary data for JSON output
#[derive(Debug, Serialize)]
struct TaxYearSummary {
    tax_year: String,
    number_of_disposals: usize,
    disposal_proceeds: String,
    costs: String,
    gains: String,
    losses: String,
    total_gains_losses: String,
}

impl TaxYearSummary {
    fn new(year: Option<TaxYear>, totals: &Totals) -> TaxYearSummary {
        TaxYearSummary {
            tax_year: year.map_or("All Years".to_string(), |y| y.display()),
            number_of_disposals: totals.disposals,
            disposal_proceeds: format!("{:.2}", totals.proceeds),
            costs: format!("{:.2}", totals.costs),
            gains: format!("{:.2}", totals.gains),
            losses: format!("{:.2}", totals.losses),
            total_gains_losses: format!("{:.2}", totals.net()),
        }
    }
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let mut ledger = load_ledger(&self.trades, &self.instrument_types)?;
        let disposals = matching::match_trades(&mut ledger)?;

        let year = self.year.map(TaxYear);
        let selected: Vec<&Disposal> = disposals
            .iter()
            .filter(|d| year.is_none_or(|y| TaxYear::from_date(d.disposal_trade.date()) == y))
            .collect();
        let totals = Totals::of(&selected);

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&TaxYearSummary::new(year, &totals))?
            );
        } else {
            self.print_report(year, &totals, &selected);
        }

        Ok(())
    }

    fn print_report(&self, year: Option<TaxYear>, totals: &Totals, disposals: &[&Disposal]) {
        match year {
            Some(y) => println!(
                "Tax Year: {} - {}",
                y.start_date().format("%-d %B %Y"),
                y.end_date().format("%-d %B %Y")
            ),
            None => println!("Tax Year: All Years"),
        }
        println!();
        println!("{:<22} {:>14}", "Number of Disposals", totals.disposals);
        println!(
            "{:<22} {:>14}",
            "Disposal Proceeds",
            format_gbp(totals.proceeds)
        );
        println!("{:<22} {:>14}", "Costs", format_gbp(totals.costs));
        println!("{:<22} {:>14}", "Gains", format_gbp(totals.gains));
        println!("{:<22} {:>14}", "Losses", format_gbp(totals.losses));
        println!(
            "{:<22} {:>14}",
            "Total Gains/Losses",
            format_gbp_signed(totals.net())
        );

        for disposal in disposals {
            println!();
            println!("{}", disposal);
        }
    }
}

fn format_gbp(amount: Decimal) -> String {
    format!("£{:.2}", amount)
}

fn format_gbp_signed(amount: Decimal) -> String {
    if amount < Decimal::ZERO {
        format!("-£{:.2}", amount.abs())
    } else {
        format!("£{:.2}", amount)
    }
}
