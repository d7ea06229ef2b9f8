use crate::trade::{InstrumentType, Trade, TradeId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// A disposal event: the aggregated disposing trade paired with the ordered
/// acquisition fragments it was matched against.
///
/// Owns fragment copies of the trade data; immutable once created. The
/// disposing trade is whichever trade was iterated first, so a buy closing a
/// short position can be the disposing side.
#[derive(Debug, Clone)]
pub struct Disposal {
    pub disposal_trade: Trade,
    pub matching_trades: Vec<Trade>,
}

impl Disposal {
    pub fn new(disposal_trade: Trade, matching_trades: Vec<Trade>) -> Disposal {
        Disposal {
            disposal_trade,
            matching_trades,
        }
    }

    pub fn instrument_type(&self) -> InstrumentType {
        self.disposal_trade.instrument_type
    }

    /// GBP amount realised by the disposing trade
    pub fn proceeds(&self) -> Decimal {
        self.disposal_trade.notional_value_gbp
    }

    /// Signed GBP cost of the matched acquisitions plus the disposing
    /// trade's own commission.
    ///
    /// Futures and Forex convert every matching trade at the disposing
    /// trade's own FX rate; other types sum each matching trade's own
    /// GBP-converted fields.
    pub fn costs(&self) -> Decimal {
        let (notionals_gbp, fees_gbp) = if self.instrument_type().uses_disposal_fx() {
            let fx = self.disposal_trade.fx();
            if fx.is_zero() {
                (Decimal::ZERO, Decimal::ZERO)
            } else {
                let notionals: Decimal =
                    self.matching_trades.iter().map(|t| t.notional_value).sum();
                let fees: Decimal = self.matching_trades.iter().map(|t| t.commission).sum();
                (notionals / fx, fees / fx)
            }
        } else {
            (
                self.matching_trades
                    .iter()
                    .map(|t| t.notional_value_gbp)
                    .sum(),
                self.matching_trades.iter().map(|t| t.commission_gbp).sum(),
            )
        };

        notionals_gbp + fees_gbp + self.disposal_trade.commission_gbp
    }

    /// Net result when positive, otherwise zero
    pub fn gain(&self) -> Decimal {
        (self.proceeds() + self.costs()).max(Decimal::ZERO)
    }

    /// Net result when negative, otherwise zero
    pub fn loss(&self) -> Decimal {
        (self.proceeds() + self.costs()).min(Decimal::ZERO)
    }
}

impl fmt::Display for Disposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let disposal_table = render_trades(std::iter::once(&self.disposal_trade));
        let matching_table = render_trades(self.matching_trades.iter());

        writeln!(f, "Disposing {} trade:", self.instrument_type())?;
        writeln!(f, "{}", disposal_table)?;
        writeln!(f, "Matching trades:")?;
        writeln!(f, "{}", matching_table)?;

        let net = self.proceeds() + self.costs();
        let fx_note = if self.instrument_type().uses_disposal_fx() {
            "the FX rate on the disposal date"
        } else {
            "the FX rate on each trade date"
        };
        write!(f, "Gain/loss of {:.2} GBP, using {}.", net, fx_note)
    }
}

fn render_trades<'a, I>(trades: I) -> String
where
    I: Iterator<Item = &'a Trade>,
{
    let rows: Vec<TradeRow> = trades.map(TradeRow::from).collect();
    Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string()
}

#[derive(Debug, Tabled)]
struct TradeRow {
    #[tabled(rename = "ID")]
    id: TradeId,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Qty")]
    quantity: String,
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Currency")]
    currency: String,
    #[tabled(rename = "Notional")]
    notional: String,
    #[tabled(rename = "Notional GBP")]
    notional_gbp: String,
    #[tabled(rename = "Fees")]
    fees: String,
    #[tabled(rename = "Fees GBP")]
    fees_gbp: String,
    #[tabled(rename = "FX")]
    fx: String,
}

impl From<&Trade> for TradeRow {
    fn from(trade: &Trade) -> Self {
        TradeRow {
            id: trade.trade_id,
            date: trade.trade_date.format("%Y-%m-%d").to_string(),
            quantity: trade.quantity.normalize().to_string(),
            symbol: trade.symbol.clone(),
            currency: trade.currency.clone(),
            notional: format!("{:.2}", trade.notional_value),
            notional_gbp: format!("{:.2}", trade.notional_value_gbp),
            fees: format!("{:.2}", trade.commission),
            fees_gbp: format!("{:.2}", trade.commission_gbp),
            fx: format!("{:.4}", trade.fx()),
        }
    }
}

/// CSV record for matched disposal output
#[derive(Debug, Serialize, Deserialize)]
pub struct DisposalCsvRecord {
    pub date: String,
    pub symbol: String,
    pub instrument_type: String,
    pub quantity: String,
    pub proceeds_gbp: String,
    pub costs_gbp: String,
    pub gain_gbp: String,
    pub loss_gbp: String,
}

impl From<&Disposal> for DisposalCsvRecord {
    fn from(disposal: &Disposal) -> Self {
        DisposalCsvRecord {
            date: disposal.disposal_trade.date().format("%Y-%m-%d").to_string(),
            symbol: disposal.disposal_trade.symbol.clone(),
            instrument_type: disposal.instrument_type().to_string(),
            quantity: disposal.disposal_trade.quantity.normalize().to_string(),
            proceeds_gbp: disposal.proceeds().round_dp(2).to_string(),
            costs_gbp: disposal.costs().round_dp(2).to_string(),
            gain_gbp: disposal.gain().round_dp(2).to_string(),
            loss_gbp: disposal.loss().round_dp(2).to_string(),
        }
    }
}
