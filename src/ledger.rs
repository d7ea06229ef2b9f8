use crate::trade::{InstrumentType, Trade, TradeId};
use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("instrument type {0} is not supported")]
    UnsupportedInstrumentType(InstrumentType),
}

/// CSV row format shared with the statement parsing collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    #[serde(rename = "Instrument Type")]
    pub instrument_type: InstrumentType,
    #[serde(rename = "Currency")]
    pub currency: String,
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Date/Time")]
    pub date_time: String,
    #[serde(rename = "Quantity")]
    pub quantity: Decimal,
    #[serde(rename = "Notional Value")]
    pub notional_value: Decimal,
    #[serde(rename = "Comm/Fee")]
    pub commission: Decimal,
    #[serde(rename = "Notional Value GBP")]
    pub notional_value_gbp: Decimal,
    #[serde(rename = "Comm in GBP")]
    pub commission_gbp: Decimal,
    #[serde(rename = "FX Rate", default)]
    pub fx_rate: Decimal,
}

impl TradeRecord {
    fn into_trade(self, trade_id: TradeId) -> anyhow::Result<Trade> {
        let trade_date = parse_datetime(&self.date_time).with_context(|| {
            format!("invalid Date/Time '{}' in row {}", self.date_time, trade_id)
        })?;

        Ok(Trade {
            instrument_type: self.instrument_type,
            trade_id,
            symbol: self.symbol,
            currency: self.currency,
            trade_date,
            quantity: self.quantity,
            notional_value: self.notional_value,
            commission: self.commission,
            notional_value_gbp: self.notional_value_gbp,
            commission_gbp: self.commission_gbp,
            fx_rate: self.fx_rate,
        })
    }

    pub fn from_trade(trade: &Trade) -> TradeRecord {
        TradeRecord {
            instrument_type: trade.instrument_type,
            currency: trade.currency.clone(),
            symbol: trade.symbol.clone(),
            date_time: trade.trade_date.format("%Y-%m-%d, %H:%M:%S").to_string(),
            quantity: trade.quantity,
            notional_value: trade.notional_value,
            commission: trade.commission,
            notional_value_gbp: trade.notional_value_gbp,
            commission_gbp: trade.commission_gbp,
            fx_rate: trade.fx_rate,
        }
    }
}

/// Parse a Date/Time value that may carry a time component or be date-only
fn parse_datetime(s: &str) -> anyhow::Result<NaiveDateTime> {
    for format in ["%Y-%m-%d, %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).expect("midnight is always valid"));
    }
    anyhow::bail!("unrecognised date/time format: {}", s)
}

/// Mutable working set of trades for one matching run.
///
/// Rows are keyed by the stable id assigned at load time; iteration order is
/// (symbol, trade date) ascending and never changes. Matching reduces row
/// quantities in place (or collapses pool rows away) and a row whose quantity
/// has reached zero is permanently consumed.
#[derive(Debug)]
pub struct Ledger {
    rows: BTreeMap<TradeId, Trade>,
    order: Vec<TradeId>,
}

impl Ledger {
    /// Read a trade ledger from CSV, keeping only the requested instrument
    /// types. Fails before reading anything if an unsupported type is
    /// requested.
    pub fn read_csv<R: Read>(
        reader: R,
        instrument_types: &[InstrumentType],
    ) -> anyhow::Result<Ledger> {
        validate_instrument_types(instrument_types)?;

        let mut rdr = csv::Reader::from_reader(reader);
        let mut rows = BTreeMap::new();

        for (id, result) in rdr.deserialize::<TradeRecord>().enumerate() {
            let record = result.with_context(|| format!("invalid trade in row {}", id))?;
            if !instrument_types.contains(&record.instrument_type) {
                continue;
            }
            rows.insert(id, record.into_trade(id)?);
        }

        let order = sorted_order(&rows);
        Ok(Ledger { rows, order })
    }

    /// Build a ledger from already-constructed trades, keyed by their ids
    pub fn from_trades(trades: Vec<Trade>) -> Ledger {
        let rows: BTreeMap<TradeId, Trade> =
            trades.into_iter().map(|t| (t.trade_id, t)).collect();
        let order = sorted_order(&rows);
        Ledger { rows, order }
    }

    /// The (symbol, date)-sorted iteration order, captured at load time.
    /// Ids of rows later removed by pool collapsing remain in the list.
    pub fn ids(&self) -> Vec<TradeId> {
        self.order.clone()
    }

    pub fn get(&self, id: TradeId) -> Option<&Trade> {
        self.rows.get(&id)
    }

    pub fn get_mut(&mut self, id: TradeId) -> Option<&mut Trade> {
        self.rows.get_mut(&id)
    }

    pub fn remove(&mut self, id: TradeId) -> Option<Trade> {
        self.rows.remove(&id)
    }

    /// Current rows in ledger order
    pub fn iter(&self) -> impl Iterator<Item = (TradeId, &Trade)> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.rows.get(id).map(|t| (*id, t)))
    }

    /// Rows with residual quantity after matching, in ledger order
    pub fn unmatched(&self) -> Vec<&Trade> {
        self.iter()
            .map(|(_, t)| t)
            .filter(|t| !t.quantity.is_zero())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Write the unmatched residual rows for audit and carry-forward
    pub fn write_unmatched_csv<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        let records = self.unmatched().into_iter().map(TradeRecord::from_trade);
        crate::utils::write_csv(records, writer)
    }
}

fn sorted_order(rows: &BTreeMap<TradeId, Trade>) -> Vec<TradeId> {
    // map keys ascend in input-row order, so the stable sort keeps input
    // order for (symbol, date) ties
    let mut order: Vec<TradeId> = rows.keys().copied().collect();
    order.sort_by(|a, b| {
        let (ta, tb) = (&rows[a], &rows[b]);
        ta.symbol
            .cmp(&tb.symbol)
            .then(ta.trade_date.cmp(&tb.trade_date))
    });
    order
}

pub fn validate_instrument_types(types: &[InstrumentType]) -> Result<(), ConfigError> {
    for instrument_type in types {
        if matches!(instrument_type, InstrumentType::Bonds) {
            return Err(ConfigError::UnsupportedInstrumentType(*instrument_type));
        }
    }
    Ok(())
}
