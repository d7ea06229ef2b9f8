use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Stable row id of a trade in the working ledger
pub type TradeId = usize;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TradeError {
    #[error("cannot add trades with different symbols: {0} and {1}")]
    SymbolMismatch(String, String),
}

/// Instrument section of a broker statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstrumentType {
    Stocks,
    Futures,
    Forex,
    #[serde(rename = "Equity and Index Options")]
    EquityAndIndexOptions,
    /// Parsed from statements but not supported for matching
    Bonds,
}

impl InstrumentType {
    /// Derivative types convert matched costs with the disposal trade's own FX
    /// rate rather than each matching trade's rate
    pub fn uses_disposal_fx(&self) -> bool {
        matches!(self, InstrumentType::Futures | InstrumentType::Forex)
    }
}

impl std::fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            InstrumentType::Stocks => "Stocks",
            InstrumentType::Futures => "Futures",
            InstrumentType::Forex => "Forex",
            InstrumentType::EquityAndIndexOptions => "Equity and Index Options",
            InstrumentType::Bonds => "Bonds",
        };
        write!(f, "{}", label)
    }
}

/// One (possibly partial) trade of an instrument.
///
/// Quantity is signed: positive buys, negative sells. Monetary fields carry
/// the statement's cash-flow signs and scale linearly with quantity whenever
/// a trade is split, so a fragment is always `original * (fragment_qty /
/// original_qty)` in every monetary field.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub instrument_type: InstrumentType,
    pub trade_id: TradeId,
    pub symbol: String,
    pub currency: String,
    pub trade_date: NaiveDateTime,
    pub quantity: Decimal,
    pub notional_value: Decimal,
    pub commission: Decimal,
    pub notional_value_gbp: Decimal,
    pub commission_gbp: Decimal,
    /// Rate reported by the statement; recomputed when trades are combined
    pub fx_rate: Decimal,
}

impl Trade {
    /// Local currency units per GBP implied by the notional amounts
    pub fn fx(&self) -> Decimal {
        if self.notional_value_gbp.is_zero() {
            Decimal::ZERO
        } else {
            self.notional_value / self.notional_value_gbp
        }
    }

    /// The calendar day of the trade; matching ignores the time component
    pub fn date(&self) -> NaiveDate {
        self.trade_date.date()
    }

    /// Sum two fragments of the same symbol, keeping self's identity fields
    pub fn try_add(&self, other: &Trade) -> Result<Trade, TradeError> {
        if self.symbol != other.symbol {
            return Err(TradeError::SymbolMismatch(
                self.symbol.clone(),
                other.symbol.clone(),
            ));
        }

        let notional_value = self.notional_value + other.notional_value;
        let notional_value_gbp = self.notional_value_gbp + other.notional_value_gbp;

        Ok(Trade {
            instrument_type: self.instrument_type,
            trade_id: self.trade_id,
            symbol: self.symbol.clone(),
            currency: self.currency.clone(),
            trade_date: self.trade_date,
            quantity: self.quantity + other.quantity,
            notional_value,
            commission: self.commission + other.commission,
            notional_value_gbp,
            commission_gbp: self.commission_gbp + other.commission_gbp,
            fx_rate: implied_rate(notional_value_gbp, notional_value),
        })
    }

    /// Fragment covering `matched_qty` units of this trade, monetary fields
    /// scaled pro rata and quantity carrying this trade's sign.
    ///
    /// Caller must ensure the remaining quantity is nonzero.
    pub fn fragment(&self, matched_qty: Decimal) -> Trade {
        let scale = matched_qty / self.quantity.abs();
        Trade {
            quantity: with_sign_of(matched_qty, self.quantity),
            notional_value: self.notional_value * scale,
            commission: self.commission * scale,
            notional_value_gbp: self.notional_value_gbp * scale,
            commission_gbp: self.commission_gbp * scale,
            ..self.clone()
        }
    }

    /// Reduce the remaining quantity by `matched_qty` units and rescale the
    /// remaining monetary fields to the new balance
    pub fn reduce(&mut self, matched_qty: Decimal) {
        let original = self.quantity;
        let remaining = original - with_sign_of(matched_qty, original);
        let scale = if original.is_zero() {
            Decimal::ZERO
        } else {
            remaining / original
        };

        self.quantity = remaining;
        self.notional_value *= scale;
        self.commission *= scale;
        self.notional_value_gbp *= scale;
        self.commission_gbp *= scale;
    }
}

/// GBP per local currency unit, zero when the notional is zero
pub fn implied_rate(notional_value_gbp: Decimal, notional_value: Decimal) -> Decimal {
    if notional_value.is_zero() {
        Decimal::ZERO
    } else {
        notional_value_gbp / notional_value
    }
}

fn with_sign_of(magnitude: Decimal, like: Decimal) -> Decimal {
    if like < Decimal::ZERO {
        -magnitude
    } else {
        magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn trade(symbol: &str, qty: Decimal, notional: Decimal, notional_gbp: Decimal) -> Trade {
        Trade {
            instrument_type: InstrumentType::Stocks,
            trade_id: 0,
            symbol: symbol.to_string(),
            currency: "USD".to_string(),
            trade_date: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
            quantity: qty,
            notional_value: notional,
            commission: dec!(-2),
            notional_value_gbp: notional_gbp,
            commission_gbp: dec!(-1.6),
            fx_rate: dec!(0.8),
        }
    }

    #[test]
    fn fx_derived_from_notionals() {
        let t = trade("AAPL", dec!(100), dec!(-18000), dec!(-14400));
        assert_eq!(t.fx(), dec!(1.25));
    }

    #[test]
    fn fx_zero_when_gbp_notional_zero() {
        let t = trade("AAPL", dec!(100), dec!(-18000), dec!(0));
        assert_eq!(t.fx(), Decimal::ZERO);
    }

    #[test]
    fn add_sums_quantity_and_monetary_fields() {
        let a = trade("AAPL", dec!(100), dec!(-18000), dec!(-14400));
        let mut b = trade("AAPL", dec!(50), dec!(-9500), dec!(-7600));
        b.trade_id = 7;
        b.currency = "EUR".to_string();

        let sum = a.try_add(&b).unwrap();
        assert_eq!(sum.quantity, dec!(150));
        assert_eq!(sum.notional_value, dec!(-27500));
        assert_eq!(sum.notional_value_gbp, dec!(-22000));
        assert_eq!(sum.commission, dec!(-4));
        assert_eq!(sum.commission_gbp, dec!(-3.2));

        // identity fields come from the left operand
        assert_eq!(sum.trade_id, 0);
        assert_eq!(sum.currency, "USD");
        assert_eq!(sum.trade_date, a.trade_date);
    }

    #[test]
    fn add_rejects_symbol_mismatch() {
        let a = trade("AAPL", dec!(100), dec!(-18000), dec!(-14400));
        let b = trade("MSFT", dec!(50), dec!(-9500), dec!(-7600));

        assert_eq!(
            a.try_add(&b),
            Err(TradeError::SymbolMismatch(
                "AAPL".to_string(),
                "MSFT".to_string()
            ))
        );
    }

    #[test]
    fn fragment_scales_monetary_fields() {
        let t = trade("AAPL", dec!(-100), dec!(18000), dec!(14400));
        let fragment = t.fragment(dec!(25));

        assert_eq!(fragment.quantity, dec!(-25));
        assert_eq!(fragment.notional_value, dec!(4500));
        assert_eq!(fragment.notional_value_gbp, dec!(3600));
        assert_eq!(fragment.commission, dec!(-0.5));
        assert_eq!(fragment.commission_gbp, dec!(-0.4));
        assert_eq!(fragment.symbol, "AAPL");
    }

    #[test]
    fn reduce_rescales_remaining_balance() {
        let mut t = trade("AAPL", dec!(100), dec!(-18000), dec!(-14400));
        t.reduce(dec!(40));

        assert_eq!(t.quantity, dec!(60));
        assert_eq!(t.notional_value, dec!(-10800));
        assert_eq!(t.notional_value_gbp, dec!(-8640));
        assert_eq!(t.commission, dec!(-1.2));
        assert_eq!(t.commission_gbp, dec!(-0.96));
    }

    #[test]
    fn fragment_plus_remainder_conserves_original() {
        let original = trade("AAPL", dec!(100), dec!(-18000), dec!(-14400));

        let mut remainder = original.clone();
        let fragment = remainder.fragment(dec!(30));
        remainder.reduce(dec!(30));

        let rejoined = fragment.try_add(&remainder).unwrap();
        assert_eq!(rejoined.quantity, original.quantity);
        assert_eq!(rejoined.notional_value, original.notional_value);
        assert_eq!(rejoined.notional_value_gbp, original.notional_value_gbp);
        assert_eq!(rejoined.commission, original.commission);
        assert_eq!(rejoined.commission_gbp, original.commission_gbp);
    }

    #[test]
    fn implied_rate_guards_zero_notional() {
        assert_eq!(implied_rate(dec!(100), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(implied_rate(dec!(80), dec!(100)), dec!(0.8));
    }
}
