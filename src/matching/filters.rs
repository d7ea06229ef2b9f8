//! Candidate selection for each HMRC share identification rule.
//!
//! Each filter is a pure query over the current working ledger: given the
//! disposing trade it returns the ids of eligible counter-trades, in ledger
//! order (which is already sorted by date).

use crate::ledger::Ledger;
use crate::trade::{Trade, TradeId};
use chrono::Duration;
use rust_decimal::Decimal;

const BED_AND_BREAKFAST_WINDOW_DAYS: i64 = 30;

/// Opposite-sign trades of the same symbol on the same calendar day
pub fn same_day_trades(ledger: &Ledger, disposal: &Trade) -> Vec<TradeId> {
    candidates(ledger, disposal, |candidate| {
        candidate.date() == disposal.date()
    })
}

/// Opposite-sign trades of the same symbol within the 30 calendar days after
/// the disposal date
pub fn bed_and_breakfast_trades(ledger: &Ledger, disposal: &Trade) -> Vec<TradeId> {
    let window_end = disposal.date() + Duration::days(BED_AND_BREAKFAST_WINDOW_DAYS);
    candidates(ledger, disposal, |candidate| {
        candidate.date() > disposal.date() && candidate.date() <= window_end
    })
}

/// Opposite-sign trades of the same symbol strictly before the disposal
/// date. All qualifying rows are pooled before matching.
pub fn section_104_trades(ledger: &Ledger, disposal: &Trade) -> Vec<TradeId> {
    candidates(ledger, disposal, |candidate| {
        candidate.date() < disposal.date()
    })
}

fn candidates<F>(ledger: &Ledger, disposal: &Trade, date_matches: F) -> Vec<TradeId>
where
    F: Fn(&Trade) -> bool,
{
    ledger
        .iter()
        .filter(|&(_, candidate)| {
            candidate.symbol == disposal.symbol
                && !candidate.quantity.is_zero()
                && opposite_signs(candidate.quantity, disposal.quantity)
                && date_matches(candidate)
        })
        .map(|(id, _)| id)
        .collect()
}

fn opposite_signs(a: Decimal, b: Decimal) -> bool {
    (a > Decimal::ZERO) != (b > Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade::InstrumentType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn trade(id: TradeId, symbol: &str, day: u32, qty: Decimal) -> Trade {
        Trade {
            instrument_type: InstrumentType::Stocks,
            trade_id: id,
            symbol: symbol.to_string(),
            currency: "GBP".to_string(),
            trade_date: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
                + Duration::days(day as i64 - 1),
            quantity: qty,
            notional_value: -qty * dec!(10),
            commission: Decimal::ZERO,
            notional_value_gbp: -qty * dec!(10),
            commission_gbp: Decimal::ZERO,
            fx_rate: dec!(1),
        }
    }

    #[test]
    fn same_day_requires_equal_day_and_opposite_sign() {
        let sell = trade(0, "VOD", 5, dec!(-100));
        let ledger = Ledger::from_trades(vec![
            sell.clone(),
            trade(1, "VOD", 5, dec!(50)),   // match
            trade(2, "VOD", 6, dec!(50)),   // wrong day
            trade(3, "BP", 5, dec!(50)),    // wrong symbol
            trade(4, "VOD", 5, dec!(-50)),  // same sign
        ]);

        assert_eq!(same_day_trades(&ledger, &sell), vec![1]);
    }

    #[test]
    fn bed_and_breakfast_window_is_thirty_days_inclusive() {
        let sell = trade(0, "VOD", 1, dec!(-100));
        let ledger = Ledger::from_trades(vec![
            sell.clone(),
            trade(1, "VOD", 1, dec!(10)),  // same day, not b&b
            trade(2, "VOD", 2, dec!(10)),  // first day in window
            trade(3, "VOD", 31, dec!(10)), // last day in window
            trade(4, "VOD", 32, dec!(10)), // outside window
        ]);

        assert_eq!(bed_and_breakfast_trades(&ledger, &sell), vec![2, 3]);
    }

    #[test]
    fn section_104_takes_strictly_earlier_trades() {
        let sell = trade(3, "VOD", 10, dec!(-100));
        let ledger = Ledger::from_trades(vec![
            trade(0, "VOD", 1, dec!(30)),
            trade(1, "VOD", 5, dec!(20)),
            trade(2, "VOD", 10, dec!(10)), // same day, excluded
            sell.clone(),
        ]);

        assert_eq!(section_104_trades(&ledger, &sell), vec![0, 1]);
    }

    #[test]
    fn consumed_rows_are_not_candidates() {
        let sell = trade(0, "VOD", 5, dec!(-100));
        let ledger = Ledger::from_trades(vec![
            sell.clone(),
            trade(1, "VOD", 5, dec!(0)),
            trade(2, "VOD", 5, dec!(25)),
        ]);

        assert_eq!(same_day_trades(&ledger, &sell), vec![2]);
    }

    #[test]
    fn candidates_come_back_in_date_order() {
        let sell = trade(9, "VOD", 40, dec!(-100));
        let ledger = Ledger::from_trades(vec![
            sell.clone(),
            trade(4, "VOD", 20, dec!(10)),
            trade(2, "VOD", 10, dec!(10)),
            trade(7, "VOD", 30, dec!(10)),
        ]);

        assert_eq!(section_104_trades(&ledger, &sell), vec![2, 4, 7]);
    }
}
