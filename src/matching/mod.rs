//! The trade-matching engine.
//!
//! Walks the working ledger in its captured (symbol, date) order and, for
//! each trade still carrying quantity, applies the HMRC share identification
//! rules in priority order: same-day, then bed-and-breakfast, then the
//! Section 104 pool. Matches split quantities proportionally and reduce the
//! remaining balances in place; all fragments arising from one disposing
//! trade are aggregated into a single [`Disposal`].

pub mod filters;

use crate::disposal::Disposal;
use crate::ledger::Ledger;
use crate::trade::{Trade, TradeError, TradeId};

/// Partition the ledger into disposal events.
///
/// Trades that match nothing under any rule are left in the ledger with
/// their residual quantity and produce no disposal.
pub fn match_trades(ledger: &mut Ledger) -> Result<Vec<Disposal>, TradeError> {
    let mut disposals = Vec::new();

    for trade_id in ledger.ids() {
        let Some(trade) = ledger.get(trade_id) else {
            continue; // collapsed into an earlier pool
        };
        if trade.quantity.is_zero() {
            continue; // fully consumed by an earlier disposal
        }
        let trade = trade.clone();

        let mut disposal_fragments: Vec<Trade> = Vec::new();
        let mut matching_fragments: Vec<Trade> = Vec::new();

        let same_day = filters::same_day_trades(ledger, &trade);
        if match_candidates(
            ledger,
            trade_id,
            &same_day,
            &mut disposal_fragments,
            &mut matching_fragments,
            "same-day",
        ) && fully_matched(ledger, trade_id)
        {
            if let Some(disposal) = create_disposal(disposal_fragments, matching_fragments)? {
                disposals.push(disposal);
            }
            continue;
        }

        let bed_and_breakfast = filters::bed_and_breakfast_trades(ledger, &trade);
        if match_candidates(
            ledger,
            trade_id,
            &bed_and_breakfast,
            &mut disposal_fragments,
            &mut matching_fragments,
            "bed-and-breakfast",
        ) && fully_matched(ledger, trade_id)
        {
            if let Some(disposal) = create_disposal(disposal_fragments, matching_fragments)? {
                disposals.push(disposal);
            }
            continue;
        }

        let pool = filters::section_104_trades(ledger, &trade);
        if let Some((&first_id, rest)) = pool.split_first() {
            let pooled_id = collapse_section_104(ledger, first_id, rest)?;
            // pooling removed every other candidate, so exactly one call
            if let Some((disposal_fragment, matching_fragment)) =
                process_matching_trade(ledger, trade_id, pooled_id)
            {
                log::debug!(
                    "section-104 match: {} against pooled trade {}",
                    trade.symbol,
                    pooled_id
                );
                disposal_fragments.push(disposal_fragment);
                matching_fragments.push(matching_fragment);
            }
        }

        if let Some(disposal) = create_disposal(disposal_fragments, matching_fragments)? {
            disposals.push(disposal);
        }
    }

    Ok(disposals)
}

/// Match the disposing trade against each candidate in order until either the
/// candidates run out or the disposing trade's quantity reaches zero.
/// Returns true when at least one match was made.
fn match_candidates(
    ledger: &mut Ledger,
    disposal_id: TradeId,
    candidate_ids: &[TradeId],
    disposal_fragments: &mut Vec<Trade>,
    matching_fragments: &mut Vec<Trade>,
    rule: &str,
) -> bool {
    let mut matched = false;

    for &candidate_id in candidate_ids {
        let Some((disposal_fragment, matching_fragment)) =
            process_matching_trade(ledger, disposal_id, candidate_id)
        else {
            continue;
        };

        log::debug!(
            "{} match: {} {} units of {} against trade {}",
            rule,
            disposal_fragment.quantity.abs(),
            disposal_fragment.symbol,
            disposal_id,
            candidate_id
        );

        disposal_fragments.push(disposal_fragment);
        matching_fragments.push(matching_fragment);
        matched = true;

        if fully_matched(ledger, disposal_id) {
            break;
        }
    }

    matched
}

/// One partial match: consume the minimum of the two absolute remaining
/// quantities from both rows and return the pro-rata fragments.
fn process_matching_trade(
    ledger: &mut Ledger,
    disposal_id: TradeId,
    matching_id: TradeId,
) -> Option<(Trade, Trade)> {
    let disposal_row = ledger.get(disposal_id)?.clone();
    let matching_row = ledger.get(matching_id)?.clone();

    let matched_qty = disposal_row
        .quantity
        .abs()
        .min(matching_row.quantity.abs());

    let disposal_fragment = disposal_row.fragment(matched_qty);
    let matching_fragment = matching_row.fragment(matched_qty);

    if let Some(row) = ledger.get_mut(disposal_id) {
        row.reduce(matched_qty);
    }
    if let Some(row) = ledger.get_mut(matching_id) {
        row.reduce(matched_qty);
    }

    Some((disposal_fragment, matching_fragment))
}

/// Collapse a Section 104 candidate set into its first row.
///
/// Sums quantity and the monetary fields into the first row, removes every
/// other row from the ledger permanently and recomputes the first row's FX
/// rate from the totals. A single-row pool is returned unchanged.
fn collapse_section_104(
    ledger: &mut Ledger,
    first_id: TradeId,
    rest: &[TradeId],
) -> Result<TradeId, TradeError> {
    if rest.is_empty() {
        return Ok(first_id);
    }
    let Some(mut pooled) = ledger.get(first_id).cloned() else {
        return Ok(first_id);
    };

    for &id in rest {
        if let Some(row) = ledger.remove(id) {
            pooled = pooled.try_add(&row)?;
        }
    }

    log::debug!(
        "collapsed {} pool trades of {} into trade {}: qty={}, notional_gbp={}",
        rest.len() + 1,
        pooled.symbol,
        first_id,
        pooled.quantity,
        pooled.notional_value_gbp
    );

    if let Some(row) = ledger.get_mut(first_id) {
        *row = pooled;
    }
    Ok(first_id)
}

fn fully_matched(ledger: &Ledger, id: TradeId) -> bool {
    ledger.get(id).is_none_or(|t| t.quantity.is_zero())
}

/// Aggregate the disposing trade's fragments into one trade and pair it with
/// the ordered matching fragments. Returns None when nothing matched.
fn create_disposal(
    disposal_fragments: Vec<Trade>,
    matching_fragments: Vec<Trade>,
) -> Result<Option<Disposal>, TradeError> {
    let Some((first, rest)) = disposal_fragments.split_first() else {
        return Ok(None);
    };

    let mut aggregated = first.clone();
    for fragment in rest {
        aggregated = aggregated.try_add(fragment)?;
    }

    Ok(Some(Disposal::new(aggregated, matching_fragments)))
}
