//! Reconciliation pass
//!
//! Fills in what Scorer does not export reliably: the percentage split of
//! director-adjusted boards and the final placings.

use crate::decimal::Decimal;
use crate::model::{Direction, Pair, Session, Traveller, WinnerCount};
use log::{debug, warn};
use std::collections::BTreeMap;

/// Run every reconciliation step over a freshly read session
pub fn reconcile(session: &mut Session) {
    reconstruct_adjusted_scores(session);
    let winners = session.winner_count();
    fixup_places(session.pairs.values_mut(), winners);
}

/// Reconstructed score display for an adjusted board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustedScore {
    /// e.g. `A6040` for 60% to NS and 40% to EW
    pub text: String,
    /// False when a side's share is not a whole multiple of 10%, which
    /// usually means the board had a different pool size
    pub exact: bool,
}

/// Express an adjusted board's match points as an `A<ns><ew>` score
pub fn adjusted_score(ns: Decimal, ew: Decimal, pool: i64) -> Option<AdjustedScore> {
    let ns_pct = ns.percent_of(pool)?;
    let ew_pct = ew.percent_of(pool)?;
    let ten = Decimal::from_int(10);

    Some(AdjustedScore {
        text: format!("A{:02}{:02}", ns_pct.round_to_int()?, ew_pct.round_to_int()?),
        exact: ns_pct.is_multiple_of(ten) && ew_pct.is_multiple_of(ten),
    })
}

/// Match points shared between the two sides of a normal board
///
/// Scorer does not export the pool size, so this takes the most common
/// rounded NS+EW total over the boards that were actually played. Sessions
/// where the total varies get a warning; the most common value is still used.
pub fn match_point_pool(session: &Session) -> Option<i64> {
    let mut counts = total_counts(session.travellers().filter(|t| !t.is_adjusted()));
    if counts.is_empty() {
        counts = total_counts(session.travellers());
    }

    // Highest count wins; ties go to the smaller total
    let (&pool, _) = counts
        .iter()
        .max_by(|(a_total, a_count), (b_total, b_count)| {
            a_count.cmp(b_count).then_with(|| b_total.cmp(a_total))
        })?;

    if counts.len() > 1 {
        warn!(
            "Match point totals vary between boards ({:?}); assuming a pool of {}",
            counts, pool
        );
    }
    Some(pool)
}

/// How many lines award each rounded match point total
fn total_counts<'a>(travellers: impl Iterator<Item = &'a Traveller>) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for total in travellers.filter_map(|t| t.match_point_total()?.round_to_int()) {
        *counts.entry(total).or_default() += 1;
    }
    counts
}

/// Replace every `Adj` score display with its reconstructed split
pub fn reconstruct_adjusted_scores(session: &mut Session) {
    if !session.travellers().any(|t| t.is_adjusted()) {
        return;
    }
    let Some(pool) = match_point_pool(session) else {
        return;
    };

    for traveller in session.travellers_mut().filter(|t| t.is_adjusted()) {
        let Some(adjusted) =
            adjusted_score(traveller.ns_match_points, traveller.ew_match_points, pool)
        else {
            warn!(
                "Cannot reconstruct adjusted score for {} v {} with a pool of {}",
                traveller.ns, traveller.ew, pool
            );
            continue;
        };

        if !adjusted.exact {
            warn!(
                "Adjusted score {} for {} v {} is not a multiple of 10% (match points {}/{}, pool {})",
                adjusted.text,
                traveller.ns,
                traveller.ew,
                traveller.ns_match_points,
                traveller.ew_match_points,
                pool
            );
        }
        debug!("Adjusted {} v {} -> {}", traveller.ns, traveller.ew, adjusted.text);
        traveller.score = adjusted.text;
    }
}

/// Assign places across the whole session
///
/// With two winners the EW pairs are ranked separately from everyone else.
/// Pairs on the same percentage share a place and the next pair down takes
/// the place matching its position (1, 2, 2, 4).
pub fn fixup_places<'a, I>(pairs: I, winners: WinnerCount)
where
    I: IntoIterator<Item = &'a mut Pair>,
{
    let (ew, others): (Vec<_>, Vec<_>) = pairs.into_iter().partition(|pair| {
        winners == WinnerCount::Two && pair.direction == Some(Direction::EastWest)
    });

    for group in [others, ew] {
        rank_group(group);
    }
}

fn rank_group(group: Vec<&mut Pair>) {
    let mut ranked: Vec<(Decimal, &mut Pair)> = group
        .into_iter()
        .map(|pair| (pair.ranking_percentage(), pair))
        .collect();
    ranked.sort_by(|(a_pct, a), (b_pct, b)| b_pct.cmp(a_pct).then_with(|| a.id.cmp(&b.id)));

    let mut place = 0;
    let mut previous = None;
    for (index, (percentage, pair)) in ranked.into_iter().enumerate() {
        if previous != Some(percentage) {
            place = index as u32 + 1;
            previous = Some(percentage);
        }
        pair.score.place = Some(place);
    }
}
