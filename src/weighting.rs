use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::records::Record;

pub const FACTOR_MIN: f64 = 0.75;
pub const FACTOR_MAX: f64 = 2.5;

/// Half-width of the recency adjustment band: the least recently used
/// tag lands at -0.25, the most recent at +0.25.
const RECENCY_SWING: f64 = 0.25;

/// Aggregated usage for one effective tag name.
#[derive(Clone, Copy, Debug)]
pub struct TagUsage {
    pub total_months: i64,
    pub first_used: NaiveDate,
    pub last_used: NaiveDate,
}

/// Accumulate usage per effective tag name. Tags fold into their parent
/// before aggregation, and a record carrying both a parent tag and one
/// of its children credits that name once, not twice.
pub fn usage_by_tag(records: &[Record], now: NaiveDate) -> HashMap<String, TagUsage> {
    let mut usage: HashMap<String, TagUsage> = HashMap::new();

    for record in records {
        let months = record.active_months(now);
        let end = record.effective_end(now);
        let mut counted = HashSet::new();

        for tag in &record.tags {
            let name = tag.effective_name();
            if !counted.insert(name) {
                continue;
            }

            match usage.get_mut(name) {
                Some(entry) => {
                    entry.total_months += months;
                    entry.first_used = entry.first_used.min(record.start);
                    entry.last_used = entry.last_used.max(end);
                }
                None => {
                    usage.insert(
                        name.to_owned(),
                        TagUsage {
                            total_months: months,
                            first_used: record.start,
                            last_used: end,
                        },
                    );
                }
            }
        }
    }

    usage
}

/// Per-tag visual scale factors derived from usage magnitude and
/// recency, normalized so the total rendered area stays close to the
/// all-factors-1.0 baseline.
///
/// Pure function of `(records, now)`: callers needing reproducible
/// output inject a fixed `now`.
pub fn size_factors(records: &[Record], now: NaiveDate) -> HashMap<String, f64> {
    let usage = usage_by_tag(records, now);
    if usage.is_empty() {
        return HashMap::new();
    }

    let mut totals: Vec<i64> = usage.values().map(|entry| entry.total_months).collect();
    totals.sort_unstable();
    let baseline = median(&totals);

    let oldest = usage
        .values()
        .map(|entry| entry.last_used)
        .min()
        .unwrap_or(now);
    let newest = usage
        .values()
        .map(|entry| entry.last_used)
        .max()
        .unwrap_or(now);
    let span_days = (newest - oldest).num_days() as f64;

    let count = usage.len();
    let mut factors: HashMap<String, f64> = usage
        .into_iter()
        .map(|(name, entry)| {
            let raw = if baseline > 0.0 {
                entry.total_months as f64 / baseline
            } else {
                1.0
            };
            let recency = if span_days > 0.0 {
                let position = (entry.last_used - oldest).num_days() as f64 / span_days;
                position * (2.0 * RECENCY_SWING) - RECENCY_SWING
            } else {
                0.0
            };
            let factor = (raw * (1.0 + recency)).clamp(FACTOR_MIN, FACTOR_MAX);
            (name, factor)
        })
        .collect();

    // Area scales with factor^2, so conserving total area means scaling
    // every factor by sqrt(n / sum of squares). The re-clamp afterwards
    // can shift total area slightly; tests bound the drift at 5%.
    let sum_squares: f64 = factors.values().map(|factor| factor * factor).sum();
    if sum_squares > 0.0 {
        let normalization = (count as f64 / sum_squares).sqrt();
        for factor in factors.values_mut() {
            *factor = (*factor * normalization).clamp(FACTOR_MIN, FACTOR_MAX);
        }
    }

    debug!(tags = count, baseline, "computed size factors");
    factors
}

fn median(sorted: &[i64]) -> f64 {
    let count = sorted.len();
    if count % 2 == 1 {
        sorted[count / 2] as f64
    } else {
        (sorted[count / 2 - 1] + sorted[count / 2]) as f64 / 2.0
    }
}
