use crate::models::{DailyRecord, StatsResponse, Target, TargetTotals, TrendPoint};

pub const DEFAULT_TREND_WINDOW: usize = 7;

/// `records` must already be sorted ascending by date, as `Store::list_all` returns them.
pub fn build_stats(records: &[DailyRecord], window: usize) -> StatsResponse {
    let targets = target_totals(records);
    let total_thoughts = targets.iter().map(|totals| totals.thoughts).sum();

    StatsResponse {
        trend: trend(records, window),
        peace_rate: peace_rate(records),
        wholesome_ratio: wholesome_ratio(records),
        total_thoughts,
        days_recorded: records.len() as u64,
        targets,
    }
}

/// Thought sums for the last `window` records, oldest first.
pub fn trend(records: &[DailyRecord], window: usize) -> Vec<TrendPoint> {
    let start = records.len().saturating_sub(window);
    records[start..]
        .iter()
        .map(|record| {
            let mut point = TrendPoint {
                date: record.date.clone(),
                positive_sum: 0,
                negative_sum: 0,
                agitated: 0,
            };
            for (_, log) in record.targets.iter() {
                point.positive_sum += u128::from(log.positive_thought_count);
                point.negative_sum += u128::from(log.negative_thought_count);
                if log.has_negative_emotion {
                    point.agitated += 1;
                }
            }
            point
        })
        .collect()
}

/// Lifetime totals per target, in `Target::ALL` order.
pub fn target_totals(records: &[DailyRecord]) -> Vec<TargetTotals> {
    Target::ALL
        .into_iter()
        .map(|target| {
            let mut totals = TargetTotals {
                target,
                agitated_days: 0,
                peaceful_days: 0,
                total_days: 0,
                thoughts: 0,
                positive_thoughts: 0,
            };
            for record in records {
                let log = record.targets.get(target);
                if log.has_negative_emotion {
                    totals.agitated_days += 1;
                } else {
                    totals.peaceful_days += 1;
                }
                totals.total_days += 1;
                totals.thoughts += u128::from(log.negative_thought_count);
                totals.positive_thoughts += u128::from(log.positive_thought_count);
            }
            totals
        })
        .collect()
}

/// Share of peaceful (record, target) pairs as a whole percent; 100 with no records.
pub fn peace_rate(records: &[DailyRecord]) -> u64 {
    let interactions = records.len() as u64 * Target::ALL.len() as u64;
    if interactions == 0 {
        return 100;
    }
    let peaceful = records
        .iter()
        .flat_map(|record| record.targets.iter())
        .filter(|(_, log)| !log.has_negative_emotion)
        .count() as u64;
    round_percent(u128::from(peaceful), u128::from(interactions))
}

/// Positive thoughts over all noticed thoughts as a whole percent; 0 with none.
pub fn wholesome_ratio(records: &[DailyRecord]) -> u64 {
    let (positive, negative) = records
        .iter()
        .flat_map(|record| record.targets.iter())
        .fold((0u128, 0u128), |(positive, negative), (_, log)| {
            (
                positive + u128::from(log.positive_thought_count),
                negative + u128::from(log.negative_thought_count),
            )
        });
    let total = positive + negative;
    if total == 0 {
        return 0;
    }
    round_percent(positive, total)
}

// Integer form of round(100 * part / whole) with halves rounded up, which is
// away from zero for non-negative inputs. `100 * part` fits in u128 even when
// every counter sits at `u64::MAX`.
fn round_percent(part: u128, whole: u128) -> u64 {
    let whole_percent = part * 100 / whole;
    let remainder = part * 100 % whole;
    let rounded = if remainder * 2 >= whole { whole_percent + 1 } else { whole_percent };
    rounded as u64
}
