//! Reduces the 3-hourly forecast into per-day summaries.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::model::{ForecastDay, ForecastEntry};

/// Number of days shown when the caller does not ask otherwise.
pub const DEFAULT_DAYS: usize = 3;

/// Groups entries by UTC calendar date and keeps the earliest `days` days.
pub fn summarize(entries: &[ForecastEntry], days: usize) -> Vec<ForecastDay> {
    let mut grouped: BTreeMap<NaiveDate, Vec<&ForecastEntry>> = BTreeMap::new();
    for entry in entries {
        grouped.entry(entry.at.date_naive()).or_default().push(entry);
    }

    grouped
        .into_iter()
        .take(days)
        .map(|(date, group)| summarize_day(date, &group))
        .collect()
}

fn summarize_day(date: NaiveDate, group: &[&ForecastEntry]) -> ForecastDay {
    let min = group
        .iter()
        .map(|e| e.temperature)
        .fold(f64::INFINITY, f64::min);
    let max = group
        .iter()
        .map(|e| e.temperature)
        .fold(f64::NEG_INFINITY, f64::max);

    let mean_pop = group.iter().map(|e| e.pop).sum::<f64>() / group.len() as f64;
    let pop_pct = (mean_pop * 100.0).clamp(0.0, 100.0) as u8;

    ForecastDay {
        date,
        min,
        max,
        pop_pct,
        summary: capitalize(most_common(group.iter().map(|e| e.description.as_str()))),
    }
}

/// Most frequent item; on a tie the one seen first wins.
fn most_common<'a>(items: impl Iterator<Item = &'a str>) -> &'a str {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(seen, _)| *seen == item) {
            Some((_, n)) => *n += 1,
            None => counts.push((item, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (item, n) in counts {
        if best.is_none_or(|(_, top)| n > top) {
            best = Some((item, n));
        }
    }
    best.map(|(item, _)| item).unwrap_or_default()
}

/// Upper-cases the first character and lower-cases the rest.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
