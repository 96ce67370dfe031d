mod config;
use log::debug;

use std::collections::BTreeMap;

use chrono::Duration;

pub use crate::config::*;

/// Splits the raw submissions into the canonical analysis set and the
/// number of duplicate submissions that were dropped.
///
/// The filter is stable: surviving rows keep their input order.
pub fn dedupe(rows: Vec<Respondent>) -> (Vec<Respondent>, usize) {
    let total = rows.len();
    let canonical: Vec<Respondent> = rows.into_iter().filter(|r| !r.duplicate).collect();
    let duplicate_count = total - canonical.len();
    debug!(
        "dedupe: kept {} rows, dropped {} duplicate submissions",
        canonical.len(),
        duplicate_count
    );
    (canonical, duplicate_count)
}

/// Counts respondents per value of one categorical answer.
///
/// Rows for which `key` returns `None` (the respondent skipped the
/// question) are not counted. An empty input yields an empty tally with
/// `GroupOrder::Observed` and an all-zero tally with `GroupOrder::Fixed`.
pub fn group_count<'a, I, F>(rows: I, key: F, order: GroupOrder) -> Vec<(String, u64)>
where
    I: IntoIterator<Item = &'a Respondent>,
    F: Fn(&'a Respondent) -> Option<&'a str>,
{
    match order {
        GroupOrder::Fixed(scale) => {
            let mut tally: Vec<(String, u64)> =
                scale.iter().map(|k| (k.to_string(), 0)).collect();
            for r in rows {
                if let Some(v) = key(r) {
                    if let Some(slot) = tally.iter_mut().find(|(k, _)| k.as_str() == v) {
                        slot.1 += 1;
                    }
                }
            }
            tally
        }
        GroupOrder::Observed => {
            let mut tally: Vec<(String, u64)> = Vec::new();
            for r in rows {
                if let Some(v) = key(r) {
                    match tally.iter_mut().find(|(k, _)| k.as_str() == v) {
                        Some(slot) => slot.1 += 1,
                        None => tally.push((v.to_string(), 1)),
                    }
                }
            }
            tally
        }
    }
}

/// Counts respondents per derived key (date or hour of the submission
/// timestamp), sorted ascending by key.
pub fn group_count_by<'a, I, K, F>(rows: I, key: F) -> Vec<(K, u64)>
where
    I: IntoIterator<Item = &'a Respondent>,
    K: Ord,
    F: Fn(&'a Respondent) -> Option<K>,
{
    let mut tally: BTreeMap<K, u64> = BTreeMap::new();
    for r in rows {
        if let Some(k) = key(r) {
            *tally.entry(k).or_insert(0) += 1;
        }
    }
    tally.into_iter().collect()
}

/// Counts respondents per pair of categorical answers, sorted by pair.
/// Rows missing either answer are not counted.
pub fn group_count_pairs<'a, I, F1, F2>(
    rows: I,
    key1: F1,
    key2: F2,
) -> Vec<((String, String), u64)>
where
    I: IntoIterator<Item = &'a Respondent>,
    F1: Fn(&'a Respondent) -> Option<&'a str>,
    F2: Fn(&'a Respondent) -> Option<&'a str>,
{
    let mut tally: BTreeMap<(String, String), u64> = BTreeMap::new();
    for r in rows {
        if let (Some(a), Some(b)) = (key1(r), key2(r)) {
            *tally.entry((a.to_string(), b.to_string())).or_insert(0) += 1;
        }
    }
    tally.into_iter().collect()
}

/// Statistical median of a duration-valued column. For an even number of
/// rows this is the average of the two middle values. `None` on empty
/// input.
pub fn median_duration<'a, I, F>(rows: I, duration: F) -> Option<Duration>
where
    I: IntoIterator<Item = &'a Respondent>,
    F: Fn(&'a Respondent) -> Duration,
{
    let mut durations: Vec<Duration> = rows.into_iter().map(duration).collect();
    if durations.is_empty() {
        return None;
    }
    durations.sort();
    let n = durations.len();
    let median = if n % 2 == 1 {
        durations[n / 2]
    } else {
        (durations[n / 2 - 1] + durations[n / 2]) / 2
    };
    Some(median)
}

/// Decomposes a duration into the minutes/seconds pair shown in the
/// report header.
///
/// Whole hours are not carried into the minutes component: minutes are
/// `total % 3600 / 60`, so 1h01m40s renders as 1 minute 40 seconds. The
/// published report numbers depend on this exact arithmetic.
pub fn minutes_seconds(d: Duration) -> (i64, i64) {
    let total = d.num_seconds();
    ((total % 3600) / 60, total % 60)
}

/// The subset of `rows` matching one dropdown selection.
///
/// The per-dimension sentinel returns the input unchanged. A value that
/// never occurs in the data yields an empty subset, which downstream
/// tallies render as "no data" rather than an error.
pub fn select<'a>(rows: &'a [Respondent], dim: Dimension, value: &str) -> Vec<&'a Respondent> {
    if value == dim.sentinel() {
        return rows.iter().collect();
    }
    rows.iter().filter(|r| dim.value(r) == Some(value)).collect()
}

/// Selectable values for the country dropdown: the distinct observed
/// countries plus the sentinel, sorted together alphabetically. The
/// sentinel is not pinned to the top.
pub fn country_options(rows: &[Respondent]) -> Vec<String> {
    let mut options: Vec<String> = rows
        .iter()
        .filter_map(|r| r.country_of_origin.clone())
        .collect();
    options.push(ALL_COUNTRIES.to_string());
    options.sort();
    options.dedup();
    options
}

/// Selectable values for the age dropdown: the fixed brackets, sentinel
/// first.
pub fn age_group_options() -> Vec<String> {
    with_sentinel(ALL_AGE_GROUPS, AGE_GROUPS)
}

/// Selectable values for the education dropdown: the fixed levels,
/// sentinel first.
pub fn education_options() -> Vec<String> {
    with_sentinel(ALL_EDUCATION_GROUPS, EDUCATION_LEVELS)
}

fn with_sentinel(sentinel: &str, scale: &[&str]) -> Vec<String> {
    let mut options = vec![sentinel.to_string()];
    options.extend(scale.iter().map(|s| s.to_string()));
    options
}

/// The distinct questions of the free-text table, in file order.
pub fn freetext_questions(rows: &[FreeTextResponse]) -> Vec<String> {
    let mut questions: Vec<String> = Vec::new();
    for r in rows {
        if !questions.iter().any(|q| q == &r.question) {
            questions.push(r.question.clone());
        }
    }
    questions
}

/// Coded responses and counts for one free-text question, in file order.
pub fn freetext_counts(rows: &[FreeTextResponse], question: &str) -> Vec<(String, u64)> {
    rows.iter()
        .filter(|r| r.question == question)
        .map(|r| (r.response.clone(), r.count))
        .collect()
}
