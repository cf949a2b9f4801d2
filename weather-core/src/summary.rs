use std::collections::VecDeque;

use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::model::{DailySummary, Readings};

/// Maximum number of summaries kept in the rolling history.
pub const HISTORY_LEN: usize = 7;

/// Fold one cycle's readings into a summary dated `date`.
///
/// Returns `None` when no city produced a reading this cycle; there is no
/// meaningful average over an empty set, so the caller skips the summary.
pub fn aggregate(readings: &Readings, date: NaiveDate) -> Option<DailySummary> {
    if readings.is_empty() {
        return None;
    }

    let temps: Vec<f64> = readings.snapshots().map(|s| s.temp_c()).collect();
    let sum: f64 = temps.iter().sum();
    let max_temp = temps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min_temp = temps.iter().copied().fold(f64::INFINITY, f64::min);

    let dominant_condition =
        dominant_condition(readings.snapshots().map(|s| s.condition.as_str()))?;

    Some(DailySummary {
        date,
        avg_temp: sum / temps.len() as f64,
        max_temp,
        min_temp,
        dominant_condition,
    })
}

/// Most frequent label. A later label only takes the lead by strictly
/// exceeding the leader's count, so ties go to whichever label was seen first.
pub fn dominant_condition<'a>(conditions: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for condition in conditions {
        *counts.entry(condition).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .reduce(|leader, candidate| {
            if candidate.1 > leader.1 {
                candidate
            } else {
                leader
            }
        })
        .map(|(label, _)| label.to_string())
}

/// Rolling history capped at [`HISTORY_LEN`] entries, oldest evicted first.
#[derive(Debug, Clone, Default)]
pub struct SummaryHistory {
    entries: VecDeque<DailySummary>,
}

impl SummaryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, summary: DailySummary) {
        self.entries.push_back(summary);
        while self.entries.len() > HISTORY_LEN {
            self.entries.pop_front();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &DailySummary> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&DailySummary> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WeatherSnapshot;
    use chrono::Utc;

    fn readings(entries: &[(u32, &str, f64)]) -> Readings {
        let mut readings = Readings::new();
        for (id, condition, celsius) in entries {
            readings.insert(
                *id,
                WeatherSnapshot {
                    condition: condition.to_string(),
                    temp_k: celsius + 273.15,
                    feels_like_k: celsius + 273.15,
                    humidity: 40,
                    observed_at: Utc::now(),
                },
            );
        }
        readings
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 20).unwrap()
    }

    #[test]
    fn aggregate_computes_avg_max_min() {
        let r = readings(&[(1, "Clear", 20.0), (2, "Clear", 30.0), (3, "Rain", 25.0)]);
        let summary = aggregate(&r, today()).expect("non-empty readings must summarise");

        assert!((summary.avg_temp - 25.0).abs() < 1e-9);
        assert!((summary.max_temp - 30.0).abs() < 1e-9);
        assert!((summary.min_temp - 20.0).abs() < 1e-9);
        assert_eq!(summary.dominant_condition, "Clear");
        assert_eq!(summary.date, today());
    }

    #[test]
    fn average_lies_between_min_and_max() {
        let cases: [&[(u32, &str, f64)]; 4] = [
            &[(1, "Clear", -12.5)],
            &[(1, "Clear", 41.0), (2, "Haze", -3.0)],
            &[(1, "Rain", 18.2), (2, "Rain", 18.2), (3, "Rain", 18.2)],
            &[(1, "Mist", 0.1), (2, "Clear", 33.3), (3, "Snow", -40.0), (4, "Rain", 12.0)],
        ];

        for case in cases {
            let s = aggregate(&readings(case), today()).expect("non-empty");
            assert!(s.min_temp <= s.avg_temp && s.avg_temp <= s.max_temp, "{s:?}");
        }
    }

    #[test]
    fn aggregate_skips_empty_cycle() {
        assert!(aggregate(&Readings::new(), today()).is_none());
    }

    #[test]
    fn dominant_condition_prefers_majority() {
        let r = readings(&[(1, "Rain", 20.0), (2, "Rain", 21.0), (3, "Clear", 22.0)]);
        assert_eq!(aggregate(&r, today()).unwrap().dominant_condition, "Rain");
    }

    #[test]
    fn dominant_condition_tie_goes_to_first_seen() {
        let r = readings(&[(1, "Clear", 20.0), (2, "Rain", 21.0)]);
        assert_eq!(aggregate(&r, today()).unwrap().dominant_condition, "Clear");

        let r = readings(&[(2, "Rain", 21.0), (1, "Clear", 20.0)]);
        assert_eq!(aggregate(&r, today()).unwrap().dominant_condition, "Rain");
    }

    #[test]
    fn dominant_condition_is_case_sensitive() {
        assert_eq!(
            dominant_condition(["rain", "Rain", "Rain"]),
            Some("Rain".to_string())
        );
    }

    #[test]
    fn interleaved_tie_keeps_first_label() {
        assert_eq!(
            dominant_condition(["Clear", "Rain", "Rain", "Clear"]),
            Some("Clear".to_string())
        );
        assert_eq!(
            dominant_condition(["Mist", "Rain", "Clear", "Rain", "Clear"]),
            Some("Rain".to_string())
        );
    }

    #[test]
    fn dominant_condition_of_nothing_is_none() {
        assert_eq!(dominant_condition(std::iter::empty()), None);
    }

    #[test]
    fn history_evicts_oldest_beyond_seven() {
        let mut history = SummaryHistory::new();
        for i in 0..8 {
            let summary = aggregate(&readings(&[(1, "Clear", i as f64)]), today()).unwrap();
            history.push(summary);
            assert!(history.len() <= HISTORY_LEN);
        }

        assert_eq!(history.len(), 7);
        let first = history.iter().next().unwrap();
        assert!((first.avg_temp - 1.0).abs() < 1e-9);
        assert!((history.latest().unwrap().avg_temp - 7.0).abs() < 1e-9);
    }

    #[test]
    fn same_day_cycles_each_append() {
        let mut history = SummaryHistory::new();
        history.push(aggregate(&readings(&[(1, "Clear", 10.0)]), today()).unwrap());
        history.push(aggregate(&readings(&[(1, "Clear", 11.0)]), today()).unwrap());

        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|s| s.date == today()));
    }
}
