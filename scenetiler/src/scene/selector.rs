//! Best-candidate scene selection.

use std::cmp::Ordering;

use super::SceneRecord;

/// Outcome of candidate selection.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// The top-ranked records, best first.
    Selected(Vec<SceneRecord>),

    /// The query returned nothing; the region should be skipped.
    NoImagery,
}

/// Ranks scene records and selects the best K.
///
/// Ranking is newest ingestion date first, then lowest cloud cover. The
/// sort is stable, so records that tie on both keys keep the order the
/// catalogue returned them in.
#[derive(Debug, Clone, Copy)]
pub struct CandidateSelector {
    top_k: usize,
}

impl CandidateSelector {
    /// Create a selector returning at most `top_k` records (minimum 1).
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k: top_k.max(1),
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Ordering used for ranking.
    pub fn compare(a: &SceneRecord, b: &SceneRecord) -> Ordering {
        b.ingestion_date
            .cmp(&a.ingestion_date)
            .then_with(|| a.cloud_cover.total_cmp(&b.cloud_cover))
    }

    /// Sort records in place, best first.
    pub fn rank(&self, records: &mut [SceneRecord]) {
        records.sort_by(Self::compare);
    }

    /// Rank the records and keep the top K.
    pub fn select(&self, mut records: Vec<SceneRecord>) -> Selection {
        if records.is_empty() {
            return Selection::NoImagery;
        }
        self.rank(&mut records);
        records.truncate(self.top_k);
        Selection::Selected(records)
    }
}

impl Default for CandidateSelector {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(id: &str, day: u32, cloud: f64) -> SceneRecord {
        SceneRecord::new(id, Utc.with_ymd_and_hms(2021, 7, day, 0, 0, 0).unwrap(), cloud)
    }

    #[test]
    fn test_empty_input_yields_no_imagery() {
        assert_eq!(CandidateSelector::new(3).select(Vec::new()), Selection::NoImagery);
    }

    #[test]
    fn test_newest_first_then_clearest() {
        let records = vec![
            record("old-clear", 1, 0.5),
            record("new-cloudy", 20, 9.0),
            record("new-clear", 20, 2.0),
        ];
        let Selection::Selected(picked) = CandidateSelector::new(3).select(records) else {
            panic!("expected selection");
        };
        let ids: Vec<_> = picked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new-clear", "new-cloudy", "old-clear"]);
    }

    #[test]
    fn test_top_one() {
        let records = vec![record("a", 1, 1.0), record("b", 2, 1.0)];
        let Selection::Selected(picked) = CandidateSelector::default().select(records) else {
            panic!("expected selection");
        };
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, "b");
    }

    #[test]
    fn test_ties_keep_catalogue_order() {
        let records = vec![
            record("first", 5, 3.0),
            record("second", 5, 3.0),
            record("third", 5, 3.0),
        ];
        let Selection::Selected(picked) = CandidateSelector::new(10).select(records) else {
            panic!("expected selection");
        };
        let ids: Vec<_> = picked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_zero_k_is_clamped() {
        assert_eq!(CandidateSelector::new(0).top_k(), 1);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_selection_is_sorted_and_stable(
                entries in prop::collection::vec((1u32..=5, 0u8..=3), 1..40),
                k in 1usize..50
            ) {
                let records: Vec<SceneRecord> = entries
                    .iter()
                    .enumerate()
                    .map(|(i, (day, cloud))| record(&i.to_string(), *day, f64::from(*cloud)))
                    .collect();

                let Selection::Selected(picked) = CandidateSelector::new(k).select(records.clone()) else {
                    panic!("non-empty input must select");
                };

                prop_assert_eq!(picked.len(), k.min(records.len()));
                for pair in picked.windows(2) {
                    let (a, b) = (&pair[0], &pair[1]);
                    prop_assert!(a.ingestion_date >= b.ingestion_date);
                    if a.ingestion_date == b.ingestion_date {
                        prop_assert!(a.cloud_cover <= b.cloud_cover);
                        if a.cloud_cover == b.cloud_cover {
                            let ia: usize = a.id.parse().unwrap();
                            let ib: usize = b.id.parse().unwrap();
                            prop_assert!(ia < ib, "tie order not preserved: {} before {}", ia, ib);
                        }
                    }
                }
            }
        }
    }
}
