//! Availability tally: turns an event's candidate dates and its responses
//! into the data behind the availability matrix. Pure and synchronous, so
//! it is recomputed from store state on every read and every update; the
//! result is never cached.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::db::models::EventParticipation;

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AvailabilitySummary {
    /// The event has no usable date options at all.
    NoOptions,
    /// Options exist but nobody has responded yet.
    NoResponses { dates: Vec<NaiveDate> },
    Tallied(TallyBoard),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TallyBoard {
    /// Candidate dates sorted ascending; the matrix columns.
    pub dates: Vec<NaiveDate>,
    /// Votes per candidate date, zero-initialized so unvoted dates show up.
    pub counts: BTreeMap<NaiveDate, u32>,
    pub max_votes: u32,
    /// Every date tied at `max_votes`; empty when nobody voted for
    /// anything on offer.
    pub best_dates: Vec<NaiveDate>,
    /// One row per response, in insertion order.
    pub rows: Vec<ParticipantRow>,
    pub response_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRow {
    pub participant_name: String,
    pub comment: Option<String>,
    /// Selected / not selected, one cell per entry of `dates`.
    pub cells: Vec<bool>,
}

pub fn tally_availability(
    date_options: &[String],
    participations: &[EventParticipation],
) -> AvailabilitySummary {
    let mut dates: Vec<NaiveDate> = date_options.iter().filter_map(|d| parse_date(d)).collect();
    dates.sort_unstable();
    dates.dedup();

    if dates.is_empty() {
        return AvailabilitySummary::NoOptions;
    }

    if participations.is_empty() {
        return AvailabilitySummary::NoResponses { dates };
    }

    let mut counts: BTreeMap<NaiveDate, u32> = dates.iter().map(|d| (*d, 0)).collect();
    let mut rows = Vec::with_capacity(participations.len());

    for participation in participations {
        // A set, so a duplicated entry in a stored response counts once.
        let selected: HashSet<NaiveDate> = participation
            .selected_dates
            .0
            .iter()
            .filter_map(|d| parse_date(d))
            .collect();

        for date in &selected {
            // Dates outside the candidate set are stale data; ignore them.
            if let Some(count) = counts.get_mut(date) {
                *count += 1;
            }
        }

        rows.push(ParticipantRow {
            participant_name: participation.participant_name.clone(),
            comment: participation.comment.clone(),
            cells: dates.iter().map(|d| selected.contains(d)).collect(),
        });
    }

    let max_votes = counts.values().copied().max().unwrap_or(0);
    let best_dates = if max_votes > 0 {
        dates
            .iter()
            .copied()
            .filter(|d| counts[d] == max_votes)
            .collect()
    } else {
        Vec::new()
    };

    AvailabilitySummary::Tallied(TallyBoard {
        dates,
        counts,
        max_votes,
        best_dates,
        response_count: participations.len(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn participation(name: &str, dates: &[&str]) -> EventParticipation {
        EventParticipation {
            id: Uuid::new_v4(),
            event: Uuid::new_v4(),
            participant_name: name.to_string(),
            selected_dates: Json(dates.iter().map(|d| d.to_string()).collect()),
            comment: None,
            created_at: Utc::now(),
        }
    }

    fn date(raw: &str) -> NaiveDate {
        parse_date(raw).unwrap()
    }

    fn options(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn no_options_is_distinct_from_no_votes() {
        assert_eq!(tally_availability(&[], &[]), AvailabilitySummary::NoOptions);

        let summary = tally_availability(&options(&["2026-09-05", "2026-09-01"]), &[]);
        assert_eq!(
            summary,
            AvailabilitySummary::NoResponses {
                dates: vec![date("2026-09-01"), date("2026-09-05")],
            }
        );
    }

    #[test]
    fn dates_are_sorted_by_calendar_value() {
        let opts = options(&["2026-12-03", "2026-02-10", "2026-07-01"]);
        let summary = tally_availability(&opts, &[participation("Ana", &["2026-07-01"])]);

        let AvailabilitySummary::Tallied(board) = summary else {
            panic!("expected a tallied board");
        };
        assert_eq!(
            board.dates,
            vec![date("2026-02-10"), date("2026-07-01"), date("2026-12-03")]
        );
    }

    #[test]
    fn counts_accumulate_and_unvoted_dates_stay_zero() {
        let opts = options(&["2026-09-01", "2026-09-02", "2026-09-03"]);
        let participations = vec![
            participation("Ana", &["2026-09-01", "2026-09-02"]),
            participation("Ben", &["2026-09-02"]),
            participation("Chloé", &["2026-09-02", "2026-09-01"]),
        ];

        let AvailabilitySummary::Tallied(board) = tally_availability(&opts, &participations)
        else {
            panic!("expected a tallied board");
        };

        assert_eq!(board.counts[&date("2026-09-01")], 2);
        assert_eq!(board.counts[&date("2026-09-02")], 3);
        assert_eq!(board.counts[&date("2026-09-03")], 0);
        assert_eq!(board.max_votes, 3);
        assert_eq!(board.best_dates, vec![date("2026-09-02")]);
        assert_eq!(board.response_count, 3);
    }

    #[test]
    fn ties_produce_multiple_best_dates() {
        let opts = options(&["2026-09-01", "2026-09-02"]);
        let participations = vec![
            participation("Ana", &["2026-09-01"]),
            participation("Ben", &["2026-09-02"]),
        ];

        let AvailabilitySummary::Tallied(board) = tally_availability(&opts, &participations)
        else {
            panic!("expected a tallied board");
        };

        assert_eq!(board.max_votes, 1);
        assert_eq!(
            board.best_dates,
            vec![date("2026-09-01"), date("2026-09-02")]
        );
    }

    #[test]
    fn stale_selected_dates_are_ignored() {
        // The stored response references a date the creator has since
        // removed from the options; it must not count anywhere.
        let opts = options(&["2026-09-01"]);
        let participations = vec![participation("Ana", &["2026-01-01", "2026-09-01"])];

        let AvailabilitySummary::Tallied(board) = tally_availability(&opts, &participations)
        else {
            panic!("expected a tallied board");
        };

        assert_eq!(board.counts.len(), 1);
        assert_eq!(board.counts[&date("2026-09-01")], 1);
    }

    #[test]
    fn all_zero_tally_has_no_winner() {
        // Responses exist, but none picked any of the current options.
        let opts = options(&["2026-09-01"]);
        let participations = vec![participation("Ana", &["2025-01-01"])];

        let AvailabilitySummary::Tallied(board) = tally_availability(&opts, &participations)
        else {
            panic!("expected a tallied board");
        };

        assert_eq!(board.max_votes, 0);
        assert!(board.best_dates.is_empty());
    }

    #[test]
    fn matrix_rows_follow_response_order_and_sorted_columns() {
        let opts = options(&["2026-09-02", "2026-09-01"]);
        let mut second = participation("Ben", &["2026-09-02"]);
        second.comment = Some("evenings only".to_string());
        let participations = vec![participation("Ana", &["2026-09-01"]), second];

        let AvailabilitySummary::Tallied(board) = tally_availability(&opts, &participations)
        else {
            panic!("expected a tallied board");
        };

        assert_eq!(board.rows.len(), 2);
        assert_eq!(board.rows[0].participant_name, "Ana");
        // Columns are the sorted dates: 09-01 then 09-02.
        assert_eq!(board.rows[0].cells, vec![true, false]);
        assert_eq!(board.rows[1].cells, vec![false, true]);
        assert_eq!(board.rows[1].comment.as_deref(), Some("evenings only"));
    }

    #[test]
    fn duplicate_date_in_a_response_counts_once() {
        let opts = options(&["2026-09-01"]);
        let participations = vec![participation("Ana", &["2026-09-01", "2026-09-01"])];

        let AvailabilitySummary::Tallied(board) = tally_availability(&opts, &participations)
        else {
            panic!("expected a tallied board");
        };

        assert_eq!(board.counts[&date("2026-09-01")], 1);
    }

    #[test]
    fn unparseable_options_are_dropped() {
        let opts = options(&["not-a-date", "2026-09-01"]);
        let summary = tally_availability(&opts, &[]);
        assert_eq!(
            summary,
            AvailabilitySummary::NoResponses {
                dates: vec![date("2026-09-01")],
            }
        );

        assert_eq!(
            tally_availability(&options(&["not-a-date"]), &[]),
            AvailabilitySummary::NoOptions
        );
    }
}
