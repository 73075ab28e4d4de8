/*
Habit records and the streak engine.
All dates are calendar days; callers normalize timestamps with `date_naive()`
in their own offset before handing them in.
*/

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_COMPLETION_WINDOW: u32 = 30;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HabitFrequency {
    #[default]
    Daily,
    Weekly,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionEntry {
    pub date: NaiveDate,
    pub completed: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Habit {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub frequency: HabitFrequency,
    // weekday indices, 0 = Sunday
    #[serde(default)]
    pub target_days: BTreeSet<u8>,
    #[serde(default)]
    pub completion_history: Vec<CompletionEntry>,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default)]
    pub total_completions: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HabitDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub frequency: HabitFrequency,
    #[serde(default)]
    pub target_days: BTreeSet<u8>,
}

impl HabitDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::new("title required"));
        }
        if self.target_days.iter().any(|d| *d > 6) {
            return Err(ValidationError::new("target days must be 0..=6"));
        }
        if self.frequency != HabitFrequency::Daily && self.target_days.is_empty() {
            return Err(ValidationError::new(
                "weekly and custom habits need at least one target day",
            ));
        }
        Ok(())
    }
}

/// 0 = Sunday .. 6 = Saturday
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

impl Habit {
    pub fn new(id: String, user_id: String, draft: HabitDraft, now: DateTime<FixedOffset>) -> Self {
        Self {
            id,
            user_id,
            title: draft.title.trim().to_string(),
            description: draft.description,
            frequency: draft.frequency,
            target_days: draft.target_days,
            completion_history: Vec::new(),
            current_streak: 0,
            longest_streak: 0,
            total_completions: 0,
            created_at: Some(now),
        }
    }

    /// Record a completion for `date`, updating an existing entry in place.
    ///
    /// Every call counts towards `total_completions`, repeats on the same
    /// day included. `notes` replaces the entry's notes, so `None` clears them.
    pub fn mark_complete(&mut self, date: NaiveDate, notes: Option<String>, today: NaiveDate) {
        match self.completion_history.iter_mut().find(|e| e.date == date) {
            Some(entry) => {
                entry.completed = true;
                entry.notes = notes;
            }
            None => self.completion_history.push(CompletionEntry {
                date,
                completed: true,
                notes,
            }),
        }
        self.total_completions += 1;
        self.refresh_streak(today);
    }

    pub fn mark_incomplete(&mut self, date: NaiveDate, today: NaiveDate) {
        if let Some(entry) = self.completion_history.iter_mut().find(|e| e.date == date) {
            if entry.completed {
                entry.completed = false;
                self.total_completions = self.total_completions.saturating_sub(1);
            }
        }
        self.refresh_streak(today);
    }

    /// Consecutive completed days ending today or yesterday.
    ///
    /// Empty history, or a latest completion older than yesterday, gives 0.
    /// Entries dated after `today` are ignored.
    pub fn calculate_streak(&self, today: NaiveDate) -> u32 {
        let mut days: Vec<NaiveDate> = self
            .completion_history
            .iter()
            .filter(|e| e.completed && e.date <= today)
            .map(|e| e.date)
            .collect();
        days.sort_unstable_by(|a, b| b.cmp(a));
        days.dedup();

        let Some(&latest) = days.first() else {
            return 0;
        };
        if (today - latest).num_days() > 1 {
            return 0;
        }

        let mut streak = 1;
        let mut prev = latest;
        for day in days.into_iter().skip(1) {
            if (prev - day).num_days() != 1 {
                break;
            }
            streak += 1;
            prev = day;
        }
        streak
    }

    /// Recompute `current_streak`; `longest_streak` never decreases.
    pub fn refresh_streak(&mut self, today: NaiveDate) {
        self.current_streak = self.calculate_streak(today);
        self.longest_streak = self.longest_streak.max(self.current_streak);
    }

    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        match self.frequency {
            HabitFrequency::Daily => true,
            HabitFrequency::Weekly | HabitFrequency::Custom => {
                self.target_days.contains(&weekday_index(date))
            }
        }
    }

    pub fn is_due_today(&self, today: NaiveDate) -> bool {
        self.is_due_on(today)
    }

    pub fn is_completed_on(&self, date: NaiveDate) -> bool {
        self.completion_history
            .iter()
            .any(|e| e.date == date && e.completed)
    }

    /// Percentage of the trailing `window_days` (today included) that were completed.
    pub fn completion_rate(&self, today: NaiveDate, window_days: u32) -> u32 {
        if window_days == 0 {
            return 0;
        }
        let first = today
            .checked_sub_signed(chrono::Duration::days(i64::from(window_days) - 1))
            .unwrap_or(NaiveDate::MIN);
        let done = self
            .completion_history
            .iter()
            .filter(|e| e.completed && e.date >= first && e.date <= today)
            .count();
        (100.0 * done as f64 / f64::from(window_days)).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn habit(frequency: HabitFrequency, target_days: &[u8]) -> Habit {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 1, 8, 0, 0)
            .unwrap();
        Habit::new(
            "h1".into(),
            "u1".into(),
            HabitDraft {
                title: "Stretch".into(),
                description: None,
                frequency,
                target_days: target_days.iter().copied().collect(),
            },
            now,
        )
    }

    #[test]
    fn empty_history_has_no_streak() {
        let h = habit(HabitFrequency::Daily, &[]);
        assert_eq!(h.calculate_streak(day(10)), 0);
    }

    #[test]
    fn streak_counts_back_from_today_or_yesterday() {
        let mut h = habit(HabitFrequency::Daily, &[]);
        for d in [6, 7, 8, 9] {
            h.mark_complete(day(d), None, day(9));
        }
        assert_eq!(h.current_streak, 4);

        // yesterday still counts
        assert_eq!(h.calculate_streak(day(10)), 4);
        // two days later the streak is gone
        assert_eq!(h.calculate_streak(day(11)), 0);
    }

    #[test]
    fn streak_stops_at_first_gap() {
        let mut h = habit(HabitFrequency::Daily, &[]);
        for d in [1, 2, 3, 5, 6] {
            h.mark_complete(day(d), None, day(d));
        }
        assert_eq!(h.current_streak, 2);
        assert_eq!(h.longest_streak, 3);
    }

    #[test]
    fn reset_law_by_gap_length() {
        for k in 0..5u32 {
            let mut h = habit(HabitFrequency::Daily, &[]);
            h.mark_complete(day(20 - k), None, day(20));
            if k > 1 {
                assert_eq!(h.current_streak, 0, "k = {k}");
            } else {
                assert!(h.current_streak >= 1, "k = {k}");
            }
        }
    }

    #[test]
    fn marking_same_day_twice_updates_in_place() {
        let mut h = habit(HabitFrequency::Daily, &[]);
        h.mark_complete(day(3), None, day(3));
        h.mark_complete(day(3), Some("felt good".into()), day(3));
        assert_eq!(h.completion_history.len(), 1);
        assert_eq!(h.completion_history[0].notes.as_deref(), Some("felt good"));
        // each mark counts, even on a day already completed
        assert_eq!(h.total_completions, 2);
        assert_eq!(h.current_streak, 1);
    }

    #[test]
    fn marking_again_without_notes_clears_them() {
        let mut h = habit(HabitFrequency::Daily, &[]);
        h.mark_complete(day(3), Some("felt good".into()), day(3));
        h.mark_complete(day(3), None, day(3));
        assert_eq!(h.completion_history.len(), 1);
        assert!(h.completion_history[0].completed);
        assert_eq!(h.completion_history[0].notes, None);
    }

    #[test]
    fn mark_incomplete_decrements_and_keeps_longest() {
        let mut h = habit(HabitFrequency::Daily, &[]);
        h.mark_complete(day(2), None, day(3));
        h.mark_complete(day(3), None, day(3));
        assert_eq!(h.longest_streak, 2);

        h.mark_incomplete(day(3), day(3));
        assert_eq!(h.total_completions, 1);
        assert_eq!(h.current_streak, 1);
        assert_eq!(h.longest_streak, 2);
        assert!(!h.is_completed_on(day(3)));

        // unknown date and repeat calls never go below zero
        h.mark_incomplete(day(20), day(3));
        h.mark_incomplete(day(2), day(3));
        h.mark_incomplete(day(2), day(3));
        assert_eq!(h.total_completions, 0);
        assert_eq!(h.current_streak, 0);
    }

    #[test]
    fn due_days() {
        assert!(habit(HabitFrequency::Daily, &[]).is_due_today(day(4)));

        // 2024-06-03 is a Monday
        let weekly = habit(HabitFrequency::Weekly, &[1, 3]);
        assert_eq!(weekday_index(day(3)), 1);
        assert!(weekly.is_due_today(day(3)));
        assert!(!weekly.is_due_today(day(4)));
        assert!(weekly.is_due_today(day(5)));
        assert!(!weekly.is_due_today(day(2)));
    }

    #[test]
    fn completion_rate_over_window() {
        let mut h = habit(HabitFrequency::Daily, &[]);
        for d in [1, 10, 20, 29, 30] {
            h.mark_complete(day(d), None, day(30));
        }
        // window 2024-06-01..=06-30 holds all five
        assert_eq!(h.completion_rate(day(30), DEFAULT_COMPLETION_WINDOW), 17);
        // last 7 days: 29th and 30th
        assert_eq!(h.completion_rate(day(30), 7), 29);
        assert_eq!(h.completion_rate(day(30), 0), 0);
    }

    #[test]
    fn completion_rate_with_huge_window_does_not_overflow() {
        let mut h = habit(HabitFrequency::Daily, &[]);
        h.mark_complete(day(30), None, day(30));
        assert_eq!(h.completion_rate(day(30), u32::MAX), 0);
        assert_eq!(h.completion_rate(NaiveDate::MIN, 2), 0);
    }

    #[test]
    fn draft_validation() {
        let mut draft = HabitDraft {
            title: "Run".into(),
            frequency: HabitFrequency::Weekly,
            ..Default::default()
        };
        assert!(draft.validate().is_err());
        draft.target_days.insert(7);
        assert!(draft.validate().is_err());
        draft.target_days = [0u8, 6].into_iter().collect();
        assert!(draft.validate().is_ok());
    }
}
