/*
Aggregation over session and task records.
Module is pure: every function takes the records, a reference date and the
offset that defines "a day", and returns derived views. Nothing here touches
storage or the network.
*/

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate};
use serde::Serialize;

use crate::mapping::is_task_completed;
use crate::models::{Session, Task};

pub const UNCATEGORIZED: &str = "Uncategorized";
/// How many groups the focus breakdown shows.
pub const FOCUS_DISPLAY_LIMIT: usize = 8;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    Sunday,
    Monday,
}

/// Per-view knobs. The dashboard and analytics pages start weeks on
/// Sunday, the planner on Monday; both are kept as they are.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ViewConfig {
    pub week_start: WeekStart,
}

impl ViewConfig {
    pub const DASHBOARD: ViewConfig = ViewConfig {
        week_start: WeekStart::Sunday,
    };
    pub const ANALYTICS: ViewConfig = ViewConfig {
        week_start: WeekStart::Sunday,
    };
    pub const PLANNER: ViewConfig = ViewConfig {
        week_start: WeekStart::Monday,
    };

    pub fn by_name(name: &str) -> Option<ViewConfig> {
        match name {
            "dashboard" => Some(Self::DASHBOARD),
            "analytics" => Some(Self::ANALYTICS),
            "planner" => Some(Self::PLANNER),
            _ => None,
        }
    }
}

// --------------------------------------------------
// Day arithmetic
// --------------------------------------------------

/// Calendar day of `ts` in the given offset (time of day truncated).
pub fn local_day(ts: DateTime<FixedOffset>, tz: FixedOffset) -> NaiveDate {
    ts.with_timezone(&tz).date_naive()
}

pub fn is_same_day(a: DateTime<FixedOffset>, b: DateTime<FixedOffset>, tz: FixedOffset) -> bool {
    local_day(a, tz) == local_day(b, tz)
}

/// Half-open range of calendar days `[start, end)`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day < self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(|d| *d < self.end)
    }

    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days().max(0)
    }
}

pub fn day_period(day: NaiveDate) -> Period {
    Period {
        start: day,
        end: day + Duration::days(1),
    }
}

pub fn week_period(day: NaiveDate, week_start: WeekStart) -> Period {
    let back = match week_start {
        WeekStart::Sunday => day.weekday().num_days_from_sunday(),
        WeekStart::Monday => day.weekday().num_days_from_monday(),
    };
    let start = day - Duration::days(i64::from(back));
    Period {
        start,
        end: start + Duration::days(7),
    }
}

pub fn month_period(day: NaiveDate) -> Period {
    let start = day.with_day(1).unwrap_or(day);
    let end = if start.month() == 12 {
        NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
    };
    Period {
        start,
        end: end.unwrap_or(start + Duration::days(31)),
    }
}

pub fn year_period(day: NaiveDate) -> Period {
    let start = NaiveDate::from_ymd_opt(day.year(), 1, 1).unwrap_or(day);
    let end = NaiveDate::from_ymd_opt(day.year() + 1, 1, 1).unwrap_or(start + Duration::days(366));
    Period { start, end }
}

// --------------------------------------------------
// Totals
// --------------------------------------------------

pub fn sessions_on_day(sessions: &[Session], day: NaiveDate, tz: FixedOffset) -> Vec<&Session> {
    sessions
        .iter()
        .filter(|s| !s.is_active && local_day(s.timestamp(), tz) == day)
        .collect()
}

/// Sum of finished session durations (seconds) whose timestamp falls in `period`.
pub fn total_seconds(sessions: &[Session], period: Period, tz: FixedOffset) -> i64 {
    sessions
        .iter()
        .filter(|s| !s.is_active && period.contains(local_day(s.timestamp(), tz)))
        .map(Session::duration_seconds)
        .sum()
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PeriodTotals {
    pub today: i64,
    pub week: i64,
    pub month: i64,
    pub year: i64,
}

pub fn period_totals(
    sessions: &[Session],
    today: NaiveDate,
    tz: FixedOffset,
    view: ViewConfig,
) -> PeriodTotals {
    PeriodTotals {
        today: total_seconds(sessions, day_period(today), tz),
        week: total_seconds(sessions, week_period(today, view.week_start), tz),
        month: total_seconds(sessions, month_period(today), tz),
        year: total_seconds(sessions, year_period(today), tz),
    }
}

// --------------------------------------------------
// Streaks
// --------------------------------------------------

fn focus_days(sessions: &[Session], tz: FixedOffset) -> BTreeSet<NaiveDate> {
    sessions
        .iter()
        .filter(|s| s.is_focus())
        .map(|s| local_day(s.timestamp(), tz))
        .collect()
}

/// Days in a row, walking back from `reference`, with at least one focus
/// session. A reference day without one gives 0.
pub fn current_streak(sessions: &[Session], reference: NaiveDate, tz: FixedOffset) -> u32 {
    let days = focus_days(sessions, tz);
    let mut streak = 0;
    let mut cursor = reference;
    while days.contains(&cursor) {
        streak += 1;
        cursor = match cursor.pred_opt() {
            Some(prev) => prev,
            None => break,
        };
    }
    streak
}

/// Longest run of consecutive focus days inside `period`.
pub fn longest_streak(sessions: &[Session], period: Period, tz: FixedOffset) -> u32 {
    let days: Vec<NaiveDate> = focus_days(sessions, tz)
        .into_iter()
        .filter(|d| period.contains(*d))
        .collect();

    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;
    for day in days {
        run = match prev {
            Some(p) if (day - p).num_days() == 1 => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(day);
    }
    best
}

// --------------------------------------------------
// Heatmaps
// --------------------------------------------------

/// Year heatmap intensity for a day's focused seconds:
///     0          -> 0
///     < 30 min   -> 1
///     < 60 min   -> 2
///     < 120 min  -> 3
///     otherwise  -> 4
pub fn heatmap_level(seconds: i64) -> u8 {
    if seconds <= 0 {
        0
    } else if seconds < 1800 {
        1
    } else if seconds < 3600 {
        2
    } else if seconds < 7200 {
        3
    } else {
        4
    }
}

/// Coarser scale used by the small month calendar: 0 / <30m / <60m / more.
pub fn mini_calendar_level(seconds: i64) -> u8 {
    if seconds <= 0 {
        0
    } else if seconds < 1800 {
        1
    } else if seconds < 3600 {
        2
    } else {
        3
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DayActivity {
    pub date: NaiveDate,
    pub session_count: usize,
    pub total_seconds: i64,
    pub level: u8,
}

/// One cell per day in `period`, leveled with `level_of`.
pub fn daily_activity(
    sessions: &[Session],
    period: Period,
    tz: FixedOffset,
    level_of: fn(i64) -> u8,
) -> Vec<DayActivity> {
    let mut per_day: HashMap<NaiveDate, (usize, i64)> = HashMap::new();
    for s in sessions.iter().filter(|s| !s.is_active) {
        let day = local_day(s.timestamp(), tz);
        if period.contains(day) {
            let slot = per_day.entry(day).or_insert((0, 0));
            slot.0 += 1;
            slot.1 += s.duration_seconds();
        }
    }

    period
        .days()
        .map(|date| {
            let (session_count, total_seconds) = per_day.get(&date).copied().unwrap_or((0, 0));
            // any session at all lights the cell, even a zero-length one
            let level = if session_count == 0 {
                0
            } else {
                level_of(total_seconds).max(1)
            };
            DayActivity {
                date,
                session_count,
                total_seconds,
                level,
            }
        })
        .collect()
}

pub fn calendar_heatmap(sessions: &[Session], period: Period, tz: FixedOffset) -> Vec<DayActivity> {
    daily_activity(sessions, period, tz, heatmap_level)
}

pub fn mini_calendar(sessions: &[Session], month: Period, tz: FixedOffset) -> Vec<DayActivity> {
    daily_activity(sessions, month, tz, mini_calendar_level)
}

// --------------------------------------------------
// Focus breakdown
// --------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FocusGroup {
    pub label: String,
    pub count: usize,
    pub total_seconds: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FocusBreakdown {
    /// Every group, most time first; ties keep first-seen order.
    pub groups: Vec<FocusGroup>,
    /// Sum over all groups, not just the displayed ones.
    pub total_seconds: i64,
}

impl FocusBreakdown {
    pub fn top(&self, n: usize) -> &[FocusGroup] {
        &self.groups[..self.groups.len().min(n)]
    }

    pub fn displayed(&self) -> &[FocusGroup] {
        self.top(FOCUS_DISPLAY_LIMIT)
    }

    pub fn share_percent(&self, group: &FocusGroup) -> f64 {
        if self.total_seconds <= 0 {
            return 0.0;
        }
        100.0 * group.total_seconds as f64 / self.total_seconds as f64
    }
}

// Group finished sessions under one or more labels each.
fn group_sessions<'a, F>(sessions: &'a [Session], mut labels_of: F) -> FocusBreakdown
where
    F: FnMut(&'a Session) -> Vec<String>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<FocusGroup> = Vec::new();
    let mut total = 0;

    for s in sessions.iter().filter(|s| !s.is_active) {
        let secs = s.duration_seconds();
        total += secs;
        for label in labels_of(s) {
            let i = *index.entry(label.clone()).or_insert_with(|| {
                groups.push(FocusGroup {
                    label,
                    count: 0,
                    total_seconds: 0,
                });
                groups.len() - 1
            });
            groups[i].count += 1;
            groups[i].total_seconds += secs;
        }
    }

    // stable sort keeps encounter order for ties
    groups.sort_by(|a, b| b.total_seconds.cmp(&a.total_seconds));
    FocusBreakdown {
        groups,
        total_seconds: total,
    }
}

fn session_title(s: &Session) -> Option<String> {
    s.title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Label = linked task's title, else the session's own title, else "Uncategorized".
pub fn focus_by_task(sessions: &[Session], tasks: &[Task]) -> FocusBreakdown {
    let titles: HashMap<&str, &str> = tasks
        .iter()
        .map(|t| (t.id.as_str(), t.title.as_str()))
        .collect();

    group_sessions(sessions, |s| {
        let label = s
            .task_id
            .as_deref()
            .and_then(|id| titles.get(id))
            .map(|t| t.to_string())
            .or_else(|| session_title(s))
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        vec![label]
    })
}

/// Each of the linked task's tags gets the full session time.
/// Sessions without a tagged task land in "Uncategorized".
pub fn focus_by_tag(sessions: &[Session], tasks: &[Task]) -> FocusBreakdown {
    let tags: HashMap<&str, &[String]> = tasks
        .iter()
        .map(|t| (t.id.as_str(), t.tags.as_slice()))
        .collect();

    group_sessions(sessions, |s| {
        match s.task_id.as_deref().and_then(|id| tags.get(id)) {
            Some(list) if !list.is_empty() => list.to_vec(),
            _ => vec![UNCATEGORIZED.to_string()],
        }
    })
}

// --------------------------------------------------
// Tasks
// --------------------------------------------------

pub fn tasks_completed_on(tasks: &[Task], day: NaiveDate, tz: FixedOffset) -> usize {
    tasks
        .iter()
        .filter(|t| is_task_completed(t))
        .filter(|t| t.completed_at.is_some_and(|at| local_day(at, tz) == day))
        .count()
}

pub fn overdue_count(tasks: &[Task], now: DateTime<FixedOffset>) -> usize {
    tasks.iter().filter(|t| t.is_overdue(now)).count()
}

// --------------------------------------------------
// Dashboard
// --------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub date: NaiveDate,
    pub week_start: WeekStart,
    pub totals: PeriodTotals,
    pub sessions_today: usize,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub tasks_completed_today: usize,
    pub overdue_tasks: usize,
    pub top_focus: Vec<FocusGroup>,
    pub focus_total_seconds: i64,
    pub heatmap: Vec<DayActivity>,
}

pub fn dashboard_summary(
    tasks: &[Task],
    sessions: &[Session],
    today: NaiveDate,
    now: DateTime<FixedOffset>,
    view: ViewConfig,
) -> DashboardSummary {
    let tz = *now.offset();
    let year = year_period(today);
    let breakdown = focus_by_task(sessions, tasks);

    DashboardSummary {
        date: today,
        week_start: view.week_start,
        totals: period_totals(sessions, today, tz, view),
        sessions_today: sessions_on_day(sessions, today, tz).len(),
        current_streak: current_streak(sessions, today, tz),
        longest_streak: longest_streak(sessions, year, tz),
        tasks_completed_today: tasks_completed_on(tasks, today, tz),
        overdue_tasks: overdue_count(tasks, now),
        top_focus: breakdown.displayed().to_vec(),
        focus_total_seconds: breakdown.total_seconds,
        heatmap: calendar_heatmap(sessions, year, tz),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SessionCategory, SessionEnd, TaskDraft, TaskStatus};
    use chrono::TimeZone;

    fn tz() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn at(m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        tz().with_ymd_and_hms(2024, m, d, h, min, 0).unwrap()
    }

    fn finished(id: &str, start: DateTime<FixedOffset>, secs: i64) -> Session {
        let mut s = Session::start(
            id.into(),
            "u".into(),
            SessionCategory::DeepWork,
            None,
            None,
            start,
        );
        s.end(start + Duration::seconds(secs), SessionEnd::default());
        s
    }

    fn on_task(task_id: &str, secs: i64) -> Session {
        let mut s = finished("s", at(3, 1, 9, 0), secs);
        s.task_id = Some(task_id.into());
        s
    }

    fn task(id: &str, title: &str, tags: &[&str]) -> Task {
        let mut draft = TaskDraft::titled(title);
        draft.tags = tags.iter().map(|t| t.to_string()).collect();
        draft.into_task(id.into(), "u".into(), at(1, 1, 0, 0))
    }

    fn sessions_on(days: &[(u32, u32)]) -> Vec<Session> {
        days.iter()
            .enumerate()
            .map(|(i, (m, d))| finished(&format!("s{i}"), at(*m, *d, 10, 0), 1800))
            .collect()
    }

    #[test]
    fn same_day_uses_the_offset() {
        let late = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 1, 23, 30, 0)
            .unwrap();
        // 23:30 UTC is already the next day at +02:00
        assert_eq!(local_day(late, tz()), day(3, 2));
        assert!(is_same_day(late, at(3, 2, 8, 0), tz()));
        assert!(!is_same_day(late, at(3, 1, 8, 0), tz()));
    }

    #[test]
    fn week_start_is_per_view() {
        // 2024-03-06 is a Wednesday
        let sunday = week_period(day(3, 6), ViewConfig::DASHBOARD.week_start);
        assert_eq!(sunday.start, day(3, 3));
        assert_eq!(sunday.end, day(3, 10));

        let monday = week_period(day(3, 6), ViewConfig::PLANNER.week_start);
        assert_eq!(monday.start, day(3, 4));

        // a Sunday belongs to the week it starts, or the one it ends
        assert_eq!(week_period(day(3, 10), WeekStart::Sunday).start, day(3, 10));
        assert_eq!(week_period(day(3, 10), WeekStart::Monday).start, day(3, 4));
    }

    #[test]
    fn month_and_year_ranges() {
        let dec = month_period(day(12, 15));
        assert_eq!(dec.start, day(12, 1));
        assert_eq!(dec.end, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(month_period(day(2, 10)).len_days(), 29);
        assert_eq!(year_period(day(7, 4)).len_days(), 366);
    }

    #[test]
    fn totals_respect_half_open_periods() {
        let sessions = vec![
            finished("a", at(3, 3, 9, 0), 600),  // Sunday
            finished("b", at(3, 4, 9, 0), 1200), // Monday
            finished("c", at(3, 9, 9, 0), 300),  // Saturday
            finished("d", at(3, 10, 9, 0), 60),  // next Sunday
            finished("e", at(2, 28, 9, 0), 30),
        ];
        let sunday = period_totals(&sessions, day(3, 6), tz(), ViewConfig::DASHBOARD);
        assert_eq!(sunday.week, 2100);
        assert_eq!(sunday.month, 2160);
        assert_eq!(sunday.year, 2190);
        assert_eq!(sunday.today, 0);

        let monday = period_totals(&sessions, day(3, 6), tz(), ViewConfig::PLANNER);
        assert_eq!(monday.week, 1560);
    }

    #[test]
    fn active_sessions_do_not_count() {
        let mut running = Session::start(
            "r".into(),
            "u".into(),
            SessionCategory::DeepWork,
            None,
            None,
            at(3, 6, 9, 0),
        );
        running.duration = Some(5000);
        let sessions = vec![running];
        assert_eq!(total_seconds(&sessions, day_period(day(3, 6)), tz()), 0);
        assert_eq!(current_streak(&sessions, day(3, 6), tz()), 0);
    }

    #[test]
    fn current_streak_is_a_backward_scan() {
        let sessions = sessions_on(&[(3, 1), (3, 2), (3, 3), (3, 6), (3, 7), (3, 8)]);
        assert_eq!(current_streak(&sessions, day(3, 8), tz()), 3);
        assert_eq!(current_streak(&sessions, day(3, 3), tz()), 3);
        // nothing on the reference day
        assert_eq!(current_streak(&sessions, day(3, 9), tz()), 0);
        assert_eq!(current_streak(&[], day(3, 9), tz()), 0);
    }

    #[test]
    fn break_sessions_do_not_keep_a_streak() {
        let mut sessions = sessions_on(&[(3, 1), (3, 3)]);
        let mut pause = finished("p", at(3, 2, 12, 0), 900);
        pause.category = SessionCategory::Break;
        sessions.push(pause);
        assert_eq!(current_streak(&sessions, day(3, 3), tz()), 1);
    }

    #[test]
    fn current_and_longest_streak_are_different_questions() {
        // two 3-day runs with a 2-day gap
        let mut days = vec![(3, 1), (3, 2), (3, 3), (3, 6), (3, 7), (3, 8)];
        let year = year_period(day(3, 8));
        let sessions = sessions_on(&days);
        assert_eq!(current_streak(&sessions, day(3, 8), tz()), 3);
        assert_eq!(longest_streak(&sessions, year, tz()), 3);

        // stretch the first run to five days
        days.extend([(2, 28), (2, 29)]);
        let sessions = sessions_on(&days);
        assert_eq!(current_streak(&sessions, day(3, 8), tz()), 3);
        assert_eq!(longest_streak(&sessions, year, tz()), 5);
    }

    #[test]
    fn longest_streak_ignores_duplicates_and_other_years() {
        let sessions = sessions_on(&[(1, 1), (1, 1), (1, 2), (5, 5)]);
        assert_eq!(longest_streak(&sessions, year_period(day(6, 1)), tz()), 2);
        assert_eq!(longest_streak(&[], year_period(day(6, 1)), tz()), 0);

        let mut old = finished("old", tz().with_ymd_and_hms(2023, 12, 31, 10, 0, 0).unwrap(), 60);
        old.category = SessionCategory::Learning;
        let mut with_old = sessions.clone();
        with_old.push(old);
        assert_eq!(longest_streak(&with_old, year_period(day(6, 1)), tz()), 2);
    }

    #[test]
    fn heatmap_thresholds() {
        let inputs = [0, 1799, 1800, 3599, 3600, 7199, 7200, 10000];
        let four: Vec<u8> = inputs.iter().map(|s| heatmap_level(*s)).collect();
        assert_eq!(four, vec![0, 1, 2, 2, 3, 3, 4, 4]);

        let three: Vec<u8> = inputs.iter().map(|s| mini_calendar_level(*s)).collect();
        assert_eq!(three, vec![0, 1, 2, 2, 3, 3, 3, 3]);
    }

    #[test]
    fn calendar_cells_cover_every_day() {
        let sessions = vec![
            finished("a", at(3, 2, 9, 0), 1000),
            finished("b", at(3, 2, 14, 0), 1000),
            finished("c", at(3, 5, 9, 0), 8000),
        ];
        let month = month_period(day(3, 1));
        let cells = mini_calendar(&sessions, month, tz());
        assert_eq!(cells.len(), 31);
        assert_eq!(cells[1].session_count, 2);
        assert_eq!(cells[1].total_seconds, 2000);
        assert_eq!(cells[1].level, 2);
        assert_eq!(cells[4].level, 3);
        assert_eq!(cells[0].level, 0);

        let heat = calendar_heatmap(&sessions, month, tz());
        assert_eq!(heat[4].level, 4);
    }

    #[test]
    fn zero_length_session_still_marks_the_day() {
        let sessions = vec![finished("a", at(3, 2, 9, 0), 0)];
        let month = month_period(day(3, 1));

        let heat = calendar_heatmap(&sessions, month, tz());
        assert_eq!(heat[1].session_count, 1);
        assert_eq!(heat[1].total_seconds, 0);
        assert_eq!(heat[1].level, 1);
        assert_eq!(heat[2].level, 0);

        let mini = mini_calendar(&sessions, month, tz());
        assert_eq!(mini[1].level, 1);

        // the pure bucket functions still map zero seconds to 0
        assert_eq!(heatmap_level(0), 0);
        assert_eq!(mini_calendar_level(0), 0);
    }

    #[test]
    fn focus_by_task_groups_and_sorts() {
        let tasks = vec![task("a", "A", &[]), task("b", "B", &[])];
        let sessions = vec![on_task("a", 100), on_task("b", 200), on_task("a", 50)];

        let breakdown = focus_by_task(&sessions, &tasks);
        assert_eq!(
            breakdown.groups,
            vec![
                FocusGroup { label: "B".into(), count: 1, total_seconds: 200 },
                FocusGroup { label: "A".into(), count: 2, total_seconds: 150 },
            ]
        );
        assert_eq!(breakdown.total_seconds, 350);
    }

    #[test]
    fn focus_labels_fall_back_and_ties_keep_order() {
        let tasks = vec![task("a", "Write", &[])];
        let mut titled = on_task("missing", 60);
        titled.title = Some("Standup".into());
        let sessions = vec![on_task("zzz", 60), titled, on_task("a", 60)];

        let breakdown = focus_by_task(&sessions, &tasks);
        let labels: Vec<&str> = breakdown.groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec![UNCATEGORIZED, "Standup", "Write"]);
    }

    #[test]
    fn display_cap_keeps_uncapped_total() {
        let tasks: Vec<Task> = (0..10)
            .map(|i| task(&format!("t{i}"), &format!("Task {i}"), &[]))
            .collect();
        let sessions: Vec<Session> = (0..10)
            .map(|i| on_task(&format!("t{i}"), 100 * (i + 1)))
            .collect();

        let breakdown = focus_by_task(&sessions, &tasks);
        assert_eq!(breakdown.displayed().len(), FOCUS_DISPLAY_LIMIT);
        assert_eq!(breakdown.displayed()[0].label, "Task 9");
        assert_eq!(breakdown.total_seconds, 5500);
        let share = breakdown.share_percent(&breakdown.groups[0]);
        assert!((share - 100.0 * 1000.0 / 5500.0).abs() < 1e-9);
    }

    #[test]
    fn focus_by_tag_splits_across_tags() {
        let tasks = vec![task("a", "A", &["work", "deep"]), task("b", "B", &[])];
        let sessions = vec![on_task("a", 300), on_task("b", 100), on_task("a", 60)];
        let breakdown = focus_by_tag(&sessions, &tasks);
        let flat: Vec<(&str, usize, i64)> = breakdown
            .groups
            .iter()
            .map(|g| (g.label.as_str(), g.count, g.total_seconds))
            .collect();
        assert_eq!(
            flat,
            vec![("work", 2, 360), ("deep", 2, 360), (UNCATEGORIZED, 1, 100)]
        );
        assert_eq!(breakdown.total_seconds, 460);
    }

    #[test]
    fn dashboard_summary_pulls_it_together() {
        let now = at(3, 8, 18, 0);
        let mut done = task("a", "A", &[]);
        done.set_status(TaskStatus::Completed, at(3, 8, 11, 0));
        let mut late = task("b", "B", &[]);
        late.deadline = Some(at(3, 7, 9, 0));

        let mut sessions = sessions_on(&[(3, 6), (3, 7), (3, 8)]);
        sessions[2].task_id = Some("a".into());

        let summary = dashboard_summary(&[done, late], &sessions, day(3, 8), now, ViewConfig::DASHBOARD);
        assert_eq!(summary.totals.today, 1800);
        assert_eq!(summary.sessions_today, 1);
        assert_eq!(summary.current_streak, 3);
        assert_eq!(summary.longest_streak, 3);
        assert_eq!(summary.tasks_completed_today, 1);
        assert_eq!(summary.overdue_tasks, 1);
        assert_eq!(summary.top_focus[0].label, UNCATEGORIZED);
        assert_eq!(summary.focus_total_seconds, 5400);
        assert_eq!(summary.heatmap.len(), 366);
    }
}
