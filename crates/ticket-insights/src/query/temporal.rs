//! Temporal window extraction from free-text questions.
//!
//! A fixed, ordered rule table is evaluated against the lowercased question;
//! the first rule that yields a window wins.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

use crate::analytics::dates::parse_br_date;
use crate::types::TemporalWindow;

static LAST_N_DAYS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:últimos|ultimos|last)\s+(\d{1,3})\s+(?:dias|days)")
        .expect("last-n-days regex is valid")
});
static BETWEEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:entre|between)\s+(\d{1,2}/\d{1,2}/\d{4})\s+(?:e|and)\s+(\d{1,2}/\d{1,2}/\d{4})",
    )
    .expect("between regex is valid")
});

/// One entry of the rule table.
pub struct PeriodRule {
    pub name: &'static str,
    resolve: fn(&str, NaiveDateTime) -> Option<TemporalWindow>,
}

impl PeriodRule {
    /// Apply this rule alone to an already lowercased question.
    pub fn apply(&self, question: &str, now: NaiveDateTime) -> Option<TemporalWindow> {
        (self.resolve)(question, now)
    }
}

/// Rules in priority order.
pub static PERIOD_RULES: &[PeriodRule] = &[
    PeriodRule { name: "last_week", resolve: last_week },
    PeriodRule { name: "last_n_days", resolve: last_n_days },
    PeriodRule { name: "this_month", resolve: this_month },
    PeriodRule { name: "last_month", resolve: last_month },
    PeriodRule { name: "between_dates", resolve: between_dates },
];

/// Window mentioned by `question`, relative to the local wall clock.
pub fn detect_period(question: &str) -> Option<TemporalWindow> {
    detect_period_at(question, Local::now().naive_local())
}

/// Window mentioned by `question`, relative to `now`. `None` means no filter.
pub fn detect_period_at(question: &str, now: NaiveDateTime) -> Option<TemporalWindow> {
    let q = question.to_lowercase();
    PERIOD_RULES.iter().find_map(|rule| rule.apply(&q, now))
}

fn contains_any(q: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| q.contains(p))
}

fn last_week(q: &str, now: NaiveDateTime) -> Option<TemporalWindow> {
    contains_any(q, &["última semana", "ultima semana", "last week"]).then(|| TemporalWindow {
        from: now - Duration::days(7),
        to: now,
    })
}

fn last_n_days(q: &str, now: NaiveDateTime) -> Option<TemporalWindow> {
    let caps = LAST_N_DAYS_RE.captures(q)?;
    let days: i64 = caps[1].parse().ok()?;
    Some(TemporalWindow {
        from: now - Duration::days(days),
        to: now,
    })
}

fn this_month(q: &str, now: NaiveDateTime) -> Option<TemporalWindow> {
    if !contains_any(q, &["este mês", "este mes", "esse mês", "esse mes", "this month"]) {
        return None;
    }
    let first = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)?;
    Some(TemporalWindow {
        from: first.and_hms_opt(0, 0, 0)?,
        to: now,
    })
}

fn last_month(q: &str, now: NaiveDateTime) -> Option<TemporalWindow> {
    if !contains_any(q, &["mês passado", "mes passado", "last month"]) {
        return None;
    }
    let first_of_current = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)?;
    let last_of_previous = first_of_current.pred_opt()?;
    let first_of_previous = last_of_previous.with_day(1)?;
    Some(TemporalWindow {
        from: first_of_previous.and_hms_opt(0, 0, 0)?,
        to: end_of_day(last_of_previous)?,
    })
}

fn between_dates(q: &str, _now: NaiveDateTime) -> Option<TemporalWindow> {
    let caps = BETWEEN_RE.captures(q)?;
    let from = parse_br_date(&caps[1])?;
    let to = parse_br_date(&caps[2])?;
    Some(TemporalWindow {
        from,
        to: end_of_day(to.date())?,
    })
}

fn end_of_day(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_opt(23, 59, 59)
}
