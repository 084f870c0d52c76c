//! Argument parsing and table rows

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde_json::{json, Value};
use tabled::Tabled;

/// RFC 3339 timestamp or raw epoch milliseconds
pub fn parse_time(s: &str) -> Result<i64> {
    if let Ok(ms) = s.parse::<i64>() {
        return Ok(ms);
    }
    let dt = DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid time '{}', expected RFC 3339 or epoch ms", s))?;
    Ok(dt.timestamp_millis())
}

pub fn fmt_time(value: &Value) -> String {
    value
        .as_i64()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

const WEEKDAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

/// `mon=09:00-17:00` -> working hours entry (weekday 0 = Monday)
pub fn parse_working_hours(s: &str) -> Result<Value> {
    let (day, window) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected DAY=HH:MM-HH:MM, got '{}'", s))?;
    let weekday = WEEKDAYS
        .iter()
        .position(|d| d.eq_ignore_ascii_case(day.trim()))
        .ok_or_else(|| anyhow!("Unknown weekday '{}'", day))?;
    let (start, end) = window
        .split_once('-')
        .ok_or_else(|| anyhow!("Expected HH:MM-HH:MM, got '{}'", window))?;

    let start_minute = parse_minute(start)?;
    let end_minute = match end.trim() {
        "24:00" => 24 * 60,
        other => parse_minute(other)?,
    };
    if start_minute >= end_minute {
        bail!("Window '{}' ends before it starts", window);
    }

    Ok(json!({
        "weekday": weekday,
        "start_minute": start_minute,
        "end_minute": end_minute,
    }))
}

fn parse_minute(s: &str) -> Result<u32> {
    let t = NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .with_context(|| format!("Invalid time of day '{}'", s))?;
    Ok(t.hour() * 60 + t.minute())
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

#[derive(Tabled)]
pub struct UserRow {
    id: String,
    email: String,
    name: String,
    role: String,
    utc_offset: String,
}

impl From<&Value> for UserRow {
    fn from(v: &Value) -> Self {
        Self {
            id: text(&v["id"]),
            email: text(&v["email"]),
            name: text(&v["name"]),
            role: text(&v["role"]),
            utc_offset: text(&v["utc_offset_minutes"]),
        }
    }
}

#[derive(Tabled)]
pub struct BusyRow {
    id: String,
    start: String,
    end: String,
    source: String,
    title: String,
}

impl From<&Value> for BusyRow {
    fn from(v: &Value) -> Self {
        Self {
            id: text(&v["id"]),
            start: fmt_time(&v["range"]["start"]),
            end: fmt_time(&v["range"]["end"]),
            source: text(&v["source"]),
            title: text(&v["title"]),
        }
    }
}

#[derive(Tabled)]
pub struct SlotRow {
    start: String,
    end: String,
    score: String,
    optional_available: String,
}

impl From<&Value> for SlotRow {
    fn from(v: &Value) -> Self {
        let optional = v["optional_available"]
            .as_array()
            .map(|ids| ids.iter().map(text).collect::<Vec<_>>().join(", "))
            .unwrap_or_default();
        Self {
            start: fmt_time(&v["range"]["start"]),
            end: fmt_time(&v["range"]["end"]),
            score: v["score"]
                .as_f64()
                .map(|s| format!("{:.1}", s))
                .unwrap_or_else(|| "-".to_string()),
            optional_available: optional,
        }
    }
}

#[derive(Tabled)]
pub struct InterviewRow {
    id: String,
    state: String,
    start: String,
    end: String,
    title: String,
    interviewers: String,
}

impl From<&Value> for InterviewRow {
    fn from(v: &Value) -> Self {
        let interviewers = v["interviewer_ids"]
            .as_array()
            .map(|ids| ids.iter().map(text).collect::<Vec<_>>().join(", "))
            .unwrap_or_default();
        Self {
            id: text(&v["id"]),
            state: text(&v["state"]),
            start: fmt_time(&v["range"]["start"]),
            end: fmt_time(&v["range"]["end"]),
            title: text(&v["title"]),
            interviewers,
        }
    }
}

/// Rows from an array field of a result object
pub fn rows<'a, R: From<&'a Value>>(result: &'a Value, field: &str) -> Vec<R> {
    result[field]
        .as_array()
        .map(|items| items.iter().map(R::from).collect())
        .unwrap_or_default()
}
