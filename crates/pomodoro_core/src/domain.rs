//! crates/pomodoro_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any storage or serialization format.

use std::fmt;
use std::str::FromStr;

/// Lowest accepted planned session count for a task.
pub const MIN_ESTIMATE: u32 = 1;
/// Highest accepted planned session count for a task.
pub const MAX_ESTIMATE: u32 = 12;

/// A named container grouping related tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// A unit of work belonging to one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub done: bool,
    /// Completed focus sessions.
    pub pomodoros: u32,
    /// Planned focus sessions, always within `MIN_ESTIMATE..=MAX_ESTIMATE` at creation.
    pub estimate: u32,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// Input for creating a task. Fields are raw, the store trims and validates them.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub project_id: String,
    pub title: String,
    /// Already parsed as an integer; `None` when absent or unparseable.
    pub estimate: Option<i64>,
}

/// Partial update of a task. Only the fields that are `Some` are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub done: Option<bool>,
    pub title: Option<String>,
    pub pomodoros: Option<u32>,
}

/// The full persisted document: both collections in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreState {
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
}

/// Clamps a parsed estimate into the accepted range, defaulting to 1.
pub fn clamp_estimate(raw: Option<i64>) -> u32 {
    match raw {
        Some(n) if n > MAX_ESTIMATE as i64 => MAX_ESTIMATE,
        Some(n) if n >= MIN_ESTIMATE as i64 => n as u32,
        _ => MIN_ESTIMATE,
    }
}

/// Parses the leading integer of a string the way browsers' `parseInt(s, 10)` does:
/// leading whitespace and an optional sign are accepted, parsing stops at the first
/// non-digit, and a string without leading digits yields `None`.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Overlong digit runs saturate; they are clamped later anyway.
    let value = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

//=========================================================================================
// Timer
//=========================================================================================

/// The three countdown modes of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerMode {
    Focus,
    Short,
    Long,
}

impl TimerMode {
    /// Full countdown length of the mode, in seconds.
    pub const fn duration_secs(self) -> u32 {
        match self {
            TimerMode::Focus => 25 * 60,
            TimerMode::Short => 5 * 60,
            TimerMode::Long => 15 * 60,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TimerMode::Focus => "focus",
            TimerMode::Short => "short",
            TimerMode::Long => "long",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown timer mode '{0}'")]
pub struct UnknownMode(pub String);

impl FromStr for TimerMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "focus" => Ok(TimerMode::Focus),
            "short" => Ok(TimerMode::Short),
            "long" => Ok(TimerMode::Long),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// A point-in-time copy of the timer, handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub mode: TimerMode,
    pub remaining_seconds: u32,
    pub running: bool,
    pub active_task_id: Option<String>,
}

impl TimerSnapshot {
    /// The countdown as `MM:SS`.
    pub fn display(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.remaining_seconds / 60,
            self.remaining_seconds % 60
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_is_clamped_into_range() {
        assert_eq!(clamp_estimate(Some(0)), 1);
        assert_eq!(clamp_estimate(Some(-4)), 1);
        assert_eq!(clamp_estimate(Some(5)), 5);
        assert_eq!(clamp_estimate(Some(12)), 12);
        assert_eq!(clamp_estimate(Some(15)), 12);
        assert_eq!(clamp_estimate(None), 1);
    }

    #[test]
    fn leading_int_follows_parse_int() {
        assert_eq!(parse_leading_int("5"), Some(5));
        assert_eq!(parse_leading_int("  7 tomatoes"), Some(7));
        assert_eq!(parse_leading_int("-3"), Some(-3));
        assert_eq!(parse_leading_int("3.9"), Some(3));
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(
            parse_leading_int("99999999999999999999999"),
            Some(i64::MAX)
        );
    }

    #[test]
    fn mode_durations_and_names() {
        assert_eq!(TimerMode::Focus.duration_secs(), 1500);
        assert_eq!(TimerMode::Short.duration_secs(), 300);
        assert_eq!(TimerMode::Long.duration_secs(), 900);
        assert_eq!("long".parse::<TimerMode>(), Ok(TimerMode::Long));
        assert!("lunch".parse::<TimerMode>().is_err());
    }

    #[test]
    fn snapshot_display_pads_minutes_and_seconds() {
        let snapshot = TimerSnapshot {
            mode: TimerMode::Focus,
            remaining_seconds: 1500,
            running: false,
            active_task_id: None,
        };
        assert_eq!(snapshot.display(), "25:00");
        let snapshot = TimerSnapshot {
            remaining_seconds: 61,
            ..snapshot
        };
        assert_eq!(snapshot.display(), "01:01");
    }
}
