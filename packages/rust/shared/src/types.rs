//! Core domain types: the event record, tweet flags, and task log entries.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{KyukouError, Result};
use crate::hash;

/// Grace window for already-started events: an event date may lag `now`
/// by up to this many hours and still validate.
pub const GRACE_WINDOW_HOURS: i64 = 18;

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Notification state, mutated only by the external notifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetFlags {
    /// Announced as a newly published event.
    #[serde(default)]
    pub new: bool,
    /// Announced in the day-before reminder.
    #[serde(default)]
    pub tomorrow: bool,
}

/// Which tweet flag to flip. Storage-level selector for the notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweetKind {
    New,
    Tomorrow,
}

/// One announced irregular event (cancellation, makeup class, room change).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Verbatim source row text.
    pub raw: String,
    /// Category label (休講, 補講, 教室変更, ...).
    pub about: String,
    /// URL of the page the row was scraped from.
    pub link: String,
    /// Day of the event, at midnight.
    pub event_date: DateTime<Utc>,
    /// When the announcement was published.
    pub pub_date: DateTime<Utc>,
    /// Free-text period/slot label (e.g. `1・2` stripped to `12`).
    pub period: String,
    /// Department label from the source context.
    pub department: String,
    /// Course name.
    pub subject: String,
    pub teacher: Option<String>,
    pub campus: Option<String>,
    pub room: Option<String>,
    pub note: Option<String>,
    /// Content fingerprint of the normalized raw text; the dedup key.
    pub hash: String,
    /// Notification state; defaults to untweeted.
    #[serde(default)]
    pub tweet: TweetFlags,
}

impl Event {
    /// Validate persistence-time invariants against an explicit `now`.
    ///
    /// Pure and storage-independent: required fields are non-empty, the
    /// fingerprint is well-formed, and the event date is no further than
    /// the grace window in the past.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        for (name, value) in [
            ("raw", &self.raw),
            ("about", &self.about),
            ("link", &self.link),
            ("period", &self.period),
            ("department", &self.department),
            ("subject", &self.subject),
        ] {
            if value.is_empty() {
                return Err(KyukouError::validation(format!(
                    "required field `{name}` is empty"
                )));
            }
        }

        if !hash::is_valid(&self.hash) {
            return Err(KyukouError::validation(format!(
                "malformed fingerprint `{}`",
                self.hash
            )));
        }

        if !event_date_within_grace(self.event_date, now) {
            return Err(KyukouError::validation(format!(
                "event date {} expired (more than {GRACE_WINDOW_HOURS}h ago)",
                self.event_date.format("%Y-%m-%d")
            )));
        }

        Ok(())
    }

    /// `【about】period時限「subject（campus）」（teacher教員）`
    pub fn title_text(&self) -> String {
        format!(
            "【{}】{}時限{}{}",
            self.about,
            self.period,
            self.subject_text(),
            self.teacher_text()
        )
    }

    /// Title with the event date and department spliced in, for day-of
    /// summaries.
    pub fn summary_text(&self) -> String {
        format!(
            "【{}】{}{}時限{}{}{}",
            self.about,
            self.date_text(),
            self.period,
            self.department,
            self.subject_text(),
            self.teacher_text()
        )
    }

    /// Room and note lines (`教室：…`, `備考：…`), joined by `sep`.
    /// Empty when neither field is present.
    pub fn note_text(&self, sep: &str) -> String {
        let mut parts = Vec::new();
        if let Some(room) = &self.room {
            parts.push(format!("教室：{room}"));
        }
        if let Some(note) = &self.note {
            parts.push(format!("備考：{note}"));
        }
        parts.join(sep)
    }

    /// Full announcement body: category + date, department line, and the
    /// note block when present.
    pub fn full_text(&self, sep: &str) -> String {
        let mut out = format!(
            "【{}】{}{sep}{}{}時限{}{}",
            self.about,
            self.date_text(),
            self.department,
            self.period,
            self.subject_text(),
            self.teacher_text()
        );
        let note = self.note_text(sep);
        if !note.is_empty() {
            out.push_str(sep);
            out.push_str(&note);
        }
        out
    }

    fn date_text(&self) -> String {
        format!(
            "{}月{}日（{}）",
            self.event_date.month(),
            self.event_date.day(),
            weekday_kanji(&self.event_date)
        )
    }

    fn subject_text(&self) -> String {
        match &self.campus {
            Some(campus) => format!("「{}（{campus}）」", self.subject),
            None => format!("「{}」", self.subject),
        }
    }

    fn teacher_text(&self) -> String {
        match &self.teacher {
            Some(teacher) => format!("（{teacher}教員）"),
            None => String::new(),
        }
    }
}

/// True when `event_date` is not more than the grace window before `now`.
pub fn event_date_within_grace(event_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(event_date) <= Duration::hours(GRACE_WINDOW_HOURS)
}

fn weekday_kanji(date: &DateTime<Utc>) -> &'static str {
    const KANJI: [&str; 7] = ["日", "月", "火", "水", "木", "金", "土"];
    KANJI[date.weekday().num_days_from_sunday() as usize]
}

// ---------------------------------------------------------------------------
// Task log
// ---------------------------------------------------------------------------

/// Severity of a task run, ordered error > warning > notice > info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Notice,
    Warning,
    Error,
}

impl Severity {
    /// Classify free-form message text by marker precedence. Retained as
    /// the fallback for untyped messages (captured error text); tasks
    /// that can should report a typed [`TaskOutcome`] instead.
    pub fn from_message(message: &str) -> Self {
        if message.contains("err: ") {
            Self::Error
        } else if message.contains("wrn: ") {
            Self::Warning
        } else if message.contains("inf: ") {
            Self::Notice
        } else {
            Self::Info
        }
    }

    /// Numeric level as persisted: 1=info, 2=notice, 3=warning, 4=error.
    pub fn level(self) -> u8 {
        match self {
            Self::Info => 1,
            Self::Notice => 2,
            Self::Warning => 3,
            Self::Error => 4,
        }
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Info),
            2 => Some(Self::Notice),
            3 => Some(Self::Warning),
            4 => Some(Self::Error),
            _ => None,
        }
    }

    /// Marker prefix matching [`Severity::from_message`], empty for info.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Info => "",
            Self::Notice => "inf: ",
            Self::Warning => "wrn: ",
            Self::Error => "err: ",
        }
    }
}

/// Typed result of one task run: what happened, and how loudly to log it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub severity: Severity,
    pub message: String,
}

impl TaskOutcome {
    /// An outcome whose message carries the severity's marker.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: format!("{}{}", severity.marker(), message.into()),
        }
    }

    /// Classify an untyped message by its markers.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            severity: Severity::from_message(&message),
            message,
        }
    }
}

/// Outcome of one pipeline execution, persisted once per run. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskLogEntry {
    /// Free text or stringified error, severity markers included.
    pub message: String,
    /// Numeric severity, see [`Severity::level`].
    pub level: u8,
    /// When the task started.
    pub time: DateTime<Utc>,
    /// Wall time in milliseconds, sub-millisecond precision preserved.
    pub elapsed_ms: f64,
}
