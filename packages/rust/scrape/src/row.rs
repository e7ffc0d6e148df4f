//! Maps one raw announcement-table row to an [`Event`] candidate.
//!
//! The notice board presents each announcement as a seven-cell table row:
//! row number, date/period, subject, teacher, publication time, category,
//! note. Parsing is row-isolated: a malformed row yields a [`RowError`]
//! carrying the offending raw text and never aborts the batch.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

use kyukou_shared::types::{Event, TweetFlags};
use kyukou_shared::{hash, normalize};

/// Marker suffix identifying a makeup class in the subject cell.
const MAKEUP_MARKER: &str = "(補講)";

/// Category substituted when a generically-labeled row carries the marker.
const MAKEUP_CATEGORY: &str = "補講";

/// Generic category labels eligible for the makeup-class override.
const GENERIC_CATEGORIES: [&str; 2] = ["公務", "その他"];

static EVENT_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)年(\d+)月(\d+)日").unwrap());

/// Strips the day-of-week prefix and the period suffix from the date cell.
static PERIOD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r".*曜|限.*").unwrap());

/// Drops the day token and the minute suffix from the publication cell.
static PUB_TAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"日\s*|分.*").unwrap());

// ---------------------------------------------------------------------------
// Input / error types
// ---------------------------------------------------------------------------

/// One scraped table row: its full text plus the cell texts in order.
#[derive(Debug, Clone)]
pub struct RawRow {
    /// Verbatim row text, whitespace and all. Hashed for deduplication.
    pub raw: String,
    /// Cell texts in document order.
    pub cells: Vec<String>,
}

impl RawRow {
    /// 1-based cell access matching the source's column numbering.
    /// Absent cells read as empty, so downstream parsing reports the
    /// failure instead of this accessor.
    fn cell(&self, n: usize) -> &str {
        self.cells.get(n - 1).map(String::as_str).unwrap_or("")
    }
}

/// Per-source context stamped onto every parsed event.
#[derive(Debug, Clone, Copy)]
pub struct SourceContext<'a> {
    /// Source page URL, recorded as the event's `link`.
    pub link: &'a str,
    /// Department label.
    pub department: &'a str,
}

/// A parse failure confined to one row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} on {raw}")]
pub struct RowError {
    pub message: String,
    /// Offending raw row text, control characters stripped.
    pub raw: String,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse one table row into an event candidate.
pub fn parse_row(row: &RawRow, ctx: &SourceContext<'_>) -> Result<Event, RowError> {
    parse_row_inner(row, ctx).map_err(|message| RowError {
        message,
        raw: normalize::strip_control(&row.raw),
    })
}

fn parse_row_inner(row: &RawRow, ctx: &SourceContext<'_>) -> Result<Event, String> {
    let subject_cell = normalize::collapse(row.cell(3));

    // Category, with the makeup-class override: generic labels are
    // replaced when the subject cell carries the makeup marker.
    let mut about = normalize::strip(row.cell(6));
    if GENERIC_CATEGORIES.contains(&about.as_str()) && subject_cell.ends_with(MAKEUP_MARKER) {
        about = MAKEUP_CATEGORY.to_string();
    }

    let date_cell = normalize::collapse(row.cell(2));
    let event_date = parse_event_date(&date_cell)?;

    let pub_date = parse_pub_date(row.cell(5)).ok_or_else(|| {
        format!(
            "unparseable publication time `{}`",
            normalize::collapse(row.cell(5))
        )
    })?;

    // Date cell minus interpunct, day-of-week prefix, and period suffix.
    let period = PERIOD_RE
        .replace_all(&date_cell.replace('・', ""), "")
        .into_owned();

    let subject = subject_cell
        .strip_suffix(MAKEUP_MARKER)
        .unwrap_or(&subject_cell)
        .trim_end()
        // Stray Latin "U" in course numbering is the Roman numeral "II"
        // mistyped at the source.
        .replace('U', "II");

    let teacher = non_empty(normalize::strip(row.cell(4)));
    let note = non_empty(normalize::strip(row.cell(7)));

    Ok(Event {
        raw: row.raw.clone(),
        about,
        link: ctx.link.to_string(),
        event_date,
        pub_date,
        period,
        department: ctx.department.to_string(),
        subject,
        teacher,
        campus: None,
        room: None,
        note,
        hash: hash::create(&row.raw),
        tweet: TweetFlags::default(),
    })
}

/// Extract `<y>年<m>月<d>日` from the date cell as a midnight timestamp.
fn parse_event_date(date_cell: &str) -> Result<DateTime<Utc>, String> {
    let stripped = normalize::strip(date_cell);
    let caps = EVENT_DATE_RE
        .captures(&stripped)
        .ok_or_else(|| format!("event date not found in `{date_cell}`"))?;

    let field = |i: usize| -> Result<u32, String> {
        caps[i]
            .parse()
            .map_err(|_| format!("event date out of range in `{date_cell}`"))
    };
    let (year, month, day) = (field(1)?, field(2)?, field(3)?);

    Utc.with_ymd_and_hms(year as i32, month, day, 0, 0, 0)
        .single()
        .ok_or_else(|| format!("invalid event date {year}-{month}-{day}"))
}

/// Parse the publication-time cell (`<y>年<m>月<d>日 <h>時<m>分…`) by
/// substituting the locale separators with machine-readable ones.
fn parse_pub_date(cell: &str) -> Option<DateTime<Utc>> {
    let text = normalize::collapse(cell).replace(['年', '月'], "-");
    let text = PUB_TAIL_RE.replace_all(&text, " ").replace('時', ":");

    NaiveDateTime::parse_from_str(text.trim(), "%Y-%m-%d %H:%M")
        .ok()
        .map(|dt| dt.and_utc())
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    const CTX: SourceContext<'static> = SourceContext {
        link: "http://example.ac.jp/keiji.cgi",
        department: "法学部",
    };

    fn row(cells: &[&str]) -> RawRow {
        RawRow {
            raw: cells.join("\n"),
            cells: cells.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn good_cells() -> Vec<&'static str> {
        vec![
            "1",
            "2099年10月3日金曜1・2限",
            "憲法U",
            " 山田 太郎 ",
            "2099年10月1日 18時54分",
            "休講",
            "",
        ]
    }

    #[test]
    fn parses_a_complete_row() {
        let event = parse_row(&row(&good_cells()), &CTX).expect("parse");

        assert_eq!(event.about, "休講");
        assert_eq!(event.link, CTX.link);
        assert_eq!(event.department, "法学部");
        assert_eq!(
            (
                event.event_date.year(),
                event.event_date.month(),
                event.event_date.day()
            ),
            (2099, 10, 3)
        );
        assert_eq!(event.event_date.format("%H:%M").to_string(), "00:00");
        assert_eq!(
            event.pub_date.format("%Y-%m-%d %H:%M").to_string(),
            "2099-10-01 18:54"
        );
        assert_eq!(event.period, "12");
        assert_eq!(event.subject, "憲法II");
        assert_eq!(event.teacher.as_deref(), Some("山田太郎"));
        assert_eq!(event.note, None);
        assert!(kyukou_shared::hash::is_valid(&event.hash));
        assert!(!event.tweet.new && !event.tweet.tomorrow);
    }

    #[test]
    fn makeup_override_replaces_generic_categories() {
        let mut cells = good_cells();
        cells[2] = "民法演習(補講)";
        cells[5] = "公務";
        let event = parse_row(&row(&cells), &CTX).expect("parse");
        assert_eq!(event.about, "補講");
        assert_eq!(event.subject, "民法演習");

        cells[5] = "その他";
        let event = parse_row(&row(&cells), &CTX).expect("parse");
        assert_eq!(event.about, "補講");
    }

    #[test]
    fn makeup_override_leaves_specific_categories_alone() {
        let mut cells = good_cells();
        cells[2] = "民法演習(補講)";
        cells[5] = "休講";
        let event = parse_row(&row(&cells), &CTX).expect("parse");
        assert_eq!(event.about, "休講");
    }

    #[test]
    fn makeup_override_needs_the_marker() {
        let mut cells = good_cells();
        cells[5] = "公務";
        let event = parse_row(&row(&cells), &CTX).expect("parse");
        assert_eq!(event.about, "公務");
    }

    #[test]
    fn missing_event_date_is_a_row_error() {
        let mut cells = good_cells();
        cells[1] = "日程未定";
        let err = parse_row(&row(&cells), &CTX).unwrap_err();
        assert!(err.message.contains("event date"));
        assert!(err.raw.contains("日程未定"));
        // Display references the offending row
        assert!(err.to_string().contains(" on "));
    }

    #[test]
    fn unparseable_publication_time_fails_the_row() {
        let mut cells = good_cells();
        cells[4] = "掲示日不明";
        let err = parse_row(&row(&cells), &CTX).unwrap_err();
        assert!(err.message.contains("publication time"));
    }

    #[test]
    fn error_raw_text_strips_control_characters() {
        let mut cells = good_cells();
        cells[1] = "bad\ndate";
        let err = parse_row(&row(&cells), &CTX).unwrap_err();
        assert!(!err.raw.contains('\n'));
        assert!(err.raw.contains("baddate"));
    }

    #[test]
    fn optional_cells_map_to_none_not_failures() {
        let mut cells = good_cells();
        cells[3] = "  ";
        cells[6] = "";
        let event = parse_row(&row(&cells), &CTX).expect("parse");
        assert_eq!(event.teacher, None);
        assert_eq!(event.note, None);
    }

    #[test]
    fn note_cell_is_whitespace_stripped() {
        let mut cells = good_cells();
        cells[6] = " 教室 変更あり ";
        let event = parse_row(&row(&cells), &CTX).expect("parse");
        assert_eq!(event.note.as_deref(), Some("教室変更あり"));
    }

    #[test]
    fn whitespace_variant_rows_share_a_fingerprint() {
        let a = parse_row(&row(&good_cells()), &CTX).expect("parse");

        let mut spaced = good_cells().join("\n");
        spaced.push_str("  \n");
        let b = parse_row(
            &RawRow {
                raw: spaced,
                cells: good_cells().iter().map(|c| format!(" {c} ")).collect(),
            },
            &CTX,
        )
        .expect("parse");

        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn single_digit_publication_fields_parse() {
        let mut cells = good_cells();
        cells[4] = "2099年4月1日 9時5分";
        let event = parse_row(&row(&cells), &CTX).expect("parse");
        assert_eq!(
            event.pub_date.format("%Y-%m-%d %H:%M").to_string(),
            "2099-04-01 09:05"
        );
    }
}
