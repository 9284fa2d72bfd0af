//! CSV rendering of the activity log.

use chrono::NaiveDateTime;
use log::info;

use crate::{CoreError, CoreResult, LogEntry};

/// First row of every export.
pub const CSV_HEADER: &str = "Date,Time,Task Name,Category,Status,XP Gain";

/// A rendered export ready to be written to disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportPayload {
    /// Suggested file name, unique per export instant.
    pub file_name: String,
    /// CSV document.
    pub contents: String,
    /// Number of data rows.
    pub rows: usize,
}

/// Render `entries` in log order. An empty log is an error, not a header-only file.
pub fn render_csv(entries: &[LogEntry]) -> CoreResult<String> {
    if entries.is_empty() {
        return Err(CoreError::EmptyLog);
    }
    let mut lines = Vec::with_capacity(entries.len() + 1);
    lines.push(CSV_HEADER.to_string());
    for entry in entries {
        lines.push(format!(
            "{},{},{},{},{},{}",
            entry.date,
            entry.timestamp,
            quote(&entry.task_name),
            entry.category,
            entry.status,
            entry.xp_gain
        ));
    }
    Ok(lines.join("\n"))
}

/// File name carrying the export date and a millisecond time suffix.
pub fn export_file_name(now: NaiveDateTime) -> String {
    format!(
        "mastery_log_{}_{}.csv",
        now.format("%Y-%m-%d"),
        now.format("%H%M%S%3f")
    )
}

/// Build the export payload for `entries` at `now`.
pub fn export_log(entries: &[LogEntry], now: NaiveDateTime) -> CoreResult<ExportPayload> {
    let contents = render_csv(entries)?;
    let file_name = export_file_name(now);
    info!("event=log_export rows={} file={file_name}", entries.len());
    Ok(ExportPayload {
        file_name,
        contents,
        rows: entries.len(),
    })
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Category, LogStatus};
    use chrono::NaiveDate;

    fn entry(name: &str, status: LogStatus, xp_gain: i32) -> LogEntry {
        LogEntry {
            timestamp: "07:30:05".into(),
            date: NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
            task_name: name.into(),
            category: Category::Body,
            status,
            xp_gain,
        }
    }

    #[test]
    fn empty_log_is_rejected() {
        assert!(matches!(render_csv(&[]), Err(CoreError::EmptyLog)));
    }

    #[test]
    fn quotes_are_doubled_in_task_names() {
        assert_eq!(quote("He said \"go\""), "\"He said \"\"go\"\"\"");
    }

    #[test]
    fn renders_rows_in_log_order() {
        let csv = render_csv(&[
            entry("30 min Walk", LogStatus::Completed, 10),
            entry("He said \"go\"", LogStatus::Completed, 10),
            entry("30 min Walk", LogStatus::Uncompleted, -10),
        ])
        .unwrap();
        insta::assert_snapshot!(csv, @r###"
        Date,Time,Task Name,Category,Status,XP Gain
        2026-10-17,07:30:05,"30 min Walk",Body,Completed,10
        2026-10-17,07:30:05,"He said ""go""",Body,Completed,10
        2026-10-17,07:30:05,"30 min Walk",Body,Uncompleted,-10
        "###);
    }

    #[test]
    fn no_trailing_newline() {
        let csv = render_csv(&[entry("Zikr", LogStatus::Completed, 10)]).unwrap();
        assert!(!csv.ends_with('\n'));
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn file_name_has_date_and_time_suffix() {
        let now = NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_milli_opt(21, 4, 9, 37)
            .unwrap();
        assert_eq!(export_file_name(now), "mastery_log_2026-10-17_210409037.csv");
    }
}
