//! Append-only CSV measurement files.
//!
//! One file per topic under the data directory. The first column is Unix
//! epoch seconds; the rest follow the order declared by the header written
//! when the file is created. Missing readings are written as a sentinel.

use crate::sinks::{LogError, LogSink, Record};
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// CSV file log rooted at a directory.
#[derive(Debug, Clone)]
pub struct CsvLog {
    dir: PathBuf,
    sentinel: f64,
}

impl CsvLog {
    pub fn new(dir: impl Into<PathBuf>, sentinel: f64) -> Self {
        Self {
            dir: dir.into(),
            sentinel,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that records for `topic` are appended to.
    pub fn path_for(&self, topic: &str) -> PathBuf {
        let name: String = topic
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.csv"))
    }
}

impl LogSink for CsvLog {
    fn append(
        &mut self,
        topic: &str,
        timestamp: DateTime<Local>,
        record: &Record,
        header: &str,
    ) -> Result<(), LogError> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.path_for(topic);
        let is_new = !path.exists();
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;

        if is_new {
            writeln!(file, "Time (s),{header}")?;
        }
        writeln!(
            file,
            "{}",
            format_record(timestamp.timestamp(), record, self.sentinel)
        )?;
        Ok(())
    }
}

/// Format one CSV line: epoch seconds, then values to two decimals.
///
/// Rounding makes the file exact only to 0.005, and a real value that rounds
/// to the sentinel (e.g. -99.004 with the default) reads back as missing.
pub fn format_record(epoch_secs: i64, record: &Record, sentinel: f64) -> String {
    let mut line = epoch_secs.to_string();
    for value in record.values() {
        line.push(',');
        line.push_str(&format!("{:.2}", value.unwrap_or(sentinel)));
    }
    line
}

/// Parse a line written by [`format_record`], mapping the sentinel to `None`.
pub fn parse_record(line: &str, sentinel: f64) -> Result<(i64, Vec<Option<f64>>), LogError> {
    let mut fields = line.trim().split(',');

    let epoch = fields
        .next()
        .filter(|f| !f.is_empty())
        .ok_or_else(|| LogError::Parse("empty record".to_string()))?
        .parse::<i64>()
        .map_err(|e| LogError::Parse(format!("timestamp: {e}")))?;

    let values = fields
        .map(|f| -> Result<Option<f64>, LogError> {
            let v = f
                .trim()
                .parse::<f64>()
                .map_err(|e| LogError::Parse(format!("value '{f}': {e}")))?;
            Ok(if (v - sentinel).abs() < 1e-9 { None } else { Some(v) })
        })
        .collect::<Result<Vec<_>, LogError>>()?;

    Ok((epoch, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::DEFAULT_MISSING_SENTINEL;
    use chrono::TimeZone;

    fn test_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("radon-monitor-csv-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_scalar_round_trip() {
        let line = format_record(1_700_000_000, &Record::Scalar(Some(1.23456)), DEFAULT_MISSING_SENTINEL);
        assert_eq!(line, "1700000000,1.23");

        let (epoch, values) = parse_record(&line, DEFAULT_MISSING_SENTINEL).unwrap();
        assert_eq!(epoch, 1_700_000_000);
        assert_eq!(values.len(), 1);
        assert!((values[0].unwrap() - 1.23456).abs() < 0.005);
    }

    #[test]
    fn test_sentinel_is_distinguishable() {
        let record = Record::List(vec![Some(3.0), None, Some(-2.5)]);
        let line = format_record(42, &record, DEFAULT_MISSING_SENTINEL);
        assert_eq!(line, "42,3.00,-99.00,-2.50");

        let (_, values) = parse_record(&line, DEFAULT_MISSING_SENTINEL).unwrap();
        assert_eq!(values, vec![Some(3.0), None, Some(-2.5)]);
    }

    #[test]
    fn test_value_rounding_onto_sentinel_reads_as_missing() {
        let line = format_record(42, &Record::Scalar(Some(-99.004)), DEFAULT_MISSING_SENTINEL);
        assert_eq!(line, "42,-99.00");

        let (_, values) = parse_record(&line, DEFAULT_MISSING_SENTINEL).unwrap();
        assert_eq!(values, vec![None]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_record("", DEFAULT_MISSING_SENTINEL).is_err());
        assert!(parse_record("abc,1.0", DEFAULT_MISSING_SENTINEL).is_err());
        assert!(parse_record("1,x", DEFAULT_MISSING_SENTINEL).is_err());
    }

    #[test]
    fn test_append_writes_header_once() {
        let dir = test_dir("header");
        let _ = std::fs::remove_dir_all(&dir);

        let mut log = CsvLog::new(&dir, DEFAULT_MISSING_SENTINEL);
        let t = Local.with_ymd_and_hms(2024, 1, 15, 12, 1, 0).unwrap();
        log.append("RadonMonitor/PresSensor", t, &Record::Scalar(Some(2.0)), "Inches w.c.")
            .unwrap();
        log.append("RadonMonitor/PresSensor", t, &Record::Scalar(None), "Inches w.c.")
            .unwrap();

        let path = log.path_for("RadonMonitor/PresSensor");
        assert!(path.ends_with("RadonMonitor_PresSensor.csv"));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Time (s),Inches w.c.");

        let (epoch, values) = parse_record(lines[1], DEFAULT_MISSING_SENTINEL).unwrap();
        assert_eq!(epoch, t.timestamp());
        assert_eq!(values, vec![Some(2.0)]);
        assert_eq!(parse_record(lines[2], DEFAULT_MISSING_SENTINEL).unwrap().1, vec![None]);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
