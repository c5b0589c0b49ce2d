//! Tab-separated annotation files.
//!
//! ```text
//! onset   duration  eventType  confidence  channels    dateTime             recordingDuration
//! 10.00   n/a       sz         0.50        n/a         n/a                  3600.00
//! 0.00    3600.00   bckg       n/a         Fp1,F7      2020-01-31 08:00:00  3600.00
//! ```
//!
//! Numbers carry two decimals, `n/a` marks a field that does not apply,
//! channel lists are comma-joined and times use `%Y-%m-%d %H:%M:%S`. Records
//! whose times are already on the 0.01 s grid survive a save/load cycle
//! unchanged.
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::NaiveDateTime;

use super::{Annotation, AnnotationSet};
use crate::error::{Error, Result};
use crate::taxonomy::EventType;

/// Column names, in file order.
pub const TSV_HEADER: [&str; 7] = [
    "onset",
    "duration",
    "eventType",
    "confidence",
    "channels",
    "dateTime",
    "recordingDuration",
];

const NOT_APPLICABLE: &str = "n/a";
const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn fmt_num(v: f64) -> String {
    format!("{v:.2}")
}

fn fmt_opt<T>(v: &Option<T>, f: impl FnOnce(&T) -> String) -> String {
    v.as_ref().map_or_else(|| NOT_APPLICABLE.to_string(), f)
}

fn encode(a: &Annotation) -> [String; 7] {
    [
        fmt_num(a.onset),
        fmt_opt(&a.duration, |d| fmt_num(*d)),
        a.event_type.code().to_string(),
        fmt_opt(&a.confidence, |c| fmt_num(*c)),
        fmt_opt(&a.channels, |c| c.join(",")),
        fmt_opt(&a.date_time, |t| t.format(DATE_TIME_FORMAT).to_string()),
        fmt_num(a.recording_duration),
    ]
}

/// `-?[0-9]+\.[0-9]{2}`, the only number form `save_tsv` writes.
fn two_decimals(token: &str) -> bool {
    let unsigned = token.strip_prefix('-').unwrap_or(token);
    let Some((int, frac)) = unsigned.split_once('.') else {
        return false;
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    digits(int) && frac.len() == 2 && digits(frac)
}

/// Parses the fields of one row, tagging errors with its line number.
struct RowParser {
    line: usize,
}

impl RowParser {
    fn malformed(&self, reason: String) -> Error {
        Error::MalformedAnnotationRow { line: self.line, reason }
    }

    fn number(&self, column: &str, token: &str) -> Result<f64> {
        match token.parse::<f64>() {
            Ok(v) if two_decimals(token) => Ok(v),
            _ => Err(self.malformed(format!("{column}: expected a number like `12.50`, got `{token}`"))),
        }
    }

    fn optional<T>(&self, token: &str, parse: impl FnOnce(&str) -> Result<T>) -> Result<Option<T>> {
        if token == NOT_APPLICABLE {
            Ok(None)
        } else {
            parse(token).map(Some)
        }
    }

    fn channels(&self, token: &str) -> Result<Vec<String>> {
        let channels: Vec<String> = token.split(',').map(str::to_string).collect();
        if channels.iter().any(String::is_empty) {
            return Err(self.malformed(format!("channels: empty name in `{token}`")));
        }
        Ok(channels)
    }

    fn date_time(&self, token: &str) -> Result<NaiveDateTime> {
        NaiveDateTime::parse_from_str(token, DATE_TIME_FORMAT)
            .map_err(|_| self.malformed(format!("dateTime: expected `YYYY-MM-DD HH:MM:SS`, got `{token}`")))
    }

    fn annotation(&self, fields: &csv::StringRecord) -> Result<Annotation> {
        if fields.len() != TSV_HEADER.len() {
            return Err(self.malformed(format!(
                "expected {} fields, got {}",
                TSV_HEADER.len(),
                fields.len()
            )));
        }
        let field = |i: usize| fields.get(i).unwrap_or_default();
        let annotation = Annotation {
            onset: self.number("onset", field(0))?,
            duration: self.optional(field(1), |t| self.number("duration", t))?,
            event_type: field(2).parse::<EventType>()?,
            confidence: self.optional(field(3), |t| self.number("confidence", t))?,
            channels: self.optional(field(4), |t| self.channels(t))?,
            date_time: self.optional(field(5), |t| self.date_time(t))?,
            recording_duration: self.number("recordingDuration", field(6))?,
        };
        annotation.validate().map_err(|e| match e {
            Error::InvalidAnnotation(reason) => self.malformed(reason),
            other => other,
        })?;
        Ok(annotation)
    }
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut b = csv::ReaderBuilder::new();
    b.delimiter(b'\t').quoting(false).flexible(true).has_headers(true);
    b
}

impl AnnotationSet {
    /// Read a TSV annotation file.
    ///
    /// # Errors
    ///
    /// * [`Error::MalformedAnnotationRow`] for a wrong header, field count or
    ///   token, or a row whose values are out of range on their own.
    /// * [`Error::UnknownEventType`] for an `eventType` outside the taxonomy.
    /// * [`Error::InvalidAnnotation`] when the rows together break a set
    ///   invariant (no rows, mixed recording durations, a partial `bckg`).
    pub fn load_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut r = reader_builder().from_reader(BufReader::new(File::open(path)?));

        let header = r.headers()?.clone();
        if !header.iter().eq(TSV_HEADER.iter().copied()) {
            return Err(Error::MalformedAnnotationRow {
                line: 1,
                reason: format!("header must be `{}`", TSV_HEADER.join("\t")),
            });
        }

        let mut events = Vec::new();
        for (i, record) in r.records().enumerate() {
            let record = record?;
            let line = record.position().map_or(i + 2, |p| p.line() as usize);
            events.push(RowParser { line }.annotation(&record)?);
        }
        tracing::debug!(path = %path.display(), n_events = events.len(), "loaded annotations");
        AnnotationSet::new(events)
    }

    /// Write the set as TSV, one row per record.
    pub fn save_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut w = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(BufWriter::new(File::create(path)?));
        w.write_record(TSV_HEADER)?;
        for event in self.iter() {
            w.write_record(encode(event))?;
        }
        w.flush()?;
        tracing::debug!(path = %path.display(), n_events = self.len(), "saved annotations");
        Ok(())
    }
}
