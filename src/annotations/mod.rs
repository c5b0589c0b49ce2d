//! Seizure annotations over one recording.
//!
//! An [`AnnotationSet`] is an ordered list of [`Annotation`] records that all
//! describe the same recording. It is built from an interval list
//! ([`AnnotationSet::from_intervals`]), a sample mask
//! ([`AnnotationSet::from_mask`]), a TSV file ([`AnnotationSet::load_tsv`]),
//! or explicit records ([`AnnotationSet::new`]).
//!
//! A recording without seizures is always represented by a single `bckg`
//! record covering the whole recording, never by an empty set.
mod mask;
mod tsv;

pub use tsv::TSV_HEADER;

use chrono::NaiveDateTime;

use crate::error::{Error, Result};
use crate::taxonomy::{EventType, SeizureType};

/// Slack allowed when comparing times against the recording end, one unit
/// of the two-decimal TSV resolution.
pub const END_TOLERANCE: f64 = 0.01;

/// Float noise left over from adding two-decimal values.
const GRID_NOISE: f64 = 1e-9;

/// Whether `t` lies past `limit` by more than [`END_TOLERANCE`].
fn past(t: f64, limit: f64) -> bool {
    t - limit > END_TOLERANCE + GRID_NOISE
}

/// One timed event.
///
/// `None` in an optional field means "not applicable" and serializes as
/// `n/a`.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Start, seconds from recording start.
    pub onset: f64,
    /// Length in seconds. `None` for an open-ended event, which runs to the
    /// end of the recording.
    pub duration: Option<f64>,
    pub event_type: EventType,
    /// Annotator confidence in `[0, 1]`.
    pub confidence: Option<f64>,
    /// Channels the event was marked on.
    pub channels: Option<Vec<String>>,
    /// Absolute start time of the recording.
    pub date_time: Option<NaiveDateTime>,
    /// Recording length in seconds, shared by every record of a set.
    pub recording_duration: f64,
}

impl Annotation {
    /// Background over the whole recording.
    pub fn background(recording_duration: f64) -> Self {
        Annotation {
            onset: 0.0,
            duration: Some(recording_duration),
            event_type: EventType::BACKGROUND,
            confidence: None,
            channels: None,
            date_time: None,
            recording_duration,
        }
    }

    /// Seizure of unspecified type with every optional field "not applicable".
    pub fn seizure(onset: f64, duration: f64, recording_duration: f64) -> Self {
        Annotation {
            onset,
            duration: Some(duration),
            event_type: SeizureType::UNSPECIFIED.into(),
            confidence: None,
            channels: None,
            date_time: None,
            recording_duration,
        }
    }

    /// End time in seconds; open-ended events end with the recording.
    pub fn end(&self) -> f64 {
        match self.duration {
            Some(d) => self.onset + d,
            None => self.recording_duration,
        }
    }

    pub fn is_seizure(&self) -> bool {
        self.event_type.is_seizure()
    }

    fn validate(&self) -> Result<()> {
        let bad = |what: String| Err(Error::InvalidAnnotation(what));
        if !(self.recording_duration.is_finite() && self.recording_duration > 0.0) {
            return bad(format!("recording duration must be positive, got {}", self.recording_duration));
        }
        if !(self.onset.is_finite() && self.onset >= 0.0) {
            return bad(format!("onset must be non-negative, got {}", self.onset));
        }
        if let Some(d) = self.duration {
            if !(d.is_finite() && d >= 0.0) {
                return bad(format!("duration must be non-negative, got {d}"));
            }
        }
        if past(self.end(), self.recording_duration) || past(self.onset, self.recording_duration) {
            return bad(format!(
                "event [{}, {}) exceeds recording duration {}",
                self.onset,
                self.end(),
                self.recording_duration
            ));
        }
        if let Some(c) = self.confidence {
            if !(0.0..=1.0).contains(&c) {
                return bad(format!("confidence must be in [0, 1], got {c}"));
            }
        }
        if let Some(channels) = &self.channels {
            if channels.is_empty() {
                return bad("channel list is empty; use None for not applicable".into());
            }
            if let Some(c) = channels
                .iter()
                .find(|c| c.is_empty() || c.contains([',', '\t', '\n']))
            {
                return bad(format!("invalid channel name `{c}`"));
            }
        }
        Ok(())
    }
}

/// Ordered events of one recording.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationSet {
    events: Vec<Annotation>,
}

impl AnnotationSet {
    /// Wrap explicit records, checking the data-model invariants.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAnnotation`] when the list is empty, a record is out
    /// of range, the records disagree on the recording duration, or a set
    /// without seizures is anything but a single full-length `bckg` record.
    pub fn new(events: Vec<Annotation>) -> Result<Self> {
        let Some(first) = events.first() else {
            return Err(Error::InvalidAnnotation(
                "an annotation set needs at least one record".into(),
            ));
        };
        let recording_duration = first.recording_duration;
        for event in &events {
            event.validate()?;
            if event.recording_duration != recording_duration {
                return Err(Error::InvalidAnnotation(format!(
                    "records disagree on recording duration ({} vs {recording_duration})",
                    event.recording_duration
                )));
            }
        }
        if !events.iter().any(Annotation::is_seizure) {
            let full = events.len() == 1
                && events[0].onset == 0.0
                && !past(events[0].end(), recording_duration)
                && !past(recording_duration, events[0].end());
            if !full {
                return Err(Error::InvalidAnnotation(
                    "a set without seizures must be one bckg record spanning the recording".into(),
                ));
            }
        }
        Ok(AnnotationSet { events })
    }

    /// One unspecified-seizure record per `(start, end)` interval, in the
    /// given order. An empty list yields the mandatory background record.
    pub fn from_intervals(intervals: &[(f64, f64)], recording_duration: f64) -> Result<Self> {
        let events = if intervals.is_empty() {
            vec![Annotation::background(recording_duration)]
        } else {
            intervals
                .iter()
                .map(|&(start, end)| {
                    if end < start {
                        return Err(Error::InvalidAnnotation(format!(
                            "interval ends before it starts: ({start}, {end})"
                        )));
                    }
                    Ok(Annotation::seizure(start, end - start, recording_duration))
                })
                .collect::<Result<Vec<_>>>()?
        };
        AnnotationSet::new(events)
    }

    /// Records in order.
    pub fn events(&self) -> &[Annotation] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Always `false`: a set holds at least the background record.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn recording_duration(&self) -> f64 {
        self.events[0].recording_duration
    }

    /// `(onset, end)` of every seizure record, in record order.
    pub fn get_events(&self) -> Vec<(f64, f64)> {
        self.events
            .iter()
            .filter(|e| e.is_seizure())
            .map(|e| (e.onset, e.end().min(e.recording_duration)))
            .collect()
    }
}

impl<'a> IntoIterator for &'a AnnotationSet {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
