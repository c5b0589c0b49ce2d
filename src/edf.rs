//! EDF+ import and export on top of the [`edfplus`] crate.
//!
//! Reading goes through [`edfplus::EdfReader`]; the `EDF Annotations`
//! signal is already hidden by the reader. Before any sample is pulled the
//! header is checked against the file size, so a corrupt record count
//! surfaces as [`Error::Edf`] instead of a huge allocation.
//!
//! Writing goes through [`edfplus::EdfWriter`] with whole-second data
//! records. The last record is zero-padded and the true sample count is kept
//! in the recording identification, so a signal keeps its length (and its
//! duration) across a round trip. Each channel gets its own physical range,
//! rounded outwards so every sample is representable. Patient fields stay
//! anonymised (`X`).
//!
//! # Quick start
//! ```no_run
//! use eegstd::edf::read_edf;
//!
//! let rec = read_edf("data/chb01_01.edf")?;
//! for s in &rec.signals {
//!     println!("{} @ {} Hz, {} samples", s.label, s.fs, s.samples.len());
//! }
//! # Ok::<(), eegstd::Error>(())
//! ```
use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use edfplus::{EdfReader, EdfWriter, SignalParam, EDFLIB_TIME_DIMENSION};
use ndarray::{s, Array2};

use crate::error::{Error, Result};

/// Size of the fixed header and of each per-signal header block.
const HEADER_BLOCK: u64 = 256;

/// Digital range used by the writer (full 16-bit span).
pub const DIGITAL_MIN: i32 = -32768;
pub const DIGITAL_MAX: i32 = 32767;

const PHYSICAL_DIMENSION: &str = "uV";
const MAX_RECORD_SECS: usize = 60;
/// Recording-identification subfield holding the unpadded sample count.
const SAMPLES_TAG: &str = "samples=";
/// Width of every numeric header field.
const FIELD_WIDTH: usize = 8;

fn edf_error(e: edfplus::EdfError) -> Error {
    Error::Edf(e.to_string())
}

/// One decoded data signal.
#[derive(Debug, Clone)]
pub struct EdfSignal {
    /// Label as stored in the file (trimmed).
    pub label: String,
    /// Sampling rate in Hz.
    pub fs: f64,
    /// Physical dimension, e.g. `uV`.
    pub physical_dimension: String,
    /// Samples in physical units.
    pub samples: Vec<f64>,
}

/// A fully decoded EDF+ file.
#[derive(Debug, Clone)]
pub struct EdfRecording {
    /// Recording start (header date and time).
    pub start: NaiveDateTime,
    /// Number of data records, the padded last one included.
    pub n_records: usize,
    /// Duration of one data record in seconds.
    pub record_duration: f64,
    /// Data signals in file order.
    pub signals: Vec<EdfSignal>,
}

impl EdfRecording {
    /// Labels of the data signals, in file order.
    pub fn labels(&self) -> Vec<String> {
        self.signals.iter().map(|s| s.label.clone()).collect()
    }

    /// Duration in seconds of the longest signal.
    pub fn duration_secs(&self) -> f64 {
        self.signals
            .iter()
            .map(|s| s.samples.len() as f64 / s.fs)
            .fold(0.0, f64::max)
    }
}

/// Read and decode an EDF+ file.
pub fn read_edf<P: AsRef<Path>>(path: P) -> Result<EdfRecording> {
    let path = path.as_ref();
    let file_len = fs::metadata(path)?.len();
    let mut reader = EdfReader::open(path).map_err(edf_error)?;

    let header = reader.header();
    let n_records = usize::try_from(header.datarecords_in_file)
        .map_err(|_| Error::Edf(format!("unsupported record count {}", header.datarecords_in_file)))?;
    let record_units = header.datarecord_duration;
    if n_records > 0 && record_units <= 0 {
        return Err(Error::Edf(format!("invalid data record duration {record_units}")));
    }

    let mut layout = Vec::with_capacity(header.signals.len());
    for s in &header.signals {
        let spr = usize::try_from(s.samples_per_record)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| Error::Edf(format!("signal `{}`: {} samples per record", s.label, s.samples_per_record)))?;
        if s.digital_max <= s.digital_min {
            return Err(Error::Edf(format!("signal `{}`: empty digital range", s.label)));
        }
        // Exact integers, so rates like 256 or 250 come back exactly.
        let fs = spr as f64 * EDFLIB_TIME_DIMENSION as f64 / record_units as f64;
        layout.push((s.label.trim().to_string(), s.physical_dimension.clone(), spr, fs));
    }

    // The data signals alone must fit in the file; this bounds every
    // allocation below by the file size.
    let record_bytes = layout
        .iter()
        .try_fold(0u64, |acc, &(_, _, spr, _)| acc.checked_add(2 * spr as u64));
    let needed = record_bytes
        .and_then(|b| b.checked_mul(n_records as u64))
        .and_then(|b| b.checked_add(HEADER_BLOCK * (layout.len() as u64 + 1)));
    match needed {
        Some(n) if n <= file_len => {}
        _ => {
            return Err(Error::Edf(format!(
                "header declares {n_records} records, file holds {file_len} bytes"
            )))
        }
    }

    let start = NaiveDateTime::new(header.start_date, header.start_time);
    let record_duration = record_units as f64 / EDFLIB_TIME_DIMENSION as f64;
    // Padding is only cut when every signal shares one rate, as written by
    // `write_edf`.
    let uniform = layout.windows(2).all(|w| w[0].2 == w[1].2);
    let recorded = recorded_samples(header).filter(|_| uniform);

    let mut signals = Vec::with_capacity(layout.len());
    for (i, (label, physical_dimension, spr, fs)) in layout.into_iter().enumerate() {
        let expected = spr * n_records;
        let mut samples = reader.read_physical_samples(i, expected).map_err(edf_error)?;
        if samples.len() != expected {
            return Err(Error::Edf(format!(
                "signal `{label}`: {} of {expected} samples present",
                samples.len()
            )));
        }
        if let Some(n) = recorded {
            samples.truncate(n);
        }
        signals.push(EdfSignal { label, fs, physical_dimension, samples });
    }

    tracing::debug!(
        path = %path.display(),
        n_records,
        n_signals = signals.len(),
        "read EDF"
    );
    Ok(EdfRecording { start, n_records, record_duration, signals })
}

/// Choose a data record duration (whole seconds, at most a minute) and the
/// matching number of samples per record for `fs`.
pub fn record_layout(fs: f64) -> Result<(f64, usize)> {
    if !(fs.is_finite() && fs > 0.0) {
        return Err(Error::Edf(format!("invalid sampling rate {fs}")));
    }
    for secs in 1..=MAX_RECORD_SECS {
        let n = fs * secs as f64;
        let rounded = n.round();
        if (n - rounded).abs() < 1e-6 && rounded >= 1.0 {
            return Ok((secs as f64, rounded as usize));
        }
    }
    Err(Error::Edf(format!(
        "sampling rate {fs} Hz gives no integral samples per record up to {MAX_RECORD_SECS} s"
    )))
}

/// Write `data` (`[C, T]`, physical units) to `path` as EDF+.
///
/// The last data record is zero-padded; the true sample count goes into the
/// recording identification (`samples=<n>`) and [`read_edf`] cuts the
/// padding off again.
pub fn write_edf<P: AsRef<Path>>(
    path: P,
    data: &Array2<f64>,
    labels: &[String],
    fs: f64,
    start: Option<NaiveDateTime>,
) -> Result<()> {
    let path = path.as_ref();
    let (n_ch, n_t) = data.dim();
    if labels.len() != n_ch {
        return Err(Error::Edf(format!("{} labels for {n_ch} channels", labels.len())));
    }
    if n_ch == 0 || n_t == 0 {
        return Err(Error::Edf("cannot write an empty signal".into()));
    }
    if data.iter().any(|v| !v.is_finite()) {
        return Err(Error::Edf("signal contains non-finite samples".into()));
    }
    let start = start.unwrap_or_else(default_start);
    if !(1985..=2084).contains(&start.year()) {
        return Err(Error::Edf(format!("start {start} outside the EDF date window 1985-2084")));
    }
    let (record_duration, spr) = record_layout(fs)?;
    let spr_field = i32::try_from(spr)
        .ok()
        .filter(|n| n.to_string().len() <= FIELD_WIDTH)
        .ok_or_else(|| Error::Edf(format!("{spr} samples per record do not fit the header")))?;

    let mut writer = EdfWriter::create(path).map_err(edf_error)?;
    writer.set_datarecord_duration(record_duration).map_err(edf_error)?;
    for (label, row) in labels.iter().zip(data.rows()) {
        let (lo, hi) = row
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        // Zero padding must be representable too.
        let (mut lo, mut hi) = (lo.min(0.0), hi.max(0.0));
        if hi - lo < 1.0 {
            lo -= 1.0;
            hi += 1.0;
        }
        writer
            .add_signal(SignalParam {
                label: label.clone(),
                samples_in_file: 0,
                physical_max: fitted(hi, true)?,
                physical_min: fitted(lo, false)?,
                digital_max: DIGITAL_MAX,
                digital_min: DIGITAL_MIN,
                samples_per_record: spr_field,
                physical_dimension: PHYSICAL_DIMENSION.to_string(),
                prefilter: String::new(),
                transducer: String::new(),
            })
            .map_err(edf_error)?;
    }

    let n_records = n_t.div_ceil(spr);
    for r in 0..n_records {
        let span = r * spr..((r + 1) * spr).min(n_t);
        let record: Vec<Vec<f64>> = data
            .rows()
            .into_iter()
            .map(|row| {
                let mut chunk = row.slice(s![span.clone()]).to_vec();
                chunk.resize(spr, 0.0);
                chunk
            })
            .collect();
        writer.write_samples(&record).map_err(edf_error)?;
    }
    writer.finalize().map_err(edf_error)?;
    stamp_recording(path, start, n_t)?;

    tracing::debug!(
        path = %path.display(),
        n_channels = n_ch,
        n_samples = n_t,
        n_records,
        record_duration,
        "wrote EDF"
    );
    Ok(())
}

/// Physical extremum as the writer will print it: the shortest decimal of
/// at most 8 characters, rounded outwards.
fn fitted(value: f64, up: bool) -> Result<f64> {
    let text = fit_number(value, FIELD_WIDTH, up)?;
    text.parse()
        .map_err(|_| Error::Edf(format!("physical extremum `{text}`")))
}

/// Shortest decimal rendering of `value` that fits in `width` characters,
/// rounded towards `+∞` when `up` and towards `-∞` otherwise.
fn fit_number(value: f64, width: usize, up: bool) -> Result<String> {
    for decimals in (0..width).rev() {
        let scale = 10f64.powi(decimals as i32);
        let scaled = value * scale;
        let rounded = if up { scaled.ceil() } else { scaled.floor() } / scale;
        let s = format!("{rounded:.decimals$}");
        let s = trim_decimal(&s);
        if s.len() <= width {
            return Ok(s);
        }
    }
    Err(Error::Edf(format!("value {value} does not fit in {width} characters")))
}

fn trim_decimal(s: &str) -> String {
    let s = if s.contains('.') { s.trim_end_matches('0').trim_end_matches('.') } else { s };
    match s {
        "-0" | "" => "0".to_string(),
        _ => s.to_string(),
    }
}

/// `EdfWriter` always stamps 01.01.85 and an anonymous recording field;
/// overwrite both in place with the real start and the sample count.
fn stamp_recording(path: &Path, start: NaiveDateTime, n_samples: usize) -> Result<()> {
    let recording = format!(
        "Startdate {} X X X {SAMPLES_TAG}{n_samples}",
        start.format("%d-%b-%Y").to_string().to_uppercase()
    );
    let mut field = [b' '; 80];
    let len = recording.len().min(field.len());
    field[..len].copy_from_slice(&recording.as_bytes()[..len]);

    let mut file = OpenOptions::new().write(true).open(path)?;
    file.seek(SeekFrom::Start(88))?;
    file.write_all(&field)?;
    file.write_all(start.format("%d.%m.%y").to_string().as_bytes())?;
    file.write_all(start.format("%H.%M.%S").to_string().as_bytes())?;
    file.flush()?;
    Ok(())
}

/// Sample count written by [`write_edf`], if the file carries one.
fn recorded_samples(header: &edfplus::EdfHeader) -> Option<usize> {
    [
        &header.admin_code,
        &header.technician,
        &header.equipment,
        &header.recording_additional,
    ]
    .into_iter()
    .flat_map(|field| field.split_whitespace())
    .find_map(|token| token.strip_prefix(SAMPLES_TAG)?.parse().ok())
}

/// Start `EdfWriter` stamps when none is given.
pub fn default_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1985, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn fit_number_rounds_outwards() {
        assert_eq!(fit_number(123.456789, 8, true).unwrap(), "123.4568");
        assert_eq!(fit_number(123.456789, 8, false).unwrap(), "123.4567");
        assert_eq!(fit_number(-1234.56789, 8, false).unwrap(), "-1234.57");
        assert_eq!(fit_number(-1234.56789, 8, true).unwrap(), "-1234.56");
        assert_eq!(fit_number(5.0, 8, true).unwrap(), "5");
        assert!(fit_number(-123456789.0, 8, false).is_err());
        // The parsed value prints back within the field.
        assert_eq!(format!("{}", fitted(-1234.56789, false).unwrap()), "-1234.57");
    }

    #[test]
    fn layout_prefers_one_second_records() {
        assert_eq!(record_layout(256.0).unwrap(), (1.0, 256));
        assert_eq!(record_layout(250.0).unwrap(), (1.0, 250));
        assert_eq!(record_layout(0.5).unwrap(), (2.0, 1));
        assert_eq!(record_layout(128.5).unwrap(), (2.0, 257));
        assert!(record_layout(0.0).is_err());
        assert!(record_layout(f64::NAN).is_err());
        assert!(record_layout(1.0 / 61.0).is_err());
    }

    #[test]
    fn samples_tag_is_found_in_recording_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tag.edf");
        let data = Array2::from_elem((1, 70), 1.0);
        write_edf(&path, &data, &["Cz".to_string()], 32.0, None).unwrap();
        let reader = EdfReader::open(&path).unwrap();
        assert_eq!(recorded_samples(reader.header()), Some(70));
        assert_eq!(reader.header().datarecords_in_file, 3);
    }

    #[test]
    fn write_then_read_keeps_length_and_start() {
        let fs = 64.0;
        let n_t = 64 * 3 + 10;
        let data = Array2::from_shape_fn((2, n_t), |(c, t)| {
            let x = t as f64 / fs;
            if c == 0 { 50.0 * (2.0 * std::f64::consts::PI * 3.0 * x).sin() } else { -20.0 + x }
        });
        let labels = vec!["Fp1".to_string(), "Fp2".to_string()];
        let start = NaiveDate::from_ymd_opt(2021, 3, 4).unwrap().and_hms_opt(5, 6, 7).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.edf");
        write_edf(&path, &data, &labels, fs, Some(start)).unwrap();

        let rec = read_edf(&path).unwrap();
        assert_eq!(rec.start, start);
        assert_eq!(rec.labels(), labels);
        assert_eq!(rec.duration_secs(), n_t as f64 / fs);
        for (c, sig) in rec.signals.iter().enumerate() {
            assert_eq!(sig.fs, fs);
            assert_eq!(sig.physical_dimension, "uV");
            assert_eq!(sig.samples.len(), n_t);
            let range = data.row(c).iter().fold(0.0f64, |m, v| m.max(v.abs())) * 2.0 + 2.0;
            let step = range / (DIGITAL_MAX - DIGITAL_MIN) as f64;
            for t in 0..n_t {
                assert_abs_diff_eq!(sig.samples[t], data[[c, t]], epsilon = step);
            }
        }
    }

    #[test]
    fn flat_channel_still_writable() {
        let data = Array2::<f64>::zeros((1, 32));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.edf");
        write_edf(&path, &data, &["Cz".to_string()], 32.0, None).unwrap();
        let rec = read_edf(&path).unwrap();
        assert_eq!(rec.start, default_start());
        assert!(rec.signals[0].samples.iter().all(|v| v.abs() < 1e-3));
    }

    #[test]
    fn rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.edf");
        let mut data = Array2::<f64>::zeros((1, 8));
        assert!(write_edf(&path, &data, &[], 8.0, None).is_err());
        let late = NaiveDate::from_ymd_opt(2090, 1, 1).unwrap().and_hms_opt(0, 0, 0);
        assert!(write_edf(&path, &data, &["Cz".to_string()], 8.0, late).is_err());
        data[[0, 3]] = f64::NAN;
        assert!(write_edf(&path, &data, &["Cz".to_string()], 8.0, None).is_err());
    }
}
