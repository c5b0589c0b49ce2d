//! Tabular export of a channel × time matrix.
//!
//! Three on-disk layouts, one row per sample and one column per channel, in
//! `channels` order:
//!
//! | Format | Layout |
//! |---|---|
//! | [`TabularFormat::Csv`] | header row of channel names, then comma-separated samples |
//! | [`TabularFormat::CsvGzip`] | the same, gzip-compressed |
//! | [`TabularFormat::Safetensors`] | `data` `F64 [T, C]`, `ch_names` `U8` (newline-joined), `fs` `F64 [1]` |
//!
//! Floats are written with Rust's shortest round-trip representation, so
//! [`read_tabular`] returns exactly what [`write_tabular`] was given.
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tabular container choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TabularFormat {
    Csv,
    CsvGzip,
    Safetensors,
}

impl TabularFormat {
    /// Conventional file extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            TabularFormat::Csv => "csv",
            TabularFormat::CsvGzip => "csv.gz",
            TabularFormat::Safetensors => "safetensors",
        }
    }

    /// Guess the format from a file name.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let name = path.as_ref().file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".csv.gz") {
            Some(TabularFormat::CsvGzip)
        } else if name.ends_with(".csv") {
            Some(TabularFormat::Csv)
        } else if name.ends_with(".safetensors") {
            Some(TabularFormat::Safetensors)
        } else {
            None
        }
    }
}

/// A matrix read back from a tabular file.
#[derive(Debug, Clone)]
pub struct TabularData {
    pub channels: Vec<String>,
    /// `[C, T]`, the orientation used everywhere else in the crate.
    pub data: Array2<f64>,
    /// Sampling rate, stored only by the safetensors layout.
    pub fs: Option<f64>,
}

/// Write `data` (`[C, T]`) transposed to `path`.
pub fn write_tabular<P: AsRef<Path>>(
    path: P,
    channels: &[String],
    data: &Array2<f64>,
    fs: f64,
    format: TabularFormat,
) -> Result<()> {
    let path = path.as_ref();
    if channels.len() != data.nrows() {
        return Err(Error::Tabular(format!(
            "{} channel names for {} rows",
            channels.len(),
            data.nrows()
        )));
    }
    match format {
        TabularFormat::Csv => {
            write_csv(BufWriter::new(File::create(path)?), channels, data)?.flush()?;
        }
        TabularFormat::CsvGzip => {
            let enc = GzEncoder::new(BufWriter::new(File::create(path)?), Compression::default());
            let enc = write_csv(enc, channels, data)?;
            enc.finish()?.flush()?;
        }
        TabularFormat::Safetensors => {
            let mut w = StWriter::new();
            let samples: Vec<f64> = data.t().iter().copied().collect();
            w.add_f64("data", &samples, &[data.ncols(), data.nrows()]);
            w.add_text("ch_names", &channels.join("\n"));
            w.add_f64("fs", &[fs], &[1]);
            w.write(path)?;
        }
    }
    tracing::debug!(path = %path.display(), ?format, shape = ?data.dim(), "wrote tabular export");
    Ok(())
}

/// Read a file written by [`write_tabular`].
pub fn read_tabular<P: AsRef<Path>>(path: P, format: TabularFormat) -> Result<TabularData> {
    let path = path.as_ref();
    match format {
        TabularFormat::Csv => read_csv(BufReader::new(File::open(path)?)),
        TabularFormat::CsvGzip => read_csv(GzDecoder::new(BufReader::new(File::open(path)?))),
        TabularFormat::Safetensors => read_safetensors(&std::fs::read(path)?),
    }
}

// ── CSV ─────────────────────────────────────────────────────────────────────

fn write_csv<W: Write>(inner: W, channels: &[String], data: &Array2<f64>) -> Result<W> {
    let mut w = csv::Writer::from_writer(inner);
    w.write_record(channels)?;
    for col in data.columns() {
        w.write_record(col.iter().map(|v| v.to_string()))?;
    }
    w.into_inner()
        .map_err(|e| Error::Tabular(format!("flushing CSV: {}", e.error())))
}

fn read_csv<R: Read>(inner: R) -> Result<TabularData> {
    let mut r = csv::Reader::from_reader(inner);
    let channels: Vec<String> = r.headers()?.iter().map(str::to_string).collect();
    let n_ch = channels.len();
    let mut values = Vec::new();
    let mut n_t = 0;
    for (i, record) in r.records().enumerate() {
        let record = record?;
        if record.len() != n_ch {
            return Err(Error::Tabular(format!(
                "row {}: {} fields, expected {n_ch}",
                i + 2,
                record.len()
            )));
        }
        for field in record.iter() {
            let v: f64 = field
                .trim()
                .parse()
                .map_err(|_| Error::Tabular(format!("row {}: invalid number `{field}`", i + 2)))?;
            values.push(v);
        }
        n_t += 1;
    }
    // Rows are samples; flip to [C, T].
    let data = Array2::from_shape_vec((n_t, n_ch), values)
        .map_err(|e| Error::Tabular(e.to_string()))?
        .reversed_axes()
        .as_standard_layout()
        .into_owned();
    Ok(TabularData { channels, data, fs: None })
}

// ── Safetensors ─────────────────────────────────────────────────────────────

/// Minimal safetensors writer for `F64` and `U8` tensors.
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
}

impl Default for StWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl StWriter {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F64", shape.to_vec()));
    }

    /// UTF-8 text stored as a `U8` vector.
    pub fn add_text(&mut self, name: &str, text: &str) {
        let bytes = text.as_bytes().to_vec();
        let len = bytes.len();
        self.entries.push((name.to_string(), bytes, "U8", vec![len]));
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut header_map = serde_json::Map::new();
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            header_map.insert(
                name.clone(),
                serde_json::json!({
                    "dtype": dtype,
                    "shape": shape,
                    "data_offsets": [offset, offset + data.len()],
                }),
            );
            offset += data.len();
        }
        let mut hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;
        hdr_bytes.extend(std::iter::repeat(b' ').take(pad));

        let mut f = BufWriter::new(File::create(path)?);
        f.write_all(&(hdr_bytes.len() as u64).to_le_bytes())?;
        f.write_all(&hdr_bytes)?;
        for (_, data, _, _) in &self.entries {
            f.write_all(data)?;
        }
        f.flush()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TensorEntry {
    dtype: String,
    shape: Vec<usize>,
    data_offsets: [usize; 2],
}

fn parse_header(bytes: &[u8]) -> Result<(HashMap<String, serde_json::Value>, usize)> {
    let prefix: [u8; 8] = bytes
        .get(..8)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| Error::Tabular("safetensors file too small".into()))?;
    let end = usize::try_from(u64::from_le_bytes(prefix))
        .ok()
        .and_then(|n| n.checked_add(8))
        .ok_or_else(|| Error::Tabular("safetensors header length overflows".into()))?;
    let raw = bytes
        .get(8..end)
        .ok_or_else(|| Error::Tabular("safetensors header truncated".into()))?;
    let header: HashMap<String, serde_json::Value> = serde_json::from_slice(raw)?;
    Ok((header, end))
}

fn tensor<'a>(
    bytes: &'a [u8],
    data_start: usize,
    header: &HashMap<String, serde_json::Value>,
    name: &str,
    dtype: &str,
) -> Result<(&'a [u8], Vec<usize>)> {
    let value = header
        .get(name)
        .ok_or_else(|| Error::Tabular(format!("missing tensor `{name}`")))?;
    let entry: TensorEntry = serde_json::from_value(value.clone())?;
    if entry.dtype != dtype {
        return Err(Error::Tabular(format!(
            "tensor `{name}` has dtype {}, expected {dtype}",
            entry.dtype
        )));
    }
    let [s, e] = entry.data_offsets;
    let out_of_bounds = || Error::Tabular(format!("tensor `{name}` out of bounds"));
    let start = data_start.checked_add(s).ok_or_else(out_of_bounds)?;
    let end = data_start.checked_add(e).ok_or_else(out_of_bounds)?;
    let raw = bytes.get(start..end).ok_or_else(out_of_bounds)?;
    Ok((raw, entry.shape))
}

fn f64s(raw: &[u8]) -> Vec<f64> {
    raw.chunks_exact(8)
        .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
        .collect()
}

fn read_safetensors(bytes: &[u8]) -> Result<TabularData> {
    let (header, data_start) = parse_header(bytes)?;

    let (raw, shape) = tensor(bytes, data_start, &header, "data", "F64")?;
    let &[n_t, n_ch] = shape.as_slice() else {
        return Err(Error::Tabular(format!("`data` must be 2-D, got shape {shape:?}")));
    };
    let data = Array2::from_shape_vec((n_t, n_ch), f64s(raw))
        .map_err(|e| Error::Tabular(e.to_string()))?
        .reversed_axes()
        .as_standard_layout()
        .into_owned();

    let (raw, _) = tensor(bytes, data_start, &header, "ch_names", "U8")?;
    let text = std::str::from_utf8(raw).map_err(|e| Error::Tabular(e.to_string()))?;
    let channels: Vec<String> = if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').map(String::from).collect()
    };
    if channels.len() != n_ch {
        return Err(Error::Tabular(format!(
            "{} channel names for {n_ch} columns",
            channels.len()
        )));
    }

    let (raw, _) = tensor(bytes, data_start, &header, "fs", "F64")?;
    let fs = f64s(raw).first().copied();

    Ok(TabularData { channels, data, fs })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Vec<String>, Array2<f64>) {
        let channels = vec!["Fp1".to_string(), "Fp2".to_string(), "Cz".to_string()];
        let data = Array2::from_shape_fn((3, 7), |(c, t)| (c as f64 + 1.0) * 0.1 + t as f64 / 3.0);
        (channels, data)
    }

    #[test]
    fn every_format_round_trips_exactly() {
        let (channels, data) = sample();
        let dir = tempfile::tempdir().unwrap();
        for format in [TabularFormat::Csv, TabularFormat::CsvGzip, TabularFormat::Safetensors] {
            let path = dir.path().join(format!("x.{}", format.extension()));
            write_tabular(&path, &channels, &data, 256.0, format).unwrap();
            assert_eq!(TabularFormat::from_path(&path), Some(format));
            let back = read_tabular(&path, format).unwrap();
            assert_eq!(back.channels, channels);
            assert_eq!(back.data, data);
            if format == TabularFormat::Safetensors {
                assert_eq!(back.fs, Some(256.0));
            }
        }
    }

    #[test]
    fn csv_columns_follow_channel_order() {
        let (channels, data) = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.csv");
        write_tabular(&path, &channels, &data, 1.0, TabularFormat::Csv).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Fp1,Fp2,Cz"));
        let first: Vec<f64> = lines.next().unwrap().split(',').map(|v| v.parse().unwrap()).collect();
        assert_eq!(first, data.column(0).to_vec());
    }

    #[test]
    fn rejects_mismatched_names() {
        let (_, data) = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.csv");
        let err = write_tabular(&path, &["Fp1".to_string()], &data, 1.0, TabularFormat::Csv);
        assert!(matches!(err, Err(Error::Tabular(_))));
    }

    #[test]
    fn truncated_safetensors_is_an_error() {
        assert!(read_safetensors(&[1, 2, 3]).is_err());
        let mut bytes = 100u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        assert!(read_safetensors(&bytes).is_err());
    }

    #[test]
    fn huge_lengths_are_errors() {
        let bytes = u64::MAX.to_le_bytes();
        assert!(matches!(read_safetensors(&bytes), Err(Error::Tabular(_))));

        let header = format!(
            r#"{{"data":{{"dtype":"F64","shape":[1,1],"data_offsets":[{},{}]}}}}"#,
            usize::MAX - 4,
            usize::MAX
        );
        let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&[0; 8]);
        assert!(matches!(read_safetensors(&bytes), Err(Error::Tabular(_))));
    }

    #[test]
    fn csv_file_is_complete_on_return() {
        let (channels, data) = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.csv");
        write_tabular(&path, &channels, &data, 256.0, TabularFormat::Csv).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1 + data.ncols());
    }
}
