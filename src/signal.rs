//! The EEG signal container and the canonical standardization pipeline.
//!
//! ```text
//! RawRecording / EDF file
//!   │
//!   ├─ EegSignal::load            resolve + reorder requested channels
//!   ├─ EegSignal::resample        FFT resampler → target fs
//!   ├─ EegSignal::select_channels reorder to the target list
//!   ├─ re-reference               common average | referential | bipolar
//!   └─ save_edf / save_tabular
//! ```
//!
//! Every operation mutates the signal in place and checks the montage it
//! requires before touching the data.
use std::path::Path;

use chrono::NaiveDateTime;
use ndarray::{Array2, ArrayView1};

use crate::channels::{resolve_index, split_pair, Montage, BIPOLAR_DBANANA};
use crate::config::{ReferenceScheme, StandardizeConfig, Strictness};
use crate::edf;
use crate::error::{Error, Result};
use crate::io::{self, TabularFormat};
use crate::reference;
use crate::resample;

/// A recording as a vendor reader delivers it: labels, `[C, T]` samples,
/// one sampling rate and an optional start time.
#[derive(Debug, Clone)]
pub struct RawRecording {
    pub channels: Vec<String>,
    pub data: Array2<f64>,
    pub fs: f64,
    pub start_time: Option<NaiveDateTime>,
}

impl RawRecording {
    /// Read a tabular export back. `fs` is used when the format does not
    /// store a sampling rate (CSV).
    pub fn read_tabular<P: AsRef<Path>>(path: P, format: TabularFormat, fs: f64) -> Result<Self> {
        let table = io::read_tabular(path, format)?;
        Ok(RawRecording {
            channels: table.channels,
            data: table.data,
            fs: table.fs.unwrap_or(fs),
            start_time: None,
        })
    }
}

/// Multi-channel EEG: `[C, T]` samples, channel names, sampling rate and
/// montage.
///
/// Invariants: `data.nrows() == channels.len()` and `fs` is finite and
/// positive.
#[derive(Debug, Clone, PartialEq)]
pub struct EegSignal {
    data: Array2<f64>,
    channels: Vec<String>,
    fs: f64,
    montage: Montage,
    start_time: Option<NaiveDateTime>,
}

fn check_fs(fs: f64) -> Result<()> {
    if fs.is_finite() && fs > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidSignal(format!("sampling rate must be positive, got {fs}")))
    }
}

/// Resolve each of `requested` in `available`.
///
/// Returns `(requested name, index)` for every channel found. Missing
/// channels fail the call in strict mode and are logged and dropped in
/// lenient mode.
fn select_indices<S: AsRef<str>, T: AsRef<str>>(
    available: &[S],
    requested: &[T],
    montage: Montage,
    strictness: Strictness,
) -> Result<Vec<(String, usize)>> {
    let mut found = Vec::with_capacity(requested.len());
    let mut missing = Vec::new();
    for name in requested {
        let name = name.as_ref();
        match resolve_index(available, name, montage) {
            Ok(i) => found.push((name.to_string(), i)),
            Err(Error::ChannelNotFound { .. }) => missing.push(name.to_string()),
            Err(e) => return Err(e),
        }
    }
    if missing.is_empty() {
        return Ok(found);
    }
    match strictness {
        Strictness::Strict => Err(Error::MissingChannels(missing)),
        Strictness::Lenient if found.is_empty() => Err(Error::MissingChannels(missing)),
        Strictness::Lenient => {
            for name in &missing {
                tracing::warn!(channel = %name, "channel not found, skipped");
            }
            Ok(found)
        }
    }
}

fn gather_rows(data: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
    let mut out = Array2::<f64>::zeros((indices.len(), data.ncols()));
    for (mut row, &i) in out.rows_mut().into_iter().zip(indices) {
        row.assign(&data.row(i));
    }
    out
}

impl EegSignal {
    /// Build a signal from parts, checking the invariants.
    pub fn new(data: Array2<f64>, channels: Vec<String>, fs: f64, montage: Montage) -> Result<Self> {
        if data.nrows() != channels.len() {
            return Err(Error::InvalidSignal(format!(
                "{} channel names for {} data rows",
                channels.len(),
                data.nrows()
            )));
        }
        check_fs(fs)?;
        Ok(EegSignal { data, channels, fs, montage, start_time: None })
    }

    /// Attach a recording start time.
    pub fn with_start_time(mut self, start_time: Option<NaiveDateTime>) -> Self {
        self.start_time = start_time;
        self
    }

    /// Select and reorder the channels of `raw` that match `requested`.
    ///
    /// Output channels carry the requested (canonical) names, in request
    /// order.
    ///
    /// # Errors
    ///
    /// [`Error::MissingChannels`] when a requested channel cannot be resolved
    /// and `strictness` is [`Strictness::Strict`], or when none resolves.
    pub fn load<S: AsRef<str>>(
        raw: &RawRecording,
        montage: Montage,
        requested: &[S],
        strictness: Strictness,
    ) -> Result<Self> {
        check_fs(raw.fs)?;
        if raw.data.nrows() != raw.channels.len() {
            return Err(Error::InvalidSignal(format!(
                "{} channel names for {} data rows",
                raw.channels.len(),
                raw.data.nrows()
            )));
        }
        let selected = select_indices(&raw.channels, requested, montage, strictness)?;
        let indices: Vec<usize> = selected.iter().map(|&(_, i)| i).collect();
        let data = gather_rows(&raw.data, &indices);
        let channels = selected.into_iter().map(|(name, _)| name).collect();
        Ok(EegSignal::new(data, channels, raw.fs, montage)?.with_start_time(raw.start_time))
    }

    /// Load requested channels from an EDF file.
    ///
    /// Channels stored at different rates are brought to the highest rate
    /// among the selected channels with the FFT resampler, then cut to the
    /// shortest resulting length.
    pub fn load_edf<P: AsRef<Path>, S: AsRef<str>>(
        path: P,
        montage: Montage,
        requested: &[S],
        strictness: Strictness,
    ) -> Result<Self> {
        let rec = edf::read_edf(path)?;
        let labels = rec.labels();
        let selected = select_indices(&labels, requested, montage, strictness)?;

        let fs = selected
            .iter()
            .map(|&(_, i)| rec.signals[i].fs)
            .fold(f64::NEG_INFINITY, f64::max);
        check_fs(fs)?;

        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(selected.len());
        for &(_, i) in &selected {
            let sig = &rec.signals[i];
            if sig.fs == fs {
                rows.push(sig.samples.clone());
            } else {
                tracing::debug!(channel = %sig.label, from = sig.fs, to = fs, "resampling EDF channel");
                let (npad_l, npad_r) = resample::auto_npad(sig.samples.len());
                rows.push(resample::resample_1d(&sig.samples, fs / sig.fs, npad_l, npad_r));
            }
        }
        let n_t = rows.iter().map(Vec::len).min().unwrap_or(0);
        let mut data = Array2::<f64>::zeros((rows.len(), n_t));
        for (mut out, row) in data.rows_mut().into_iter().zip(&rows) {
            out.assign(&ArrayView1::from(&row[..n_t]));
        }

        let channels = selected.into_iter().map(|(name, _)| name).collect();
        Ok(EegSignal::new(data, channels, fs, montage)?.with_start_time(Some(rec.start)))
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    /// `[C, T]` samples.
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn fs(&self) -> f64 {
        self.fs
    }

    pub fn montage(&self) -> Montage {
        self.montage
    }

    pub fn start_time(&self) -> Option<NaiveDateTime> {
        self.start_time
    }

    pub fn n_channels(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Recording duration in seconds, `n_samples / fs`.
    pub fn duration_secs(&self) -> f64 {
        self.n_samples() as f64 / self.fs
    }

    /// Consume the signal, returning its samples and channel names.
    pub fn into_parts(self) -> (Array2<f64>, Vec<String>) {
        (self.data, self.channels)
    }

    fn require(&self, montage: Montage) -> Result<()> {
        if self.montage == montage {
            Ok(())
        } else {
            Err(Error::InvalidMontage { required: montage, actual: self.montage })
        }
    }

    // ── Transforms ──────────────────────────────────────────────────────────

    /// Resample every channel to `target_fs`.
    ///
    /// The result has `round(duration · target_fs)` samples. No-op when the
    /// rate already matches.
    pub fn resample(&mut self, target_fs: f64) -> Result<()> {
        check_fs(target_fs)?;
        if target_fs == self.fs {
            return Ok(());
        }
        self.data = resample::resample(&self.data, self.fs, target_fs)?;
        self.fs = target_fs;
        Ok(())
    }

    /// Reorder to `target`, dropping every other channel.
    pub fn select_channels<S: AsRef<str>>(&mut self, target: &[S], strictness: Strictness) -> Result<()> {
        let selected = select_indices(&self.channels, target, self.montage, strictness)?;
        let indices: Vec<usize> = selected.iter().map(|&(_, i)| i).collect();
        self.data = gather_rows(&self.data, &indices);
        self.channels = selected.into_iter().map(|(name, _)| name).collect();
        Ok(())
    }

    /// Subtract the per-sample mean of all channels. Unipolar only.
    pub fn re_reference_to_common_average(&mut self) -> Result<()> {
        self.require(Montage::Unipolar)?;
        reference::average_reference_inplace(&mut self.data);
        tracing::debug!(n_ch = self.n_channels(), "common-average reference");
        Ok(())
    }

    /// Subtract `ref_channel` from every channel. Unipolar only.
    ///
    /// The reference row becomes all zeros and stays in the signal.
    pub fn re_reference_to_referential(&mut self, ref_channel: &str) -> Result<()> {
        self.require(Montage::Unipolar)?;
        let idx = resolve_index(&self.channels, ref_channel, Montage::Unipolar)?;
        reference::referential_inplace(&mut self.data, idx);
        tracing::debug!(reference = %self.channels[idx], "referential reference");
        Ok(())
    }

    /// Derive the double-banana montage. Unipolar in, bipolar out.
    ///
    /// Rows follow `BIPOLAR_DBANANA` order. A pair with an absent electrode
    /// fails the call in strict mode and is omitted in lenient mode.
    pub fn re_reference_to_bipolar(&mut self, strictness: Strictness) -> Result<()> {
        self.require(Montage::Unipolar)?;
        let mut pairs = Vec::with_capacity(BIPOLAR_DBANANA.len());
        let mut names = Vec::with_capacity(BIPOLAR_DBANANA.len());
        let mut missing = Vec::new();
        for pair in BIPOLAR_DBANANA {
            let Some((a, b)) = split_pair(pair) else {
                continue;
            };
            let ia = resolve_index(&self.channels, a, Montage::Unipolar);
            let ib = resolve_index(&self.channels, b, Montage::Unipolar);
            match (ia, ib) {
                (Ok(ia), Ok(ib)) => {
                    pairs.push((ia, ib));
                    names.push(pair.to_string());
                }
                _ => missing.push(pair.to_string()),
            }
        }
        if !missing.is_empty() {
            if strictness == Strictness::Strict || pairs.is_empty() {
                return Err(Error::MissingChannels(missing));
            }
            for pair in &missing {
                tracing::warn!(pair = %pair, "bipolar pair unavailable, skipped");
            }
        }
        self.data = reference::bipolar_derivation(&self.data, &pairs);
        self.channels = names;
        self.montage = Montage::Bipolar;
        tracing::debug!(n_pairs = self.n_channels(), "bipolar derivation");
        Ok(())
    }

    /// Apply `scheme` to a signal already reduced to its target channels.
    fn apply_reference(&mut self, scheme: &ReferenceScheme, strictness: Strictness) -> Result<()> {
        match (scheme, self.montage) {
            // Already a bipolar montage: channel selection did the reorder.
            (ReferenceScheme::Bipolar, Montage::Bipolar) => Ok(()),
            (ReferenceScheme::Bipolar, Montage::Unipolar) => self.re_reference_to_bipolar(strictness),
            (ReferenceScheme::CommonAverage, _) => self.re_reference_to_common_average(),
            (ReferenceScheme::Referential(name), _) => self.re_reference_to_referential(name),
        }
    }

    /// The canonical pipeline: resample to `target_fs`, select
    /// `target_channels` in order, then apply `reference`. Strict about
    /// missing channels.
    pub fn standardize<S: AsRef<str>>(
        &mut self,
        target_fs: f64,
        target_channels: &[S],
        reference: &ReferenceScheme,
    ) -> Result<()> {
        self.standardize_inner(target_fs, target_channels, reference, Strictness::Strict)
    }

    /// [`standardize`](Self::standardize) driven by a [`StandardizeConfig`].
    pub fn standardize_with(&mut self, cfg: &StandardizeConfig) -> Result<()> {
        self.standardize_inner(cfg.target_fs, &cfg.channels, &cfg.reference, cfg.strictness)
    }

    fn standardize_inner<S: AsRef<str>>(
        &mut self,
        target_fs: f64,
        target_channels: &[S],
        reference: &ReferenceScheme,
        strictness: Strictness,
    ) -> Result<()> {
        let (in_ch, in_t, in_fs) = (self.n_channels(), self.n_samples(), self.fs);
        self.resample(target_fs)?;
        self.select_channels(target_channels, strictness)?;
        self.apply_reference(reference, strictness)?;
        tracing::info!(
            in_ch,
            in_t,
            in_fs,
            out_ch = self.n_channels(),
            out_t = self.n_samples(),
            out_fs = self.fs,
            montage = %self.montage,
            reference = %reference,
            "standardized"
        );
        Ok(())
    }

    // ── Export ──────────────────────────────────────────────────────────────

    /// Write the signal as EDF+ (16-bit, per-channel physical range).
    ///
    /// The sample count survives the round trip through [`EegSignal::load_edf`].
    pub fn save_edf<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        edf::write_edf(path, &self.data, &self.channels, self.fs, self.start_time)
    }

    /// Write the signal transposed: one column per channel, one row per sample.
    pub fn save_tabular<P: AsRef<Path>>(&self, path: P, format: TabularFormat) -> Result<()> {
        io::write_tabular(path, &self.channels, &self.data, self.fs, format)
    }
}
