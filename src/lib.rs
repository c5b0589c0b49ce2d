//! # eegstd: EEG standardization and seizure annotations
//!
//! `eegstd` turns vendor EEG recordings into one canonical representation
//! (fixed channel order, sampling rate and reference) and models seizure
//! annotations as typed events that convert losslessly between interval
//! lists, sample masks and a flat TSV file.
//!
//! ## Pipeline overview
//!
//! ```text
//! vendor reader / EDF file
//!   │
//!   ├─ EegSignal::load / load_edf   channel resolution (case, REF suffix, T3↔T7)
//!   ├─ resample                     FFT resampler → target fs (default 256 Hz)
//!   ├─ select_channels              reorder to the 10-20 or double-banana list
//!   ├─ reference                    common average | referential | bipolar
//!   └─ save_edf / save_tabular      EDF, CSV, CSV.gz, safetensors
//!
//! AnnotationSet
//!   ├─ from_intervals / from_mask / load_tsv / new
//!   └─ to_mask / get_events / save_tsv
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use eegstd::{AnnotationSet, EegSignal, Montage, StandardizeConfig, Strictness, ELECTRODES_10_20};
//!
//! let mut eeg = EegSignal::load_edf(
//!     "data/PN00-5.edf",
//!     Montage::Unipolar,
//!     &ELECTRODES_10_20,
//!     Strictness::Strict,
//! )?;
//! eeg.standardize_with(&StandardizeConfig::default())?;
//! eeg.save_edf("out/sub-00_eeg.edf")?;
//!
//! let events = AnnotationSet::from_intervals(&[(12.0, 47.5)], eeg.duration_secs())?;
//! events.save_tsv("out/sub-00_events.tsv")?;
//! let mask = events.to_mask(eeg.fs())?;
//! assert_eq!(mask.len(), eeg.n_samples());
//! # Ok::<(), eegstd::Error>(())
//! ```
//!
//! Logging goes through [`tracing`]; install a subscriber to see it.

pub mod annotations;
pub mod channels;
pub mod config;
pub mod edf;
pub mod error;
pub mod io;
pub mod reference;
pub mod resample;
pub mod signal;
pub mod taxonomy;

// ── Crate-root re-exports ─────────────────────────────────────────────────

pub use annotations::{Annotation, AnnotationSet, END_TOLERANCE, TSV_HEADER};
pub use channels::{
    bipolar_pair_name, normalize_label, resolve_index, split_pair, Montage, BIPOLAR_DBANANA,
    ELECTRODES_10_20,
};
pub use config::{ReferenceScheme, StandardizeConfig, Strictness};
pub use edf::{read_edf, write_edf, EdfRecording};
pub use error::{Error, Result};
pub use io::{read_tabular, write_tabular, TabularData, TabularFormat};
pub use reference::{average_reference_inplace, bipolar_derivation, referential_inplace};
pub use resample::{auto_npad, output_length, resample, resample_1d};
pub use signal::{EegSignal, RawRecording};
pub use taxonomy::{is_seizure, EventType, SeizureType, EVENTS_JSON};
