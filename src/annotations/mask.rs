//! Conversion between annotation sets and sample-level binary masks.
//!
//! A time `t` maps to sample `floor(t · fs + 1e-6)`; an event covers the
//! half-open range `[sample(onset), sample(end))`. The epsilon absorbs the
//! float error of `(k / fs) · fs`, so mask → intervals → mask is exact for
//! any rate.
use ndarray::{Array1, ArrayView1};

use super::{Annotation, AnnotationSet};
use crate::error::{Error, Result};

const GRID_EPS: f64 = 1e-6;

fn sample_index(t: f64, fs: f64) -> usize {
    (t * fs + GRID_EPS).floor().max(0.0) as usize
}

fn check_rate(fs: f64) -> Result<()> {
    if fs.is_finite() && fs > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidAnnotation(format!("mask rate must be positive, got {fs}")))
    }
}

impl AnnotationSet {
    /// Run-length encode the `1` runs of `mask` (sampled at `fs`) into
    /// unspecified-seizure events. The recording lasts `mask.len() / fs`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAnnotation`] for an empty mask, a non-positive rate,
    /// or a value other than 0 and 1.
    pub fn from_mask(mask: ArrayView1<'_, u8>, fs: f64) -> Result<Self> {
        check_rate(fs)?;
        if let Some(v) = mask.iter().find(|&&v| v > 1) {
            return Err(Error::InvalidAnnotation(format!("mask values must be 0 or 1, found {v}")));
        }

        // (first sample, run length) of every run of ones.
        let mut runs = Vec::new();
        let mut run_start = None;
        for (i, &v) in mask.iter().enumerate() {
            match (v, run_start) {
                (1, None) => run_start = Some(i),
                (0, Some(s)) => {
                    runs.push((s, i - s));
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = run_start {
            runs.push((s, mask.len() - s));
        }

        let recording_duration = mask.len() as f64 / fs;
        if runs.is_empty() {
            return AnnotationSet::new(vec![Annotation::background(recording_duration)]);
        }
        AnnotationSet::new(
            runs.into_iter()
                .map(|(s, len)| Annotation::seizure(s as f64 / fs, len as f64 / fs, recording_duration))
                .collect(),
        )
    }

    /// Binary mask of length `round(recording_duration · fs)`: `1` wherever
    /// any seizure record is active. Overlapping events are merged.
    pub fn to_mask(&self, fs: f64) -> Result<Array1<u8>> {
        check_rate(fs)?;
        let n = (self.recording_duration() * fs).round() as usize;
        let mut mask = Array1::<u8>::zeros(n);
        for event in self.iter().filter(|e| e.is_seizure()) {
            let start = sample_index(event.onset, fs).min(n);
            let end = sample_index(event.end(), fs).min(n);
            if start < end {
                mask.slice_mut(ndarray::s![start..end]).fill(1);
            }
        }
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::Annotation;
    use ndarray::array;

    #[test]
    fn scenario_eight_samples() {
        let mask = array![0u8, 0, 1, 1, 1, 0, 0, 0];
        let set = AnnotationSet::from_mask(mask.view(), 1.0).unwrap();
        assert_eq!(set.get_events(), vec![(2.0, 5.0)]);
        assert_eq!(set.to_mask(1.0).unwrap(), mask);
    }

    #[test]
    fn duration_is_run_length_over_rate() {
        let fs = 3.0;
        let mut mask = Array1::<u8>::zeros(40);
        mask.slice_mut(ndarray::s![7..29]).fill(1);
        let set = AnnotationSet::from_mask(mask.view(), fs).unwrap();
        let e = &set.events()[0];
        assert_eq!(e.onset, 7.0 / fs);
        assert_eq!(e.duration, Some(22.0 / fs));
        assert_eq!(set.to_mask(fs).unwrap(), mask);
    }

    #[test]
    fn all_zero_mask_is_background() {
        let mask = Array1::<u8>::zeros(10);
        let set = AnnotationSet::from_mask(mask.view(), 2.0).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.recording_duration(), 5.0);
        assert_eq!(set.to_mask(2.0).unwrap(), mask);
    }

    #[test]
    fn runs_touching_both_edges() {
        let mask = array![1u8, 1, 0, 1, 0, 0, 1];
        let set = AnnotationSet::from_mask(mask.view(), 256.0).unwrap();
        assert_eq!(set.get_events().len(), 3);
        assert_eq!(set.to_mask(256.0).unwrap(), mask);
    }

    #[test]
    fn overlapping_events_are_ored() {
        let set = AnnotationSet::new(vec![
            Annotation::seizure(1.0, 3.0, 8.0),
            Annotation::seizure(2.0, 1.0, 8.0),
        ])
        .unwrap();
        assert_eq!(set.to_mask(1.0).unwrap(), array![0u8, 1, 1, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn mask_at_other_rate() {
        let set = AnnotationSet::from_intervals(&[(1.0, 2.5)], 4.0).unwrap();
        assert_eq!(set.to_mask(2.0).unwrap(), array![0u8, 0, 1, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn rejects_non_binary_values() {
        let mask = array![0u8, 2, 1];
        assert!(AnnotationSet::from_mask(mask.view(), 1.0).is_err());
        assert!(AnnotationSet::from_mask(Array1::<u8>::zeros(0).view(), 1.0).is_err());
        assert!(AnnotationSet::from_mask(mask.view(), 0.0).is_err());
    }
}
