/// Shared helpers: synthetic recordings and array comparisons.
use eegstd::RawRecording;
use ndarray::Array2;
use std::f64::consts::PI;

#[allow(unused)]
/// Deterministic multi-sine EEG-like data, `[labels.len(), secs · fs]`.
///
/// Channel `c` mixes 3 + c Hz, 10 Hz and a per-channel offset, all well
/// below the Nyquist rate of the rates used in the tests.
pub fn synthetic_data(n_ch: usize, fs: f64, secs: f64) -> Array2<f64> {
    let n_t = (secs * fs).round() as usize;
    Array2::from_shape_fn((n_ch, n_t), |(c, t)| {
        let x = t as f64 / fs;
        let f = 3.0 + c as f64;
        40.0 * (2.0 * PI * f * x).sin() + 15.0 * (2.0 * PI * 10.0 * x + c as f64).cos() + c as f64
    })
}

#[allow(unused)]
/// A raw recording with the given labels, as a vendor reader would yield it.
pub fn synthetic_recording(labels: &[&str], fs: f64, secs: f64) -> RawRecording {
    RawRecording {
        channels: labels.iter().map(|s| s.to_string()).collect(),
        data: synthetic_data(labels.len(), fs, secs),
        fs,
        start_time: None,
    }
}

#[allow(unused)]
/// Vendor-style labels (`EEG XX-REF`, upper case, new temporal names) for
/// the 10-20 set, in a scrambled order.
pub fn vendor_labels() -> Vec<String> {
    let mut labels: Vec<String> = eegstd::ELECTRODES_10_20
        .iter()
        .rev()
        .map(|e| {
            let e = match *e {
                "T3" => "T7",
                "T4" => "T8",
                "T5" => "P7",
                "T6" => "P8",
                other => other,
            };
            format!("EEG {}-REF", e.to_uppercase())
        })
        .collect();
    labels.push("EEG EKG1-REF".to_string());
    labels
}

#[allow(unused)]
/// Maximum absolute difference between two arrays of the same shape.
pub fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).fold(0.0_f64, f64::max)
}

#[allow(unused)]
/// Standard deviation of an array.
pub fn array_std(a: &Array2<f64>) -> f64 {
    let n = a.len() as f64;
    let mean: f64 = a.iter().sum::<f64>() / n;
    let var: f64 = a.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}
