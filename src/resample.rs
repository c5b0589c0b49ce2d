//! FFT resampling of `[C, T]` recordings.
//!
//! Each row is reflect-padded to a power of two, transformed, cut or
//! zero-extended to the new length in the frequency domain and transformed
//! back. Cutting the spectrum is the anti-alias filter when downsampling;
//! zero-extension is the interpolator when upsampling. The shared Nyquist
//! bin is split or merged so the transform stays real.
//!
//! Output length is always `round(n_in * dst / src)`, so the recording
//! duration changes by less than half a target sample period.
use ndarray::{Array2, ArrayView1};
use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::{Error, Result};

/// Left and right padding that brings `n` samples, plus at least
/// `2 * min(n / 8, 100)` extra, up to the next power of two.
pub fn auto_npad(n: usize) -> (usize, usize) {
    if n == 0 {
        return (0, 0);
    }
    let min_add = (n / 8).min(100) * 2;
    let sum = n + min_add;
    let next_pow2 = sum.next_power_of_two();
    let total = next_pow2 - n;
    (total / 2, total - total / 2)
}

/// Number of samples after resampling `n` samples by `ratio = dst / src`.
pub fn output_length(n: usize, ratio: f64) -> usize {
    (n as f64 * ratio).round() as usize
}

/// Resample `data` ([C, T]) from `src_sfreq` to `dst_sfreq`.
///
/// Returns a clone when the two rates are equal.
pub fn resample(data: &Array2<f64>, src_sfreq: f64, dst_sfreq: f64) -> Result<Array2<f64>> {
    if !(src_sfreq > 0.0 && dst_sfreq > 0.0) {
        return Err(Error::InvalidSignal(format!(
            "sampling rates must be positive (src={src_sfreq}, dst={dst_sfreq})"
        )));
    }
    if src_sfreq == dst_sfreq {
        return Ok(data.clone());
    }
    let ratio = dst_sfreq / src_sfreq;
    let n_in = data.ncols();
    let final_len = output_length(n_in, ratio);
    let n_ch = data.nrows();

    let (npad_l, npad_r) = auto_npad(n_in);
    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let mut out = Array2::<f64>::zeros((n_ch, final_len));
    for ch in 0..n_ch {
        let row: Vec<f64> = data.row(ch).to_vec();
        let resampled = resample_1d_with(&mut planner, &row, ratio, npad_l, npad_r);
        out.row_mut(ch).assign(&ArrayView1::from(&resampled));
    }
    tracing::debug!(
        n_ch,
        n_in,
        n_out = final_len,
        src_sfreq,
        dst_sfreq,
        "resampled"
    );
    Ok(out)
}

/// Resample a single 1-D signal by `ratio` with explicit (possibly asymmetric) padding.
pub fn resample_1d(x: &[f64], ratio: f64, npad_l: usize, npad_r: usize) -> Vec<f64> {
    let mut planner: FftPlanner<f64> = FftPlanner::new();
    resample_1d_with(&mut planner, x, ratio, npad_l, npad_r)
}

fn resample_1d_with(
    planner: &mut FftPlanner<f64>,
    x: &[f64],
    ratio: f64,
    npad_l: usize,
    npad_r: usize,
) -> Vec<f64> {
    let n_in = x.len();
    let final_len = output_length(n_in, ratio);
    if n_in == 0 || final_len == 0 {
        return vec![0.0; final_len];
    }

    // Reflect, at most n - 1 samples per side.
    let pad_l = npad_l.min(n_in - 1);
    let pad_r = npad_r.min(n_in - 1);
    let old_len = n_in + pad_l + pad_r;

    let mut x_ext = Vec::with_capacity(old_len);
    for i in (1..=pad_l).rev() {
        x_ext.push(2.0 * x[0] - x[i]);
    }
    x_ext.extend_from_slice(x);
    let last = x[n_in - 1];
    for i in 1..=pad_r {
        let idx = (n_in - 1).saturating_sub(i);
        x_ext.push(2.0 * last - x[idx]);
    }

    let new_len_padded = output_length(old_len, ratio).max(1);
    let shorter = new_len_padded < old_len;
    let use_len = if shorter { new_len_padded } else { old_len };

    let fft = planner.plan_fft_forward(old_len);
    let mut buf: Vec<Complex<f64>> = x_ext.iter().map(|&v| Complex { re: v, im: 0.0 }).collect();
    fft.process(&mut buf);

    let rfft_len = old_len / 2 + 1;
    let mut x_fft: Vec<Complex<f64>> = buf[..rfft_len].to_vec();

    // Nyquist bin of the shorter spectrum.
    if use_len % 2 == 0 {
        let nyq = use_len / 2;
        if nyq < x_fft.len() {
            let factor = if shorter { 2.0 } else { 0.5 };
            x_fft[nyq] *= factor;
        }
    }

    let scale = new_len_padded as f64 / old_len as f64;
    for v in &mut x_fft {
        *v *= scale;
    }

    let new_rfft_len = new_len_padded / 2 + 1;
    let mut irfft_in = vec![Complex::<f64>::default(); new_len_padded];
    let n_copy = x_fft.len().min(new_rfft_len);
    irfft_in[..n_copy].copy_from_slice(&x_fft[..n_copy]);

    // Hermitian symmetry for the upper half.
    for i in 1..new_rfft_len {
        let idx = new_len_padded - i;
        if idx >= new_rfft_len {
            irfft_in[idx] = irfft_in[i].conj();
        }
    }
    // The real part of an even-length Nyquist bin is all irfft keeps.
    if new_len_padded % 2 == 0 {
        let nyq = new_len_padded / 2;
        irfft_in[nyq].im = 0.0;
    }

    let ifft = planner.plan_fft_inverse(new_len_padded);
    ifft.process(&mut irfft_in);
    let inv_scale = 1.0 / new_len_padded as f64;

    // Padding scaled by the same ratio.
    let to_remove_l = output_length(pad_l, ratio).min(new_len_padded);
    let strip_end = (to_remove_l + final_len).min(new_len_padded);

    let mut result: Vec<f64> = irfft_in[to_remove_l..strip_end]
        .iter()
        .map(|c| c.re * inv_scale)
        .collect();
    result.resize(final_len, 0.0);
    result
}
