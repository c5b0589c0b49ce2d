//! Re-referencing kernels on `[C, T]` sample matrices.
//!
//! * Common average: `data[c, t] -= mean(data[:, t])`
//! * Referential:    `data[c, t] -= data[ref, t]`
//! * Bipolar:        `out[k, t]  = data[a_k, t] - data[b_k, t]`
//!
//! These operate on bare matrices; montage checks and channel resolution
//! live in [`EegSignal`](crate::signal::EegSignal).
use ndarray::{Array1, Array2, Axis};

/// Subtract the per-timepoint mean across channels, in place.
pub fn average_reference_inplace(data: &mut Array2<f64>) {
    if data.nrows() == 0 {
        return;
    }
    let means = data.sum_axis(Axis(0)) / data.nrows() as f64; // shape [T]
    for mut row in data.rows_mut() {
        row -= &means;
    }
}

/// Subtract row `ref_idx` from every row, in place. Row `ref_idx` becomes zero.
pub fn referential_inplace(data: &mut Array2<f64>, ref_idx: usize) {
    let reference: Array1<f64> = data.row(ref_idx).to_owned();
    for mut row in data.rows_mut() {
        row -= &reference;
    }
}

/// Build a bipolar matrix: one output row per `(a, b)` index pair, `data[a] - data[b]`.
pub fn bipolar_derivation(data: &Array2<f64>, pairs: &[(usize, usize)]) -> Array2<f64> {
    let mut out = Array2::<f64>::zeros((pairs.len(), data.ncols()));
    for (mut row, &(a, b)) in out.rows_mut().into_iter().zip(pairs) {
        row.assign(&(&data.row(a) - &data.row(b)));
    }
    out
}
