//! Statevector contractions.

use ndarray::{Array2, ArrayD, IxDyn};
use num_complex::Complex64;

use crate::error::{GradError, GradResult};

/// Compute `⟨bra| O |ket⟩` for an operator acting on some axes of `[2; n]`
/// state tensors.
///
/// `op` is a `2^k × 2^k` matrix whose row index has `axes[0]` as its most
/// significant bit. Axes not listed are contracted as identity.
pub fn matrix_element(
    bra: &ArrayD<Complex64>,
    op: &Array2<Complex64>,
    axes: &[usize],
    ket: &ArrayD<Complex64>,
) -> GradResult<Complex64> {
    let n = ket.ndim();
    if bra.shape() != ket.shape() {
        return Err(GradError::ResultMismatch(format!(
            "bra of shape {:?} does not match ket of shape {:?}",
            bra.shape(),
            ket.shape()
        )));
    }
    let dim = 1usize << axes.len();
    if op.dim() != (dim, dim) {
        return Err(GradError::ResultMismatch(format!(
            "operator of shape {:?} cannot act on {} axes",
            op.shape(),
            axes.len()
        )));
    }
    let mut seen = vec![false; n];
    for &a in axes {
        if a >= n || std::mem::replace(&mut seen[a], true) {
            return Err(GradError::ResultMismatch(format!(
                "invalid axis list {axes:?} for a {n}-wire state"
            )));
        }
    }

    // Operator axes first, spectators after, in their original order.
    let order: Vec<usize> = axes
        .iter()
        .copied()
        .chain((0..n).filter(|a| !seen[*a]))
        .collect();
    let rest = 1usize << (n - axes.len());
    let ket = as_matrix(ket, &order, dim, rest)?;
    let bra = as_matrix(bra, &order, dim, rest)?;

    let applied = op.dot(&ket);
    Ok(bra
        .iter()
        .zip(applied.iter())
        .map(|(b, a)| b.conj() * a)
        .sum())
}

fn as_matrix(
    state: &ArrayD<Complex64>,
    order: &[usize],
    rows: usize,
    cols: usize,
) -> GradResult<Array2<Complex64>> {
    let permuted = state.view().permuted_axes(IxDyn(order));
    Ok(permuted
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order((rows, cols))?)
}
