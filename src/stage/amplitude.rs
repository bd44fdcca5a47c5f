//! Stage 1: scattering amplitudes from staged coordinates.

use crate::data::{CoordinateSet, ScatterFactors, ScatteringVector};
use num_complex::Complex64;

/// Coherent amplitude per frame: `A(t) = sum_j b_j * exp(i q . r_j(t))`.
pub fn coherent_amplitudes(
    coordinates: &CoordinateSet,
    factors: &ScatterFactors,
    q: &ScatteringVector,
) -> Vec<Complex64> {
    (0..coordinates.frame_count())
        .map(|frame| {
            coordinates
                .frame(frame)
                .rows()
                .into_iter()
                .enumerate()
                .map(|(slot, r)| {
                    let phase = q.x * r[0] + q.y * r[1] + q.z * r[2];
                    Complex64::from_polar(factors.effective(slot), phase)
                })
                .sum()
        })
        .collect()
}
