//! Stage 2: Fourier-domain processing of per-subvector amplitudes.

use crate::error::{ScatterError, ScatterResult};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What stage 2 does with an amplitude signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalProcessing {
    /// Time autocorrelation through a zero-padded FFT.
    #[default]
    Autocorrelate,
    /// Per-frame intensity |A(t)|^2.
    Square,
}

/// Planned transform for signals of a fixed frame count.
///
/// Plans are shared across transform workers; `Fft::process` only needs `&self`.
pub struct CorrelationTransform {
    frame_count: usize,
    processing: SignalProcessing,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl CorrelationTransform {
    pub fn new(frame_count: usize, processing: SignalProcessing) -> Self {
        let padded = 2 * frame_count;
        let mut planner = FftPlanner::new();
        Self {
            frame_count,
            processing,
            forward: planner.plan_fft_forward(padded),
            inverse: planner.plan_fft_inverse(padded),
        }
    }

    pub fn apply(&self, signal: &[Complex64]) -> ScatterResult<Vec<Complex64>> {
        if signal.len() != self.frame_count {
            return Err(ScatterError::SignalLength {
                expected: self.frame_count,
                actual: signal.len(),
            });
        }

        match self.processing {
            SignalProcessing::Square => Ok(signal
                .iter()
                .map(|a| Complex64::new(a.norm_sqr(), 0.0))
                .collect()),
            SignalProcessing::Autocorrelate => Ok(self.autocorrelate(signal)),
        }
    }

    /// `C(k) = 1/(NF-k) * sum_t A(t+k) * conj(A(t))` for k in 0..NF.
    fn autocorrelate(&self, signal: &[Complex64]) -> Vec<Complex64> {
        let n = self.frame_count;
        let padded = 2 * n;

        let mut buffer = vec![Complex64::new(0.0, 0.0); padded];
        buffer[..n].copy_from_slice(signal);

        self.forward.process(&mut buffer);
        for x in buffer.iter_mut() {
            *x = Complex64::new(x.norm_sqr(), 0.0);
        }
        self.inverse.process(&mut buffer);

        let norm = 1.0 / padded as f64;
        buffer
            .iter()
            .take(n)
            .enumerate()
            .map(|(k, v)| *v * (norm / (n - k) as f64))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct_autocorrelation(a: &[Complex64]) -> Vec<Complex64> {
        let n = a.len();
        (0..n)
            .map(|k| {
                let sum: Complex64 = (0..n - k).map(|t| a[t + k] * a[t].conj()).sum();
                sum / (n - k) as f64
            })
            .collect()
    }

    #[test]
    fn test_autocorrelation_matches_direct_sum() {
        let signal: Vec<Complex64> = (0..13)
            .map(|t| Complex64::from_polar(1.0 + 0.1 * t as f64, 0.37 * t as f64))
            .collect();

        let transform = CorrelationTransform::new(13, SignalProcessing::Autocorrelate);
        let fast = transform.apply(&signal).unwrap();
        let slow = direct_autocorrelation(&signal);

        for (f, s) in fast.iter().zip(&slow) {
            assert!((f - s).norm() < 1e-10, "{} vs {}", f, s);
        }
    }

    #[test]
    fn test_constant_signal_flat_correlation() {
        let signal = vec![Complex64::new(2.0, 0.0); 8];
        let transform = CorrelationTransform::new(8, SignalProcessing::Autocorrelate);
        let c = transform.apply(&signal).unwrap();

        for v in c {
            assert!((v.re - 4.0).abs() < 1e-10);
            assert!(v.im.abs() < 1e-10);
        }
    }

    #[test]
    fn test_square() {
        let signal = vec![Complex64::new(3.0, 4.0), Complex64::new(0.0, 1.0)];
        let transform = CorrelationTransform::new(2, SignalProcessing::Square);
        let out = transform.apply(&signal).unwrap();
        assert_eq!(out, vec![Complex64::new(25.0, 0.0), Complex64::new(1.0, 0.0)]);
    }

    #[test]
    fn test_wrong_length() {
        let transform = CorrelationTransform::new(4, SignalProcessing::Autocorrelate);
        assert!(matches!(
            transform.apply(&[Complex64::new(1.0, 0.0)]),
            Err(ScatterError::SignalLength { expected: 4, actual: 1 })
        ));
    }
}
