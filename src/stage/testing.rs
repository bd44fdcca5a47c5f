//! Synthetic kernels for exercising the pipeline in tests.

use super::traits::{ScatterKernel, SubvectorWorkItem};
use crate::data::{PartialSignal, ReducedSignal};
use crate::error::{ScatterError, ScatterResult};
use num_complex::Complex64;
use rand::Rng;
use std::thread;
use std::time::Duration;

pub const TEST_FRAMES: usize = 6;

/// Signal linear in q with integer-valued samples, so sums are exact in
/// any order: `A(t) = (q.x * (t + 1) + q.z, q.y)`, transform doubles it.
pub struct LinearKernel;

impl ScatterKernel for LinearKernel {
    fn frame_count(&self) -> usize {
        TEST_FRAMES
    }

    fn generate(&self, item: &SubvectorWorkItem) -> ScatterResult<PartialSignal> {
        let q = item.q;
        let data = (0..TEST_FRAMES)
            .map(|t| Complex64::new(q.x * (t + 1) as f64 + q.z, q.y))
            .collect();
        Ok(PartialSignal::new(item.id, data))
    }

    fn transform(&self, partial: PartialSignal) -> ScatterResult<ReducedSignal> {
        let data = partial.data.iter().map(|v| *v * 2.0).collect();
        Ok(ReducedSignal::new(partial.origin, data))
    }
}

/// Wraps a kernel and sleeps a random time before each stage.
pub struct JitterKernel<K> {
    inner: K,
    max_micros: u64,
}

impl<K> JitterKernel<K> {
    pub fn new(inner: K, max_micros: u64) -> Self {
        Self { inner, max_micros }
    }

    fn pause(&self) {
        let micros = rand::thread_rng().gen_range(0..=self.max_micros);
        thread::sleep(Duration::from_micros(micros));
    }
}

impl<K: ScatterKernel> ScatterKernel for JitterKernel<K> {
    fn frame_count(&self) -> usize {
        self.inner.frame_count()
    }

    fn generate(&self, item: &SubvectorWorkItem) -> ScatterResult<PartialSignal> {
        self.pause();
        self.inner.generate(item)
    }

    fn transform(&self, partial: PartialSignal) -> ScatterResult<ReducedSignal> {
        self.pause();
        self.inner.transform(partial)
    }
}

/// Fails stage 1 for one work item id.
pub struct FailingKernel {
    pub fail_on: usize,
}

impl ScatterKernel for FailingKernel {
    fn frame_count(&self) -> usize {
        TEST_FRAMES
    }

    fn generate(&self, item: &SubvectorWorkItem) -> ScatterResult<PartialSignal> {
        if item.id == self.fail_on {
            return Err(ScatterError::InvalidArgument(format!(
                "subvector {} rejected",
                item.id
            )));
        }
        LinearKernel.generate(item)
    }

    fn transform(&self, partial: PartialSignal) -> ScatterResult<ReducedSignal> {
        LinearKernel.transform(partial)
    }
}

/// Panics inside stage 2.
pub struct PanickingKernel;

impl ScatterKernel for PanickingKernel {
    fn frame_count(&self) -> usize {
        TEST_FRAMES
    }

    fn generate(&self, item: &SubvectorWorkItem) -> ScatterResult<PartialSignal> {
        LinearKernel.generate(item)
    }

    fn transform(&self, _partial: PartialSignal) -> ScatterResult<ReducedSignal> {
        panic!("transform blew up");
    }
}
