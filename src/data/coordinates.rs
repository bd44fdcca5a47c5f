//! Staged coordinate data for the atoms assigned to this process.

use super::sample::Sample;
use crate::error::{ScatterError, ScatterResult};
use nalgebra::Vector3;
use ndarray::{Array3, ArrayView2, Axis};
use rayon::prelude::*;

/// Frame-major positions of the staged atoms: (frame, atom, xyz).
///
/// Populated once by staging and read-only for the rest of the run.
#[derive(Clone, Debug, PartialEq)]
pub struct CoordinateSet {
    positions: Array3<f64>,
}

impl CoordinateSet {
    /// Wrap an already laid-out (frame, atom, xyz) array.
    pub fn new(positions: Array3<f64>) -> Self {
        Self { positions }
    }

    /// Gather positions for `atoms` out of `sample`, adding the translation
    /// of every motion attached to each atom. Frames are gathered in parallel.
    pub fn stage(sample: &Sample, atoms: &[usize]) -> ScatterResult<Self> {
        let frame_count = sample.frame_count();
        let atom_count = atoms.len();

        if let Some(&bad) = atoms.iter().find(|&&a| a >= sample.atom_count()) {
            return Err(ScatterError::Staging(format!(
                "atom index {} outside sample of {} atoms",
                bad,
                sample.atom_count()
            )));
        }

        let motions: Vec<_> = atoms.iter().map(|&a| sample.motions_for(a)).collect();
        let mut flat = vec![0.0; frame_count * atom_count * 3];

        if atom_count > 0 {
            flat.par_chunks_mut(atom_count * 3)
                .enumerate()
                .for_each(|(frame, chunk)| {
                    for (slot, &atom) in atoms.iter().enumerate() {
                        let mut p = sample.position(frame, atom);
                        for motion in &motions[slot] {
                            p += motion.translation(frame);
                        }
                        chunk[slot * 3..slot * 3 + 3].copy_from_slice(p.as_slice());
                    }
                });
        }

        let positions = Array3::from_shape_vec((frame_count, atom_count, 3), flat)?;
        Ok(Self { positions })
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.positions.shape()[0]
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.positions.shape()[1]
    }

    /// Positions of every staged atom at `frame`, one row per atom.
    #[inline]
    pub fn frame(&self, frame: usize) -> ArrayView2<'_, f64> {
        self.positions.index_axis(Axis(0), frame)
    }

    #[inline]
    pub fn position(&self, frame: usize, atom: usize) -> Vector3<f64> {
        Vector3::new(
            self.positions[[frame, atom, 0]],
            self.positions[[frame, atom, 1]],
            self.positions[[frame, atom, 2]],
        )
    }

    /// Bytes held by the staged positions.
    pub fn byte_size(&self) -> usize {
        self.positions.len() * std::mem::size_of::<f64>()
    }
}

/// Per-atom scattering weights for the staged atoms.
#[derive(Clone, Debug, PartialEq)]
pub struct ScatterFactors {
    lengths: Vec<f64>,
    background: f64,
}

impl ScatterFactors {
    /// Collect scattering lengths for `atoms`, to be reduced by `background`.
    pub fn for_atoms(sample: &Sample, atoms: &[usize], background: f64) -> Self {
        let lengths = atoms
            .iter()
            .map(|&a| sample.atoms()[a].scattering_length)
            .collect();
        Self {
            lengths,
            background,
        }
    }

    pub fn from_lengths(lengths: Vec<f64>, background: f64) -> Self {
        Self {
            lengths,
            background,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Scattering length of staged atom `slot` with the background removed.
    #[inline]
    pub fn effective(&self, slot: usize) -> f64 {
        self.lengths[slot] - self.background
    }

    pub fn background(&self) -> f64 {
        self.background
    }

    /// Total background-corrected scattering length of the staged atoms.
    pub fn total(&self) -> f64 {
        (0..self.lengths.len()).map(|slot| self.effective(slot)).sum()
    }
}
