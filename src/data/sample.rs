//! Sample: atoms, trajectory frames, named selections and attached motions.

use nalgebra::Vector3;
use ndarray::Array3;
use std::collections::HashMap;
use std::sync::Arc;

/// Name of the selection that always covers every atom.
pub const SYSTEM_SELECTION: &str = "system";

/// A single atom of the sample.
#[derive(Clone, Debug, PartialEq)]
pub struct Atom {
    /// Atom or element label.
    pub name: String,
    /// Scattering length used to weight the atom's amplitude.
    pub scattering_length: f64,
}

impl Atom {
    pub fn new(name: impl Into<String>, scattering_length: f64) -> Self {
        Self {
            name: name.into(),
            scattering_length,
        }
    }
}

/// Displacement applied to a selection on top of the recorded trajectory.
///
/// Concrete generators (random walks, oscillations, linear drift, ...) live
/// outside this crate; staging only asks for the translation at each frame.
pub trait Motion: Send + Sync {
    /// Translation to add to every affected atom at `frame`.
    fn translation(&self, frame: usize) -> Vector3<f64>;
}

/// A molecular sample with its trajectory.
#[derive(Clone)]
pub struct Sample {
    atoms: Vec<Atom>,
    /// Positions, indexed (frame, atom, xyz).
    trajectory: Array3<f64>,
    selections: HashMap<String, Vec<usize>>,
    motions: Vec<(String, Arc<dyn Motion>)>,
}

impl Sample {
    /// Create a new sample from per-frame atom positions.
    pub fn new(atoms: Vec<Atom>, frames: Vec<Vec<Vector3<f64>>>) -> Result<Self, SampleError> {
        if frames.is_empty() {
            return Err(SampleError::EmptyTrajectory);
        }

        let atom_count = atoms.len();
        let mut flat = Vec::with_capacity(frames.len() * atom_count * 3);
        for (frame, positions) in frames.iter().enumerate() {
            if positions.len() != atom_count {
                return Err(SampleError::FrameLengthMismatch {
                    frame,
                    expected: atom_count,
                    actual: positions.len(),
                });
            }
            for p in positions {
                flat.extend_from_slice(&[p.x, p.y, p.z]);
            }
        }

        let trajectory = Array3::from_shape_vec((frames.len(), atom_count, 3), flat)
            .map_err(|e| SampleError::Shape(e.to_string()))?;

        Ok(Self::from_parts(atoms, trajectory))
    }

    /// Create from a flat frame-major buffer (frame, atom, xyz).
    pub fn from_flat(
        atoms: Vec<Atom>,
        positions: Vec<f64>,
        frame_count: usize,
    ) -> Result<Self, SampleError> {
        if frame_count == 0 {
            return Err(SampleError::EmptyTrajectory);
        }
        let expected = frame_count * atoms.len() * 3;
        if positions.len() != expected {
            return Err(SampleError::BufferLengthMismatch {
                expected,
                actual: positions.len(),
            });
        }

        let trajectory = Array3::from_shape_vec((frame_count, atoms.len(), 3), positions)
            .map_err(|e| SampleError::Shape(e.to_string()))?;

        Ok(Self::from_parts(atoms, trajectory))
    }

    fn from_parts(atoms: Vec<Atom>, trajectory: Array3<f64>) -> Self {
        let mut selections = HashMap::new();
        selections.insert(SYSTEM_SELECTION.to_string(), (0..atoms.len()).collect());

        Self {
            atoms,
            trajectory,
            selections,
            motions: Vec::new(),
        }
    }

    /// Get the number of atoms.
    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Get the number of trajectory frames.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.trajectory.shape()[0]
    }

    #[inline]
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Position of `atom` at `frame`, without motions applied.
    #[inline]
    pub fn position(&self, frame: usize, atom: usize) -> Vector3<f64> {
        Vector3::new(
            self.trajectory[[frame, atom, 0]],
            self.trajectory[[frame, atom, 1]],
            self.trajectory[[frame, atom, 2]],
        )
    }

    /// Register a named selection of atom indices.
    pub fn add_selection(
        &mut self,
        name: impl Into<String>,
        indices: Vec<usize>,
    ) -> Result<(), SampleError> {
        let len = self.atoms.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(SampleError::IndexOutOfBounds { index, len });
        }
        self.selections.insert(name.into(), indices);
        Ok(())
    }

    /// Atom indices of a named selection.
    pub fn selection(&self, name: &str) -> Option<&[usize]> {
        self.selections.get(name).map(|v| v.as_slice())
    }

    /// Attach a motion to every atom of a selection.
    pub fn add_motion(
        &mut self,
        selection: impl Into<String>,
        motion: Arc<dyn Motion>,
    ) -> Result<(), SampleError> {
        let selection = selection.into();
        if !self.selections.contains_key(&selection) {
            return Err(SampleError::UnknownSelection(selection));
        }
        self.motions.push((selection, motion));
        Ok(())
    }

    /// Motions affecting `atom`.
    pub fn motions_for(&self, atom: usize) -> Vec<Arc<dyn Motion>> {
        self.motions
            .iter()
            .filter(|(name, _)| {
                self.selections
                    .get(name)
                    .is_some_and(|indices| indices.contains(&atom))
            })
            .map(|(_, motion)| motion.clone())
            .collect()
    }
}

/// Errors that can occur when creating/manipulating samples.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SampleError {
    #[error("trajectory has no frames")]
    EmptyTrajectory,
    #[error("frame {frame} has {actual} positions, expected {expected}")]
    FrameLengthMismatch {
        frame: usize,
        expected: usize,
        actual: usize,
    },
    #[error("position buffer has {actual} values, expected {expected}")]
    BufferLengthMismatch { expected: usize, actual: usize },
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("unknown selection '{0}'")]
    UnknownSelection(String),
    #[error("trajectory shape: {0}")]
    Shape(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shift(f64);

    impl Motion for Shift {
        fn translation(&self, frame: usize) -> Vector3<f64> {
            Vector3::new(self.0 * frame as f64, 0.0, 0.0)
        }
    }

    fn make_sample() -> Sample {
        let atoms = vec![Atom::new("H", 1.0), Atom::new("O", 2.0)];
        let frames = vec![
            vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0)],
            vec![Vector3::new(0.0, 1.0, 0.0), Vector3::new(1.0, 1.0, 0.0)],
            vec![Vector3::new(0.0, 2.0, 0.0), Vector3::new(1.0, 2.0, 3.0)],
        ];
        Sample::new(atoms, frames).unwrap()
    }

    #[test]
    fn test_sample_creation() {
        let sample = make_sample();

        assert_eq!(sample.atom_count(), 2);
        assert_eq!(sample.frame_count(), 3);
        assert_eq!(sample.position(2, 1), Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(sample.selection(SYSTEM_SELECTION), Some(&[0, 1][..]));
    }

    #[test]
    fn test_frame_length_mismatch() {
        let atoms = vec![Atom::new("H", 1.0), Atom::new("O", 2.0)];
        let frames = vec![vec![Vector3::zeros(), Vector3::zeros()], vec![Vector3::zeros()]];

        let result = Sample::new(atoms, frames);
        assert!(matches!(
            result,
            Err(SampleError::FrameLengthMismatch { frame: 1, .. })
        ));
    }

    #[test]
    fn test_empty_trajectory_rejected() {
        let result = Sample::new(vec![Atom::new("H", 1.0)], Vec::new());
        assert_eq!(result.err(), Some(SampleError::EmptyTrajectory));
    }

    #[test]
    fn test_flat_buffer_layout() {
        let atoms = vec![Atom::new("H", 1.0), Atom::new("O", 2.0)];
        let positions = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let sample = Sample::from_flat(atoms, positions, 2).unwrap();

        assert_eq!(sample.position(0, 1), Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(sample.position(1, 0), Vector3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_selection_bounds() {
        let mut sample = make_sample();
        assert!(sample.add_selection("oxygen", vec![1]).is_ok());
        assert_eq!(
            sample.add_selection("bad", vec![0, 5]),
            Err(SampleError::IndexOutOfBounds { index: 5, len: 2 })
        );
    }

    #[test]
    fn test_motions_follow_selection() {
        let mut sample = make_sample();
        sample.add_selection("oxygen", vec![1]).unwrap();
        sample.add_motion("oxygen", Arc::new(Shift(0.5))).unwrap();

        assert!(sample.motions_for(0).is_empty());
        assert_eq!(sample.motions_for(1).len(), 1);
        assert!(sample.add_motion("missing", Arc::new(Shift(1.0))).is_err());
    }
}
