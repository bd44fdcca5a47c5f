//! Scattering vectors and orientational averaging.

use crate::error::{ScatterError, ScatterResult};
use nalgebra::{Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A scattering vector q (direction and magnitude).
pub type ScatteringVector = Vector3<f64>;

/// How a scattering vector is expanded into the subvectors that make up
/// one unit of stage-1 work each.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Averaging {
    /// The vector itself is the only subvector.
    #[default]
    None,
    /// `resolution` directions spread over the sphere of radius |q|.
    Sphere { resolution: usize },
    /// `resolution` rotations of q about `axis`.
    Cylinder { axis: [f64; 3], resolution: usize },
}

impl Averaging {
    pub fn validate(&self) -> ScatterResult<()> {
        match self {
            Averaging::None => Ok(()),
            Averaging::Sphere { resolution } | Averaging::Cylinder { resolution, .. }
                if *resolution == 0 =>
            {
                Err(ScatterError::Config(
                    "averaging resolution must be positive".into(),
                ))
            }
            Averaging::Cylinder { axis, .. } if Vector3::from(*axis).norm() == 0.0 => Err(
                ScatterError::Config("cylinder averaging axis must be non-zero".into()),
            ),
            _ => Ok(()),
        }
    }

    /// Expand `q` into its subvectors.
    ///
    /// A zero-length q always yields exactly one (zero) subvector.
    pub fn subvectors(&self, q: &ScatteringVector) -> ScatterResult<Vec<ScatteringVector>> {
        self.validate()?;

        let magnitude = q.norm();
        if magnitude == 0.0 {
            return Ok(vec![*q]);
        }

        match self {
            Averaging::None => Ok(vec![*q]),
            Averaging::Sphere { resolution } => Ok(fibonacci_sphere(*resolution)
                .into_iter()
                .map(|dir| dir * magnitude)
                .collect()),
            Averaging::Cylinder { axis, resolution } => {
                let axis = Unit::new_normalize(Vector3::from(*axis));
                let step = 2.0 * PI / *resolution as f64;
                Ok((0..*resolution)
                    .map(|k| Rotation3::from_axis_angle(&axis, step * k as f64) * *q)
                    .collect())
            }
        }
    }
}

/// Unit directions on a Fibonacci lattice.
fn fibonacci_sphere(count: usize) -> Vec<Vector3<f64>> {
    if count == 1 {
        return vec![Vector3::z()];
    }

    let golden_angle = PI * (3.0 - 5.0_f64.sqrt());
    (0..count)
        .map(|i| {
            let z = 1.0 - 2.0 * (i as f64 + 0.5) / count as f64;
            let radius = (1.0 - z * z).sqrt();
            let theta = golden_angle * i as f64;
            Vector3::new(radius * theta.cos(), radius * theta.sin(), z)
        })
        .collect()
}
