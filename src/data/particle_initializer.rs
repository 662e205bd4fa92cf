//! Particle initializers and the factory selecting them by name.
//!
//! The only initializer known to the factory is the Maxwellian loader, in a
//! Cartesian or a magnetic-field-aligned velocity basis. Any other name is a
//! configuration error.

use std::f64::consts::PI;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::amr_error::AmrError;
use crate::data::particles::{Particle, ParticleArray};
use crate::geometry::index_box::{IndexBox, MAX_DIM};

/// Name under which the Maxwellian initializer is registered.
pub const MAXWELLIAN: &str = "MaxwellianParticleInitializer";

/// Frame in which thermal velocities are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Basis {
    Cartesian,
    /// `thermal_velocity[0]` along the magnetic field, `[1]` across it.
    Magnetic,
}

/// Serializable description of a particle initializer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InitializerInfo {
    pub name: String,
    pub basis: Option<Basis>,
    pub density: f64,
    pub bulk_velocity: [f64; 3],
    pub thermal_velocity: [f64; 3],
    pub magnetic_field: Option<[f64; 3]>,
    pub charge: f64,
    pub nbr_part_per_cell: u32,
    pub seed: u64,
}

impl Default for InitializerInfo {
    fn default() -> Self {
        Self {
            name: MAXWELLIAN.to_string(),
            basis: Some(Basis::Cartesian),
            density: 1.0,
            bulk_velocity: [0.0; 3],
            thermal_velocity: [0.1; 3],
            magnetic_field: None,
            charge: 1.0,
            nbr_part_per_cell: 10,
            seed: 0,
        }
    }
}

/// Loads particles into the cells of a box.
pub trait ParticleInitializer: Send + Sync {
    /// Append the particles of every cell of `cells` to `particles`.
    fn load_particles(&self, particles: &mut ParticleArray, cells: &IndexBox);
}

/// Uniform-density Maxwellian loader.
#[derive(Clone, Debug, PartialEq)]
pub struct MaxwellianParticleInitializer {
    density: f64,
    bulk_velocity: [f64; 3],
    thermal_velocity: [f64; 3],
    charge: f64,
    nbr_part_per_cell: u32,
    seed: u64,
    /// Orthonormal (parallel, perp1, perp2) frame for the magnetic basis.
    frame: Option<[[f64; 3]; 3]>,
}

impl MaxwellianParticleInitializer {
    fn draw_velocity(&self, rng: &mut SmallRng) -> [f64; 3] {
        let n = [normal(rng), normal(rng), normal(rng)];
        let mut v = self.bulk_velocity;
        match &self.frame {
            None => {
                for a in 0..3 {
                    v[a] += self.thermal_velocity[a] * n[a];
                }
            }
            Some(frame) => {
                let amp = [
                    self.thermal_velocity[0] * n[0],
                    self.thermal_velocity[1] * n[1],
                    self.thermal_velocity[1] * n[2],
                ];
                for (axis, k) in frame.iter().zip(amp) {
                    for a in 0..3 {
                        v[a] += k * axis[a];
                    }
                }
            }
        }
        v
    }
}

impl ParticleInitializer for MaxwellianParticleInitializer {
    fn load_particles(&self, particles: &mut ParticleArray, cells: &IndexBox) {
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let dim = cells.dim();
        let weight = self.density / f64::from(self.nbr_part_per_cell.max(1));
        particles.reserve(cells.size() * self.nbr_part_per_cell as usize);
        for cell in cells.indices() {
            for _ in 0..self.nbr_part_per_cell {
                let mut x = [0.0; MAX_DIM];
                for a in 0..dim {
                    x[a] = f64::from(cell[a]) + rng.gen_range(0.0..1.0);
                }
                let v = self.draw_velocity(&mut rng);
                particles.push(Particle::at_position(weight, self.charge, x, v));
            }
        }
        log::trace!(
            "loaded {} particles in {}",
            cells.size() * self.nbr_part_per_cell as usize,
            cells
        );
    }
}

/// Standard normal sample (Box–Muller).
fn normal(rng: &mut SmallRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn magnetic_frame(b: [f64; 3]) -> Result<[[f64; 3]; 3], AmrError> {
    let norm = (b[0] * b[0] + b[1] * b[1] + b[2] * b[2]).sqrt();
    if norm == 0.0 {
        return Err(AmrError::InvalidConfig(
            "magnetic basis needs a non-zero magnetic field".into(),
        ));
    }
    let par = [b[0] / norm, b[1] / norm, b[2] / norm];
    // any axis not parallel to b seeds the perpendicular pair
    let seed = if par[0].abs() < 0.9 {
        [1.0, 0.0, 0.0]
    } else {
        [0.0, 1.0, 0.0]
    };
    let cross = |u: [f64; 3], w: [f64; 3]| {
        [
            u[1] * w[2] - u[2] * w[1],
            u[2] * w[0] - u[0] * w[2],
            u[0] * w[1] - u[1] * w[0],
        ]
    };
    let p1 = cross(par, seed);
    let n1 = (p1[0] * p1[0] + p1[1] * p1[1] + p1[2] * p1[2]).sqrt();
    let p1 = [p1[0] / n1, p1[1] / n1, p1[2] / n1];
    let p2 = cross(par, p1);
    Ok([par, p1, p2])
}

/// Builds particle initializers from their description.
pub struct ParticleInitializerFactory;

impl ParticleInitializerFactory {
    pub fn create(info: &InitializerInfo) -> Result<Box<dyn ParticleInitializer>, AmrError> {
        if info.name != MAXWELLIAN {
            return Err(AmrError::UnknownInitializer(info.name.clone()));
        }
        let basis = info.basis.ok_or_else(|| AmrError::MissingKey("basis".into()))?;
        let frame = match basis {
            Basis::Cartesian => None,
            Basis::Magnetic => {
                let b = info
                    .magnetic_field
                    .ok_or_else(|| AmrError::MissingKey("magnetic_field".into()))?;
                Some(magnetic_frame(b)?)
            }
        };
        if info.nbr_part_per_cell == 0 {
            return Err(AmrError::InvalidConfig(
                "nbr_part_per_cell must be positive".into(),
            ));
        }
        Ok(Box::new(MaxwellianParticleInitializer {
            density: info.density,
            bulk_velocity: info.bulk_velocity,
            thermal_velocity: info.thermal_velocity,
            charge: info.charge,
            nbr_part_per_cell: info.nbr_part_per_cell,
            seed: info.seed,
            frame,
        }))
    }
}
