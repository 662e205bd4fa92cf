//! Particles and particle arrays.
//!
//! A particle position is stored as the index of the cell it sits in (global
//! cell index of its level) plus the normalized offset inside that cell, so
//! positions stay exact far from the origin and map trivially across
//! periodic images.

use crate::geometry::index_box::{BoxContainer, IndexBox, IntVect, MAX_DIM};
use crate::geometry::transform::Transformation;

/// One macro-particle.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Particle {
    /// Statistical weight.
    pub weight: f64,
    pub charge: f64,
    /// Cell index on the particle's level.
    pub i_cell: IntVect,
    /// Offset inside the cell, each component in `[0, 1)`.
    pub delta: [f64; MAX_DIM],
    pub v: [f64; 3],
}

impl Particle {
    /// Build a particle from a position expressed in cell units.
    pub fn at_position(weight: f64, charge: f64, x: [f64; MAX_DIM], v: [f64; 3]) -> Self {
        let mut i_cell = [0; MAX_DIM];
        let mut delta = [0.0; MAX_DIM];
        for a in 0..MAX_DIM {
            let f = x[a].floor();
            i_cell[a] = f as i32;
            delta[a] = x[a] - f;
        }
        Self {
            weight,
            charge,
            i_cell,
            delta,
            v,
        }
    }

    /// Position in cell units.
    pub fn position(&self) -> [f64; MAX_DIM] {
        let mut x = [0.0; MAX_DIM];
        for (a, xa) in x.iter_mut().enumerate() {
            *xa = f64::from(self.i_cell[a]) + self.delta[a];
        }
        x
    }

    /// Image of the particle under `t`.
    pub fn transformed(&self, t: &Transformation) -> Particle {
        if t.is_identity() {
            return *self;
        }
        let moved = Particle::at_position(
            self.weight,
            self.charge,
            t.apply_position(&self.position()),
            t.apply_velocity(&self.v),
        );
        // axes beyond the transformation's dimension are left untouched
        let dim = t.dim();
        let mut out = *self;
        out.i_cell[..dim].copy_from_slice(&moved.i_cell[..dim]);
        out.delta[..dim].copy_from_slice(&moved.delta[..dim]);
        out.v = moved.v;
        out
    }
}

/// Contiguous particle storage.
pub type ParticleArray = Vec<Particle>;

/// An empty particle array.
pub fn empty() -> ParticleArray {
    Vec::new()
}

/// Move every particle of `from` to the end of `to`.
pub fn append(to: &mut ParticleArray, from: &[Particle]) {
    to.extend_from_slice(from);
}

/// Particles whose cell lies inside `cells`.
pub fn in_box<'a>(
    particles: &'a [Particle],
    cells: &'a IndexBox,
) -> impl Iterator<Item = &'a Particle> + 'a {
    particles.iter().filter(move |p| cells.contains(&p.i_cell))
}

/// Particles whose cell lies inside any box of `cells`.
pub fn in_boxes<'a>(
    particles: &'a [Particle],
    cells: &'a BoxContainer,
) -> impl Iterator<Item = &'a Particle> + 'a {
    particles.iter().filter(move |p| cells.contains(&p.i_cell))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle(x: f64) -> Particle {
        Particle::at_position(1.0, 1.0, [x, 0.5, 0.5], [1.0, 0.0, 0.0])
    }

    #[test]
    fn position_round_trips_through_cell_and_delta() {
        let p = particle(-1.25);
        assert_eq!(p.i_cell[0], -2);
        assert!((p.delta[0] - 0.75).abs() < 1e-15);
        assert!((p.position()[0] + 1.25).abs() < 1e-15);
    }

    #[test]
    fn periodic_translation_moves_cell_index() {
        let p = particle(9.5).transformed(&Transformation::translation(&[-10]));
        assert_eq!(p.i_cell[0], -1);
        assert!((p.delta[0] - 0.5).abs() < 1e-15);
    }

    #[test]
    fn reflection_flips_velocity() {
        let p = particle(0.25).transformed(&Transformation::with_flips(&[9], &[true]));
        assert_eq!(p.i_cell[0], 9);
        assert!((p.delta[0] - 0.75).abs() < 1e-15);
        assert_eq!(p.v[0], -1.0);
    }

    #[test]
    fn box_selection() {
        let ps = vec![particle(0.5), particle(3.5), particle(7.5)];
        let cells = IndexBox::new(&[2], &[7]);
        assert_eq!(in_box(&ps, &cells).count(), 2);
        let none = BoxContainer::new();
        assert_eq!(in_boxes(&ps, &none).count(), 0);
    }
}
