//! Particle-to-grid deposition of density and flux.
//!
//! Moments live on primal nodes. A particle at position `x` (cell units)
//! contributes to the nodes around `x` with B-spline weights of the
//! interpolation order:
//!
//! - order 1: nodes `⌊x⌋, ⌊x⌋+1`, linear weights;
//! - order 2: nodes `i-1, i, i+1` with `i = round(x)`, quadratic weights;
//! - order 3: nodes `⌊x⌋-1 ..= ⌊x⌋+2`, cubic weights.
//!
//! Contributions falling outside a field's ghost box are dropped.

use crate::amr_error::AmrError;
use crate::data::field::Field;
use crate::data::particles::Particle;
use crate::geometry::index_box::MAX_DIM;

const MAX_SUPPORT: usize = 4;

/// Node indices and weights along one axis.
#[derive(Clone, Copy, Debug, Default)]
struct Stencil {
    start: i32,
    len: usize,
    weights: [f64; MAX_SUPPORT],
}

/// Deposits particles with B-splines of order 1, 2 or 3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interpolator {
    order: u32,
}

impl Interpolator {
    pub fn new(order: u32) -> Result<Self, AmrError> {
        if !(1..=3).contains(&order) {
            return Err(AmrError::UnsupportedInterpOrder(order));
        }
        Ok(Self { order })
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    fn stencil(&self, x: f64) -> Stencil {
        let mut s = Stencil::default();
        match self.order {
            1 => {
                let i = x.floor();
                let d = x - i;
                s.start = i as i32;
                s.len = 2;
                s.weights[..2].copy_from_slice(&[1.0 - d, d]);
            }
            2 => {
                let i = x.round();
                let d = x - i;
                s.start = i as i32 - 1;
                s.len = 3;
                s.weights[..3].copy_from_slice(&[
                    0.5 * (0.5 - d) * (0.5 - d),
                    0.75 - d * d,
                    0.5 * (0.5 + d) * (0.5 + d),
                ]);
            }
            _ => {
                let i = x.floor();
                let d = x - i;
                let d2 = d * d;
                let d3 = d2 * d;
                s.start = i as i32 - 1;
                s.len = 4;
                s.weights = [
                    (1.0 - d).powi(3) / 6.0,
                    (4.0 - 6.0 * d2 + 3.0 * d3) / 6.0,
                    (1.0 + 3.0 * d + 3.0 * d2 - 3.0 * d3) / 6.0,
                    d3 / 6.0,
                ];
            }
        }
        s
    }

    /// Accumulate `weight`-scaled particle contributions into `density` and `flux`.
    pub fn interpolate(
        &self,
        particles: &[Particle],
        density: &mut Field,
        flux: &mut [Field; 3],
        weight: f64,
    ) {
        let dim = density.index_box().dim();
        for p in particles {
            let x = p.position();
            let mut stencils = [Stencil::default(); MAX_DIM];
            for a in 0..dim {
                stencils[a] = self.stencil(x[a]);
            }
            let w0 = weight * p.weight;
            let mut node = [0; MAX_DIM];
            self.deposit_rec(&stencils, dim, 0, w0, &mut node, p, density, flux);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn deposit_rec(
        &self,
        stencils: &[Stencil; MAX_DIM],
        dim: usize,
        axis: usize,
        w: f64,
        node: &mut [i32; MAX_DIM],
        p: &Particle,
        density: &mut Field,
        flux: &mut [Field; 3],
    ) {
        if axis == dim {
            density.add(node, w);
            for (f, v) in flux.iter_mut().zip(p.v) {
                f.add(node, w * v);
            }
            return;
        }
        let s = &stencils[axis];
        for k in 0..s.len {
            if s.weights[k] == 0.0 {
                continue;
            }
            node[axis] = s.start + k as i32;
            self.deposit_rec(stencils, dim, axis + 1, w * s.weights[k], node, p, density, flux);
        }
    }
}
