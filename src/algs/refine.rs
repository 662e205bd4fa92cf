//! Coarse → fine field operators: space refinement and time interpolation.
//!
//! Fine and coarse samples are related per axis by their centering:
//! a primal fine node `i` sits at coarse node coordinate `i / r`; a dual
//! fine cell `i` has its center at coarse cell coordinate `(i + ½) / r − ½`.
//! The refined value is the multilinear interpolation of the coarse samples
//! bracketing that coordinate.

use crate::data::field::Field;
use crate::geometry::index_box::MAX_DIM;
use crate::geometry::layout::Centering;

/// Coarse coordinate of fine sample `i` along an axis.
#[inline]
fn coarse_coordinate(i: i32, ratio: i32, centering: Centering) -> f64 {
    let r = f64::from(ratio);
    match centering {
        Centering::Primal => f64::from(i) / r,
        Centering::Dual => (f64::from(i) + 0.5) / r - 0.5,
    }
}

/// Refined value at fine index `p`, interpolated from `coarse`.
///
/// Returns `None` when a coarse sample with non-zero weight is missing.
pub fn refine_value(coarse: &Field, p: &[i32], ratio: i32) -> Option<f64> {
    let dim = coarse.index_box().dim();
    let centering = coarse.quantity().centering();
    let mut base = [0; MAX_DIM];
    let mut frac = [0.0; MAX_DIM];
    for a in 0..dim {
        let x = coarse_coordinate(p[a], ratio, centering[a]);
        let f = x.floor();
        base[a] = f as i32;
        frac[a] = x - f;
    }
    let mut value = 0.0;
    for corner in 0..(1usize << dim) {
        let mut w = 1.0;
        let mut q = base;
        for a in 0..dim {
            if (corner >> a) & 1 == 1 {
                w *= frac[a];
                q[a] += 1;
            } else {
                w *= 1.0 - frac[a];
            }
        }
        if w == 0.0 {
            continue;
        }
        value += w * coarse.get(&q)?;
    }
    Some(value)
}

/// Weight of the newer sample when interpolating at `time` between `t_old` and `t_new`.
///
/// A zero-length interval selects the newer sample.
#[inline]
pub fn time_weight(t_old: f64, t_new: f64, time: f64) -> f64 {
    if t_new == t_old {
        1.0
    } else {
        (time - t_old) / (t_new - t_old)
    }
}

/// Linear interpolation in time between two samples.
#[inline]
pub fn time_interpolate(old: f64, new: f64, beta: f64) -> f64 {
    (1.0 - beta) * old + beta * new
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::index_box::IndexBox;
    use crate::geometry::layout::HybridQuantity;

    fn linear(q: HybridQuantity, b: IndexBox, f: impl Fn(f64) -> f64) -> Field {
        let mut field = Field::new("c", q, b);
        let dual = q.centering()[0] == Centering::Dual;
        for p in b.indices() {
            let x = if dual { f64::from(p[0]) + 0.5 } else { f64::from(p[0]) };
            field.set(&p, f(x));
        }
        field
    }

    #[test]
    fn primal_refinement_reproduces_linear_profiles() {
        // Bx is primal along x
        let coarse = linear(HybridQuantity::Bx, IndexBox::new(&[0], &[10]), |x| 3.0 * x + 1.0);
        for i in 0..20 {
            let v = refine_value(&coarse, &[i], 2).unwrap();
            assert!((v - (1.5 * f64::from(i) + 1.0)).abs() < 1e-12);
        }
    }

    #[test]
    fn dual_refinement_reproduces_linear_profiles() {
        // By is dual along x
        let coarse = linear(HybridQuantity::By, IndexBox::new(&[-1], &[10]), |x| 2.0 * x - 4.0);
        for i in 0..20 {
            let v = refine_value(&coarse, &[i], 2).unwrap();
            let x_fine = (f64::from(i) + 0.5) / 2.0;
            assert!((v - (2.0 * x_fine - 4.0)).abs() < 1e-12);
        }
    }

    #[test]
    fn coincident_nodes_are_injected() {
        let mut coarse = Field::new("c", HybridQuantity::Rho, IndexBox::new(&[0, 0], &[2, 2]));
        coarse.set(&[1, 1], 5.0);
        assert_eq!(refine_value(&coarse, &[2, 2], 2), Some(5.0));
        assert_eq!(refine_value(&coarse, &[3, 2], 2), Some(2.5));
        assert_eq!(refine_value(&coarse, &[3, 3], 2), Some(1.25));
        assert_eq!(refine_value(&coarse, &[6, 6], 2), None);
    }

    #[test]
    fn time_weights() {
        assert_eq!(time_weight(0.0, 1.0, 0.25), 0.25);
        assert_eq!(time_weight(2.0, 2.0, 7.0), 1.0);
        assert_eq!(time_interpolate(1.0, 3.0, 0.5), 2.0);
    }
}
