mod util;

use hybrid_messenger::prelude::*;
use util::{config, root_run_with};

fn weight(particles: &[Particle]) -> f64 {
    particles.iter().map(|p| p.weight).sum()
}

/// Refine the whole periodic root domain and return (coarse domain, fine domain).
fn refine_everything(pattern: SplitPattern) -> (ParticleArray, ParticleArray) {
    let config = AmrConfig {
        split_pattern: pattern.name().to_string(),
        ..config()
    };
    let mut run = root_run_with(&config);
    run.add_level(&[IndexBox::new(&[0], &[39])]);
    run.initialize();
    let coarse: ParticleArray = run
        .patch_ids(0)
        .into_iter()
        .flat_map(|id| run.particles(id, ParticleSet::Domain))
        .collect();
    let fine = run.particles(run.patch_ids(1)[0], ParticleSet::Domain);
    (coarse, fine)
}

#[test]
fn full_refinement_conserves_weight_and_multiplies_count() {
    for pattern in [SplitPattern::Binary, SplitPattern::Ternary] {
        let (coarse, fine) = refine_everything(pattern);
        assert_eq!(fine.len(), coarse.len() * pattern.nbr_refined_part(), "{pattern:?}");
        assert!((weight(&fine) - weight(&coarse)).abs() < 1e-9, "{pattern:?}");
        assert!(fine.iter().all(|p| (0..=39).contains(&p.i_cell[0])));
        assert!(fine.iter().all(|p| (0.0..1.0).contains(&p.delta[0])));
    }
}

#[test]
fn children_keep_the_parent_velocity_distribution() {
    let (coarse, fine) = refine_everything(SplitPattern::Binary);
    let momentum = |ps: &[Particle]| ps.iter().map(|p| p.weight * p.v[0]).sum::<f64>();
    assert!((momentum(&fine) - momentum(&coarse)).abs() < 1e-9);
}

#[test]
fn partial_refinement_only_fills_the_patch() {
    let mut run = root_run_with(&config());
    run.add_level(&[IndexBox::new(&[6], &[13])]);
    run.initialize();
    let fine = run.patch_ids(1)[0];
    let domain = run.particles(fine, ParticleSet::Domain);
    assert!(domain.iter().all(|p| (6..=13).contains(&p.i_cell[0])));
    assert!(!domain.is_empty());

    // children move less than one fine cell, so only coarse cells 2..=7 contribute
    let parents = run
        .particles(run.patch_ids(0)[0], ParticleSet::Domain)
        .into_iter()
        .filter(|p| (2..=7).contains(&p.i_cell[0]))
        .count();
    assert!(domain.len() <= 2 * parents);
}
