mod util;

use hybrid_messenger::prelude::*;
use util::{Run, root_run};

fn advancing_fine_level() -> (Run, PatchId) {
    let mut run = root_run();
    run.add_level(&[IndexBox::new(&[10], &[29])]);
    run.initialize();
    run.set_ion_times(0, 1.0);
    run.messenger
        .first_step(&run.hierarchy, 1, &mut run.model, 0.0)
        .unwrap();
    let fine = run.patch_ids(1)[0];
    (run, fine)
}

/// Replace the ghost particle sets of the fine patch and zero its moments.
fn set_ghosts(run: &mut Run, patch: PatchId, old: &[Particle], new: &[Particle]) {
    let mut ions = run
        .model
        .resources
        .set_on_patch(patch, &mut run.model.state.ions)
        .unwrap();
    let pop = &mut ions.populations_mut()[0];
    pop.reset_moments().unwrap();
    pop.particles_mut(ParticleSet::PatchGhost).unwrap().clear();
    *pop.particles_mut(ParticleSet::LevelGhostOld).unwrap() = old.to_vec();
    *pop.particles_mut(ParticleSet::LevelGhostNew).unwrap() = new.to_vec();
}

fn deposit_ghosts(run: &mut Run, before: f64, after: f64) {
    run.messenger
        .fill_ion_moment_ghosts(
            &mut run.model.state.ions,
            &run.hierarchy,
            1,
            before,
            after,
            &mut run.model.resources,
        )
        .unwrap();
}

fn total(field: &Field) -> f64 {
    field.as_slice().iter().sum()
}

fn probe() -> Particle {
    // one fine cell left of the patch, in the level ghost layer
    Particle::at_position(1.0, 1.0, [9.5, 0.0, 0.0], [2.0, 0.0, 0.0])
}

#[test]
fn alpha_is_the_fraction_of_the_coarse_interval() {
    let (run, _) = advancing_fine_level();
    let alpha = run
        .messenger
        .time_interpolation_coefficient(1, 0.0, 0.5)
        .unwrap();
    assert!((alpha - 0.5).abs() < 1e-15);
    let alpha = run
        .messenger
        .time_interpolation_coefficient(1, 0.25, 1.0)
        .unwrap();
    assert!((alpha - 0.75).abs() < 1e-15);
}

#[test]
fn old_border_particles_weigh_one_minus_alpha() {
    let (mut run, fine) = advancing_fine_level();
    set_ghosts(&mut run, fine, &[probe()], &[]);
    deposit_ghosts(&mut run, 0.0, 0.5);

    let rho = run.field(fine, "ions_protons_rho");
    assert!((total(&rho) - 0.5).abs() < 1e-12);
    assert!((rho.get(&[9]).unwrap() - 0.25).abs() < 1e-12);
    assert!((rho.get(&[10]).unwrap() - 0.25).abs() < 1e-12);
    let fx = run.field(fine, "ions_protons_flux_x");
    assert!((total(&fx) - 1.0).abs() < 1e-12);
    assert_eq!(run.messenger.phase(1), Some(StepPhase::Advancing));
}

#[test]
fn same_particle_before_and_after_keeps_full_weight() {
    let (mut run, fine) = advancing_fine_level();
    for after in [0.0, 0.3, 1.0] {
        set_ghosts(&mut run, fine, &[probe()], &[probe()]);
        deposit_ghosts(&mut run, 0.0, after);
        let rho = run.field(fine, "ions_protons_rho");
        assert!((total(&rho) - 1.0).abs() < 1e-12, "after={after}");
    }
}

#[test]
fn new_border_particles_weigh_alpha() {
    let (mut run, fine) = advancing_fine_level();
    set_ghosts(&mut run, fine, &[], &[probe()]);
    deposit_ghosts(&mut run, 0.0, 0.25);
    assert!((total(&run.field(fine, "ions_protons_rho")) - 0.25).abs() < 1e-12);
}

#[test]
fn interpolation_needs_a_coarse_interval() {
    let mut run = root_run();
    run.add_level(&[IndexBox::new(&[10], &[29])]);
    run.initialize();

    // coarse ions were never advanced: the interval is empty
    run.messenger
        .first_step(&run.hierarchy, 1, &mut run.model, 0.0)
        .unwrap();
    assert_eq!(
        run.messenger.time_interpolation_coefficient(1, 0.0, 0.5),
        Err(AmrError::DegenerateCoarseInterval {
            before: 0.0,
            after: 0.0
        })
    );

    run.messenger
        .first_step(&run.hierarchy, 0, &mut run.model, 0.0)
        .unwrap();
    assert_eq!(
        run.messenger.time_interpolation_coefficient(0, 0.0, 0.5),
        Err(AmrError::MissingCoarserLevel { level: 0 })
    );
    assert_eq!(
        run.messenger.time_interpolation_coefficient(3, 0.0, 0.5),
        Err(AmrError::LevelNotRegistered { level: 3 })
    );
}

#[test]
fn total_density_sums_populations() {
    let mut run = root_run();
    run.initialize();
    let id = run.patch_ids(0)[0];
    let rho = run.field(id, "ions_rho");
    let pop = run.field(id, "ions_protons_rho");
    assert_eq!(rho.as_slice(), pop.as_slice());
    // bulk velocity is the flux over the density where particles exist
    let vx = run.field(id, "ions_bulkVel_x");
    let fx = run.field(id, "ions_protons_flux_x");
    let expected = fx.get(&[5]).unwrap() / pop.get(&[5]).unwrap();
    assert!((vx.get(&[5]).unwrap() - expected).abs() < 1e-12);
}
