mod util;

use hybrid_messenger::prelude::*;
use util::{PPC, Run, cells_of, root_run};

const OLD_B_X: &str = "HybridModel-HybridModel_EM_old_B_x";

fn two_level_run() -> Run {
    let mut run = root_run();
    for id in run.patch_ids(0) {
        run.set_magnetic(id, 2.0);
    }
    run.add_level(&[IndexBox::new(&[10], &[29])]);
    run
}

#[test]
fn levels_need_registered_quantities() {
    let mut run = root_run();
    assert_eq!(run.messenger.state(), MessengerState::Unregistered);
    assert_eq!(
        run.messenger.register_level(&run.hierarchy, 0),
        Err(AmrError::QuantitiesNotRegistered)
    );
    run.register_quantities();
    assert_eq!(
        run.messenger
            .fill_root_ghosts(&run.hierarchy, 0, &mut run.model, 0.0),
        Err(AmrError::LevelNotRegistered { level: 0 })
    );
    assert_eq!(
        run.messenger.prepare_step(&run.hierarchy, 0, &mut run.model),
        Err(AmrError::LevelNotRegistered { level: 0 })
    );
    run.messenger.register_level(&run.hierarchy, 0).unwrap();
    assert_eq!(run.messenger.state(), MessengerState::LevelsRegistered);
    assert_eq!(run.messenger.phase(0), Some(StepPhase::PreStep));
    assert_eq!(
        run.messenger.register_level(&run.hierarchy, 4),
        Err(AmrError::MissingLevel { level: 4 })
    );
}

#[test]
fn registration_builds_every_communicator() {
    let mut run = two_level_run();
    run.initialize();
    assert_eq!(run.messenger.name(), "HybridModel-HybridModel");
    assert_eq!(run.messenger.fine_model_name(), "HybridModel");
    assert_eq!(run.messenger.nbr_refined_part(), 2);
    let ghosts = run.messenger.communicator(CommunicationRole::GhostField);
    assert!(ghosts.is_registered(0) && ghosts.is_registered(1));
    let keys: Vec<&str> = ghosts.keys().collect();
    assert_eq!(keys, ["EM_B", "EM_E"]);
    let init = run.messenger.communicator(CommunicationRole::InitField);
    assert!(!init.is_registered(0));
    assert!(init.is_registered(1));
    let border = run
        .messenger
        .communicator(CommunicationRole::LevelBorderParticlesNew);
    assert_eq!(border.keys().collect::<Vec<_>>(), ["ions_protons"]);
    assert!(border.transfer_count(1) > 0);
}

#[test]
fn root_ghosts_only_on_root() {
    let mut run = two_level_run();
    run.initialize();
    assert_eq!(
        run.messenger
            .fill_root_ghosts(&run.hierarchy, 1, &mut run.model, 0.0),
        Err(AmrError::NotRootLevel { level: 1 })
    );
    assert_eq!(run.messenger.state(), MessengerState::Steady);
}

#[test]
fn root_ghost_fill_copies_periodic_neighbors() {
    let mut run = root_run();
    let ids = run.patch_ids(0);
    run.set_magnetic(ids[0], 1.0);
    run.set_magnetic(ids[1], 2.0);
    run.initialize();

    // Bx is primal: node 10 is shared and keeps the left patch value
    let bx = run.field(ids[0], "EM_B_x");
    assert_eq!(bx.get(&[-1]), Some(2.0));
    assert_eq!(bx.get(&[10]), Some(1.0));
    assert_eq!(bx.get(&[11]), Some(2.0));
    // By is dual: both ghost cells come from the right patch
    let by = run.field(ids[0], "EM_B_y");
    assert_eq!(by.get(&[-1]), Some(2.0));
    assert_eq!(by.get(&[10]), Some(2.0));
    assert_eq!(by.get(&[5]), Some(1.0));

    let right = run.field(ids[1], "EM_B_y");
    assert_eq!(right.get(&[9]), Some(1.0));
    assert_eq!(right.get(&[20]), Some(1.0));
}

#[test]
fn root_patch_ghost_particles_fill_the_ghost_layer() {
    let mut run = root_run();
    run.initialize();
    let ids = run.patch_ids(0);
    let ghosts = run.particles(ids[0], ParticleSet::PatchGhost);
    assert_eq!(ghosts.len(), 2 * PPC as usize);
    assert_eq!(cells_of(&ghosts), [-1, 10]);
    // moments include the ghost contributions at both edges
    let rho = run.field(ids[0], "ions_rho");
    assert!(rho.get(&[0]).unwrap() > 0.0);
    assert!(rho.get(&[10]).unwrap() > 0.0);
}

#[test]
fn refined_level_is_initialized_from_coarse() {
    let mut run = two_level_run();
    run.initialize();
    let fine = run.patch_ids(1)[0];

    let bx = run.field(fine, "EM_B_x");
    for i in 10..=30 {
        assert!((bx.get(&[i]).unwrap() - 2.0).abs() < 1e-12, "Bx[{i}]");
    }
    let by = run.field(fine, "EM_B_y");
    for i in 10..=29 {
        assert!((by.get(&[i]).unwrap() - 2.0).abs() < 1e-12, "By[{i}]");
    }

    let domain = run.particles(fine, ParticleSet::Domain);
    assert!(!domain.is_empty());
    assert!(domain.iter().all(|p| (10..=29).contains(&p.i_cell[0])));

    let old = run.particles(fine, ParticleSet::LevelGhostOld);
    assert!(!old.is_empty());
    assert_eq!(cells_of(&old), [9, 30]);
    assert_eq!(run.particles(fine, ParticleSet::LevelGhost), old);
    assert!(run.particles(fine, ParticleSet::PatchGhost).is_empty());

    assert!(run.field(fine, "ions_rho").get(&[20]).unwrap() > 0.0);
    assert_eq!(run.messenger.phase(1), Some(StepPhase::PreStep));
}

#[test]
fn prepare_step_snapshots_the_electromagnetic_field() {
    let mut run = root_run();
    let ids = run.patch_ids(0);
    run.set_magnetic(ids[0], 3.5);
    run.initialize();
    run.model
        .resources
        .set_times(&run.model.state.electromag, ids[0], 4.0)
        .unwrap();

    run.messenger
        .prepare_step(&run.hierarchy, 0, &mut run.model)
        .unwrap();
    assert_eq!(
        run.field(ids[0], OLD_B_X).as_slice(),
        run.field(ids[0], "EM_B_x").as_slice()
    );
    let times = run
        .model
        .resources
        .get_times(run.messenger.em_old(), ids[0])
        .unwrap();
    assert!(times.iter().all(|&t| t == 4.0));
}

#[test]
fn first_and_last_step_rotate_border_particles() {
    let mut run = two_level_run();
    run.initialize();
    run.set_ion_times(0, 1.0);
    let fine = run.patch_ids(1)[0];

    run.messenger
        .first_step(&run.hierarchy, 1, &mut run.model, 0.0)
        .unwrap();
    assert_eq!(run.messenger.phase(1), Some(StepPhase::FirstStep));
    let new = run.particles(fine, ParticleSet::LevelGhostNew);
    assert!(!new.is_empty());
    assert_eq!(cells_of(&new), [9, 30]);

    // a second first_step does not accumulate
    run.messenger
        .first_step(&run.hierarchy, 1, &mut run.model, 0.0)
        .unwrap();
    assert_eq!(run.particles(fine, ParticleSet::LevelGhostNew).len(), new.len());

    run.messenger
        .last_step(&run.hierarchy, 1, &mut run.model)
        .unwrap();
    assert_eq!(run.messenger.phase(1), Some(StepPhase::LastStep));
    assert_eq!(run.particles(fine, ParticleSet::LevelGhostOld), new);
    assert_eq!(run.particles(fine, ParticleSet::LevelGhost), new);
    assert!(run.particles(fine, ParticleSet::LevelGhostNew).is_empty());

    // the next coarse step refills new and leaves old alone
    run.set_ion_times(0, 2.0);
    run.messenger
        .first_step(&run.hierarchy, 1, &mut run.model, 1.0)
        .unwrap();
    assert_eq!(run.particles(fine, ParticleSet::LevelGhostOld), new);
    let refilled = run.particles(fine, ParticleSet::LevelGhostNew);
    assert!(!refilled.is_empty());
    assert_eq!(cells_of(&refilled), [9, 30]);
}

#[test]
fn level_border_field_ghosts_interpolate_in_time() {
    let mut run = two_level_run();
    run.initialize();
    let coarse = run.patch_ids(0);
    let fine = run.patch_ids(1)[0];

    // coarse B is 2 at t = 0 and 4 at t = 1
    run.messenger
        .prepare_step(&run.hierarchy, 0, &mut run.model)
        .unwrap();
    for &id in &coarse {
        run.set_magnetic(id, 4.0);
        run.model
            .resources
            .set_times(&run.model.state.electromag, id, 1.0)
            .unwrap();
    }

    let b = run.model.state.electromag.b.clone();
    run.messenger
        .fill_magnetic_ghosts(&b, 1, 0.5, &mut run.model.resources)
        .unwrap();

    let bx = run.field(fine, "EM_B_x");
    assert!((bx.get(&[9]).unwrap() - 3.0).abs() < 1e-12);
    assert!((bx.get(&[31]).unwrap() - 3.0).abs() < 1e-12);
    assert!((bx.get(&[20]).unwrap() - 2.0).abs() < 1e-12);
    let by = run.field(fine, "EM_B_y");
    assert!((by.get(&[30]).unwrap() - 3.0).abs() < 1e-12);
    assert!((by.get(&[20]).unwrap() - 2.0).abs() < 1e-12);
}

#[test]
fn patch_ghost_particles_are_rebuilt_not_accumulated() {
    let mut run = root_run();
    run.initialize();
    let id = run.patch_ids(0)[0];
    let before = run.particles(id, ParticleSet::PatchGhost);
    assert_eq!(before.len(), 2 * PPC as usize);

    let mut fills = Vec::new();
    for _ in 0..2 {
        run.messenger
            .fill_ion_ghost_particles(
                &mut run.model.state.ions,
                &run.hierarchy,
                0,
                0.0,
                &mut run.model.resources,
            )
            .unwrap();
        fills.push(run.particles(id, ParticleSet::PatchGhost));
    }
    assert_eq!(fills[0], fills[1]);
    assert_eq!(fills[1].len(), before.len());
    assert_eq!(cells_of(&fills[1]), [-1, 10]);
}

#[test]
fn electric_ghosts_copy_periodic_neighbors() {
    let mut run = root_run();
    run.initialize();
    let ids = run.patch_ids(0);
    for (&id, value) in ids.iter().zip([3.0, 4.0]) {
        for c in ["EM_E_x", "EM_E_y", "EM_E_z"] {
            run.fill_field(id, c, value);
        }
    }
    let e = run.model.state.electromag.e.clone();
    run.messenger
        .fill_electric_ghosts(&e, 0, 0.0, &mut run.model.resources)
        .unwrap();

    // Ex is dual in x, Ey primal
    let ex = run.field(ids[0], "EM_E_x");
    assert_eq!(ex.get(&[-1]), Some(4.0));
    assert_eq!(ex.get(&[5]), Some(3.0));
    assert_eq!(ex.get(&[10]), Some(4.0));
    let ey = run.field(ids[0], "EM_E_y");
    assert_eq!(ey.get(&[-1]), Some(4.0));
    assert_eq!(ey.get(&[10]), Some(3.0));
    assert_eq!(ey.get(&[11]), Some(4.0));
}

#[test]
fn ghost_fills_move_the_level_into_its_advance() {
    let mut run = two_level_run();
    run.initialize();
    run.set_ion_times(0, 1.0);
    run.messenger
        .first_step(&run.hierarchy, 1, &mut run.model, 0.0)
        .unwrap();
    let b = run.model.state.electromag.b.clone();
    run.messenger
        .fill_magnetic_ghosts(&b, 1, 0.5, &mut run.model.resources)
        .unwrap();
    assert_eq!(run.messenger.phase(1), Some(StepPhase::Advancing));

    let unknown = VecField::new("other_B", HybridQuantity::magnetic());
    assert_eq!(
        run.messenger
            .fill_magnetic_ghosts(&unknown, 1, 0.5, &mut run.model.resources),
        Err(AmrError::UnknownQuantity("other_B".into()))
    );
}

#[test]
fn sync_coarsens_fine_fields_onto_coarse_interiors() {
    let mut run = two_level_run();
    run.initialize();
    let fine = run.patch_ids(1)[0];
    run.set_magnetic(fine, 5.0);
    run.messenger
        .sync_magnetic(
            &run.model.state.electromag.b,
            &run.hierarchy,
            1,
            &mut run.model.resources,
        )
        .unwrap();

    let coarse = run.patch_ids(0);
    let left = run.field(coarse[0], "EM_B_x");
    assert_eq!(left.get(&[4]), Some(2.0));
    for i in 5..=10 {
        assert_eq!(left.get(&[i]), Some(5.0), "Bx[{i}]");
    }
    let right = run.field(coarse[1], "EM_B_x");
    assert_eq!(right.get(&[15]), Some(5.0));
    assert_eq!(right.get(&[16]), Some(2.0));
    let by = run.field(coarse[1], "EM_B_y");
    assert_eq!(by.get(&[14]), Some(5.0));
    assert_eq!(by.get(&[15]), Some(2.0));

    assert_eq!(
        run.messenger.sync_magnetic(
            &run.model.state.electromag.b,
            &run.hierarchy,
            0,
            &mut run.model.resources,
        ),
        Err(AmrError::MissingCoarserLevel { level: 0 })
    );
}

#[test]
fn sync_coarsens_the_electric_field() {
    let mut run = two_level_run();
    run.initialize();
    let coarse = run.patch_ids(0);
    let fine = run.patch_ids(1)[0];
    for c in ["EM_E_x", "EM_E_y", "EM_E_z"] {
        for &id in &coarse {
            run.fill_field(id, c, 2.0);
        }
        run.fill_field(fine, c, 5.0);
    }
    run.messenger
        .sync_electric(
            &run.model.state.electromag.e,
            &run.hierarchy,
            1,
            &mut run.model.resources,
        )
        .unwrap();

    let ey = run.field(coarse[0], "EM_E_y");
    assert_eq!(ey.get(&[4]), Some(2.0));
    for i in 5..=10 {
        assert_eq!(ey.get(&[i]), Some(5.0), "Ey[{i}]");
    }
    let right = run.field(coarse[1], "EM_E_y");
    assert_eq!(right.get(&[15]), Some(5.0));
    assert_eq!(right.get(&[16]), Some(2.0));
    let ex = run.field(coarse[1], "EM_E_x");
    assert_eq!(ex.get(&[14]), Some(5.0));
    assert_eq!(ex.get(&[15]), Some(2.0));
}

#[test]
fn sync_coarsens_every_ion_moment() {
    let mut run = two_level_run();
    run.initialize();
    let coarse = run.patch_ids(0);
    let fine = run.patch_ids(1)[0];

    let ions = &run.model.state.ions;
    let mut names = vec![ions.density_name()];
    names.extend(ions.bulk_velocity().component_names());
    for pop in ions.populations() {
        names.extend(pop.field_names_and_quantities().into_iter().map(|(n, _)| n));
    }
    assert_eq!(names.len(), 8);
    for name in &names {
        for &id in &coarse {
            run.fill_field(id, name, 0.0);
        }
        run.fill_field(fine, name, 5.0);
    }

    let ions = run.model.state.ions.clone();
    run.messenger
        .sync_ion_moments(&ions, &run.hierarchy, 1, &mut run.model.resources)
        .unwrap();

    // moments are primal: fine nodes 10..=30 land on coarse nodes 5..=15
    for name in &names {
        let left = run.field(coarse[0], name);
        assert_eq!(left.get(&[4]), Some(0.0), "{name}[4]");
        assert_eq!(left.get(&[5]), Some(5.0), "{name}[5]");
        assert_eq!(left.get(&[10]), Some(5.0), "{name}[10]");
        let right = run.field(coarse[1], name);
        assert_eq!(right.get(&[15]), Some(5.0), "{name}[15]");
        assert_eq!(right.get(&[16]), Some(0.0), "{name}[16]");
    }
}

#[test]
fn regrid_keeps_old_particles_and_splits_the_rest() {
    let mut run = two_level_run();
    run.initialize();
    let old_level = run
        .hierarchy
        .replace_level(1, &[IndexBox::new(&[14], &[33])])
        .unwrap();
    run.allocate_level(1, 0.0);
    run.messenger
        .regrid(&run.hierarchy, 1, &old_level, &mut run.model, 0.0)
        .unwrap();

    let old_id = old_level.patches()[0].id();
    let new_id = run.patch_ids(1)[0];
    let kept = |p: &Particle| (14..=29).contains(&p.i_cell[0]);
    let old_domain = run.particles(old_id, ParticleSet::Domain);
    let new_domain = run.particles(new_id, ParticleSet::Domain);
    let old_kept: Vec<Particle> = old_domain.iter().copied().filter(kept).collect();
    let new_kept: Vec<Particle> = new_domain.iter().copied().filter(kept).collect();
    assert_eq!(new_kept, old_kept);
    assert!(new_domain.iter().all(|p| (14..=33).contains(&p.i_cell[0])));
    assert!(new_domain.iter().any(|p| p.i_cell[0] >= 30));

    let bx = run.field(new_id, "EM_B_x");
    for i in 14..=34 {
        assert!((bx.get(&[i]).unwrap() - 2.0).abs() < 1e-12, "Bx[{i}]");
    }
    assert_eq!(cells_of(&run.particles(new_id, ParticleSet::LevelGhostOld)), [13, 34]);
    assert_eq!(run.messenger.phase(1), Some(StepPhase::PreStep));
}
