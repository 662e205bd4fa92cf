use hybrid_messenger::prelude::*;

fn model() -> (HybridModel, Patch) {
    let init = InitializerInfo {
        nbr_part_per_cell: 4,
        ..InitializerInfo::default()
    };
    let ions = Ions::new(
        "ions",
        vec![
            IonPopulation::new("ions", "protons", 1.0, init.clone()),
            IonPopulation::new("ions", "alpha", 4.0, init),
        ],
    );
    let state = HybridState::new(Electromag::new("EM"), ions);
    let model = HybridModel::new(state, ResourcesManager::new(2).unwrap());
    let patch = Patch::new(PatchId::new(0, 0), IndexBox::new(&[0, 0], &[3, 4]), [0.1; 3]);
    (model, patch)
}

#[test]
fn state_is_usable_only_while_set_on_a_patch() {
    let (mut model, patch) = model();
    model.allocate(&patch, 0.0).unwrap();
    assert!(model.state.is_settable());
    {
        let on = model
            .resources
            .set_on_patch(patch.id(), &mut model.state)
            .unwrap();
        assert!(on.is_usable());
        assert!(!on.is_settable());
        // order 2 means one ghost per side: Bx primal in x, dual in y
        let bx = &on.electromag.b.components().unwrap()[0];
        assert_eq!(bx.index_box(), &IndexBox::new(&[-1, -1], &[5, 5]));
    }
    assert!(model.state.is_settable());
    assert!(!model.state.is_usable());
}

#[test]
fn initialization_loads_every_population_inside_the_patch() {
    let (mut model, patch) = model();
    model.allocate(&patch, 0.0).unwrap();
    model.initialize(&patch).unwrap();
    let data = model.resources.patch_data(patch.id()).unwrap();
    for pop in model.state.ions.populations() {
        let domain = data.particles(&pop.particle_name(ParticleSet::Domain)).unwrap();
        assert_eq!(domain.len(), 20 * 4);
        assert!(domain.iter().all(|p| patch.cell_box().contains(&p.i_cell)));
        assert!(data.particles(&pop.particle_name(ParticleSet::PatchGhost)).unwrap().is_empty());
    }
}

#[test]
fn bulk_velocity_is_mass_weighted() {
    let (mut model, patch) = model();
    model.allocate(&patch, 0.0).unwrap();
    let mut ions = model
        .resources
        .set_on_patch(patch.id(), &mut model.state.ions)
        .unwrap();
    let interpolator = hybrid_messenger::algs::interpolate::Interpolator::new(2).unwrap();
    let protons = Particle::at_position(1.0, 1.0, [1.5, 2.5, 0.0], [1.0, 0.0, 0.0]);
    let alphas = Particle::at_position(1.0, 2.0, [1.5, 2.5, 0.0], [-1.0, 0.0, 0.0]);
    for (pop, p) in ions.populations_mut().iter_mut().zip([protons, alphas]) {
        pop.particles_mut(ParticleSet::Domain).unwrap().push(p);
        pop.deposit(ParticleSet::Domain, &interpolator, 1.0).unwrap();
    }
    ions.compute_density().unwrap();
    ions.compute_bulk_velocity().unwrap();
    // (1·1 + 4·(−1)) / (1 + 4)
    let vx = &ions.bulk_velocity().components().unwrap()[0];
    let v = vx.get(&[1, 2]).unwrap();
    assert!((v + 0.6).abs() < 1e-12, "vx = {v}");
    let rho = ions.density().unwrap().get(&[1, 2]).unwrap();
    assert!(rho > 0.0);
}
