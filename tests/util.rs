#![allow(dead_code)]
use hybrid_messenger::prelude::*;

pub const RATIO: i32 = 2;
pub const PPC: u32 = 10;

/// 1-D, periodic, order 1, binary split.
pub fn config() -> AmrConfig {
    AmrConfig {
        dimension: 1,
        periodic: [true, false, false],
        mesh_size: [0.1, 1.0, 1.0],
        ..AmrConfig::default()
    }
}

/// A hierarchy, a hybrid model with one proton population, and its messenger.
pub struct Run {
    pub hierarchy: BasicHierarchy,
    pub model: HybridModel,
    pub messenger: HybridMessenger,
}

/// Root domain of 20 cells split into `[0, 9]` and `[10, 19]`, every buffer
/// allocated at t = 0 and domain particles loaded.
pub fn root_run() -> Run {
    root_run_with(&config())
}

pub fn root_run_with(config: &AmrConfig) -> Run {
    let hierarchy = BasicHierarchy::with_root(
        IndexBox::new(&[0], &[19]),
        &[IndexBox::new(&[0], &[9]), IndexBox::new(&[10], &[19])],
        config.mesh_size,
        config.periodic,
    )
    .unwrap();

    let mut resources = ResourcesManager::new(config.interp_order).unwrap();
    let messenger = HybridMessenger::new(config, &mut resources).unwrap();
    let init = InitializerInfo {
        nbr_part_per_cell: PPC,
        seed: 7,
        ..InitializerInfo::default()
    };
    let ions = Ions::new("ions", vec![IonPopulation::new("ions", "protons", 1.0, init)]);
    let state = HybridState::new(Electromag::new("EM"), ions);
    let model = HybridModel::new(state, resources);

    let mut run = Run {
        hierarchy,
        model,
        messenger,
    };
    run.allocate_level(0, 0.0);
    for patch in run.hierarchy.patches_of(0) {
        run.model.initialize(patch).unwrap();
    }
    run
}

impl Run {
    pub fn allocate_level(&mut self, level: usize, time: f64) {
        for patch in self.hierarchy.patches_of(level) {
            self.model.allocate(patch, time).unwrap();
            self.messenger
                .allocate(patch, time, &mut self.model.resources)
                .unwrap();
        }
    }

    pub fn register_quantities(&mut self) {
        let mut info = self.messenger.empty_info_from_coarser();
        self.model.fill_messenger_info(&mut info);
        let finer = self.messenger.empty_info_from_finer();
        self.messenger.register_quantities(&info, &finer).unwrap();
    }

    /// Add a level refined by [`RATIO`] and allocate it.
    pub fn add_level(&mut self, boxes: &[IndexBox]) -> usize {
        let n = self.hierarchy.add_level(RATIO, boxes).unwrap();
        self.allocate_level(n, 0.0);
        n
    }

    /// Register quantities and levels `0..=finest`, then init every level.
    pub fn initialize(&mut self) {
        self.register_quantities();
        for level in 0..self.hierarchy.number_of_levels() {
            self.messenger.register_level(&self.hierarchy, level).unwrap();
        }
        self.messenger
            .fill_root_ghosts(&self.hierarchy, 0, &mut self.model, 0.0)
            .unwrap();
        for level in 1..self.hierarchy.number_of_levels() {
            self.messenger
                .init_level(&self.hierarchy, level, &mut self.model, 0.0)
                .unwrap();
        }
    }

    pub fn patch_ids(&self, level: usize) -> Vec<PatchId> {
        self.hierarchy.patches_of(level).iter().map(Patch::id).collect()
    }

    /// Set every sample, ghosts included, of the model's magnetic field on `patch`.
    pub fn set_magnetic(&mut self, patch: PatchId, value: f64) {
        let mut em = self
            .model
            .resources
            .set_on_patch(patch, &mut self.model.state.electromag)
            .unwrap();
        for c in em.b.components_mut().unwrap() {
            c.fill(value);
        }
    }

    /// Set every sample, ghosts included, of the field `name` on `patch`.
    pub fn fill_field(&mut self, patch: PatchId, name: &str, value: f64) {
        self.model
            .resources
            .patch_data_mut(patch)
            .unwrap()
            .field_mut(name)
            .unwrap()
            .fill(value);
    }

    pub fn field(&self, patch: PatchId, name: &str) -> Field {
        self.model
            .resources
            .patch_data(patch)
            .unwrap()
            .field(name)
            .unwrap()
            .clone()
    }

    pub fn particles(&self, patch: PatchId, set: ParticleSet) -> ParticleArray {
        let pop = &self.model.state.ions.populations()[0];
        self.model
            .resources
            .patch_data(patch)
            .unwrap()
            .particles(&pop.particle_name(set))
            .unwrap()
            .clone()
    }

    /// Stamp the ions of every patch of `level` with `time`.
    pub fn set_ion_times(&mut self, level: usize, time: f64) {
        for id in self.patch_ids(level) {
            self.model
                .resources
                .set_times(&self.model.state.ions, id, time)
                .unwrap();
        }
    }
}

/// Cells (first axis) occupied by `particles`.
pub fn cells_of(particles: &[Particle]) -> Vec<i32> {
    let mut cells: Vec<i32> = particles.iter().map(|p| p.i_cell[0]).collect();
    cells.sort_unstable();
    cells.dedup();
    cells
}
