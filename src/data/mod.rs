//! Data held on patches: fields, particles, and the physical quantities a
//! hybrid model builds from them.

pub mod electromag;
pub mod field;
pub mod hybrid_state;
pub mod ion_population;
pub mod ions;
pub mod particle_initializer;
pub mod particles;
pub mod vecfield;

pub use field::Field;
pub use particles::{Particle, ParticleArray};
