// Per-tick simulation systems: force application, integration, boundary constraints.

pub mod constraints;
pub mod forces;
pub mod integration;

pub use constraints::Constraint;
pub use forces::{Force, IdAttractor, Repulsion};
