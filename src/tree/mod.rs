//! Species records to scene graph: loading, genetic distance and layout.

mod build;
mod distance;
mod loader;

pub use build::{SpeciesGroup, TreeGraph, generate_tree, group_records};
pub use distance::{genetic_distance, hamming};
pub use loader::{DataFormat, Record, load_records};
