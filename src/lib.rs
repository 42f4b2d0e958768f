//! Interactive 3D explorer for evolutionary trees built from genetic distances.

pub mod app;
pub mod engine;
pub mod layout;
pub mod settings;
pub mod tree;
mod util;
