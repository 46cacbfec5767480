//! # Tessella
//!
//! An incremental 2D Delaunay triangulation: bootstrap super-triangle,
//! per-point location, triangle splits and Lawson edge-flip repair.

pub use locate::Location;
pub use predicates::PointClass;
pub use triangulation::Triangulation;
pub use trimesh::{TriArena, Triangle};

pub mod locate;
pub mod predicates;
pub mod triangulation;
pub mod trimesh;
mod utils;
