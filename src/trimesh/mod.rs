//! The triangle mesh store: a handle-stable arena of triangles with
//! per-corner neighbor slots.

pub use arena::TriArena;
pub use triangle::Triangle;

mod arena;
mod triangle;
