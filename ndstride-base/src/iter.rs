//! Iterators over tiles of index space.

mod tiles;

pub use tiles::Tiles;
