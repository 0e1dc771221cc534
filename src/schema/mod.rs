pub mod particle;
pub mod snapshot;
pub mod tag;
pub mod vector;
