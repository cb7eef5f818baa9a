pub mod directory;
pub mod placement;
