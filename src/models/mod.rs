//! Core data models for roster sync.

mod ids;
mod player;
mod stat_line;

pub use ids::*;
pub use player::*;
pub use stat_line::*;
