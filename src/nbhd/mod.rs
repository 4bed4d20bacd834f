mod export;
mod index;

pub use export::{neighborhood_info, NeighborhoodData};
pub use index::{Neighborhood, NeighborhoodFields, NeighborhoodIdx, NeighborhoodIndex};
