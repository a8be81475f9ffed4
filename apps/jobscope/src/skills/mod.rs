// Skill taxonomy: alias folding at clean time, co-occurrence graph downstream.

pub mod graph;
pub mod normalize;

pub use graph::{run_graph_stage, DEFAULT_MIN_EDGE_WEIGHT};
pub use normalize::{SkillAliases, SkillNormalizer};
