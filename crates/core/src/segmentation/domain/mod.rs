pub mod chunk;
pub mod materializer;
pub mod planner;
pub mod segment_plan;
pub mod silence;
