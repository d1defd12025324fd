//! Task graph core: task model, dependency resolution, execution.

pub mod graph;
pub mod runner;
pub mod task;
