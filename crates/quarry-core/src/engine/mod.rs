pub mod container;
pub mod runner;
pub mod warehouse;

pub use runner::{ContainerBackend, RunArtifact, Runner, WarehouseBackend};
