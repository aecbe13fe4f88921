pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::storage::LocalStorage;
pub use config::HarvestConfig;
pub use core::{
    etl::{EtlEngine, StageSelection},
    pipeline::{Collaborators, HarvestPipeline},
};
pub use utils::error::{HarvestError, Result};
