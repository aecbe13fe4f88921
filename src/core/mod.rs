pub mod checkpoint;
pub mod collector;
pub mod dataset;
pub mod enricher;
pub mod etl;
pub mod merger;
pub mod pipeline;
pub mod retry;

pub use crate::domain::model::{Area, EnrichedRecord, ListingRecord, StageReport};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;
