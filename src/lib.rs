pub mod checkpoint;
pub mod collectors;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod salary;

pub use checkpoint::CheckpointWriter;
pub use collectors::runner::{CollectionEngine, CollectionOutcome, EngineSettings};
pub use collectors::{Pacer, PageFetcher, PageQuery, TokioPacer};
pub use models::job::JobRecord;
