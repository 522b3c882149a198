pub mod analysis;
pub mod product;
pub mod review;
pub mod status;

pub use analysis::{AnalysisRecord, AnalysisResult, FeatureSet, Sentiment, WorkflowResult};
pub use product::ProductIdentity;
pub use review::{ReviewCacheEntry, ReviewRecord};
pub use status::{Phase, PipelineStatus};
