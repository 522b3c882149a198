pub mod analyst;
pub mod cache;
pub mod feature_extractor;
pub mod inference;
pub mod parser;
pub mod report_writer;
pub mod retry;
pub mod summarizer;

pub use analyst::ReviewAnalyst;
pub use cache::ReviewCache;
pub use feature_extractor::FeatureExtractor;
pub use inference::{Inference, OpenAiInference};
pub use report_writer::ReportWriter;
pub use retry::{DelayFn, RetryPolicy};
pub use summarizer::ReviewSummarizer;
