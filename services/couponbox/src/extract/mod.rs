//! Extraction strategies and the pipeline that chains them
//!
//! The pipeline tries each configured strategy in order and finishes with
//! the heuristic extractor, which always yields a record.

pub mod ai;
pub mod completion;
pub mod heuristic;
pub mod pipeline;
pub mod traits;

pub use ai::AiExtractor;
pub use completion::{CompletionRequest, CompletionService, OpenRouterClient};
pub use heuristic::HeuristicExtractor;
pub use pipeline::{EmailCouponPipeline, PipelineOutcome};
pub use traits::Extractor;
