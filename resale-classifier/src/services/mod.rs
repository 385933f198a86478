//! Classification services

pub mod batch_orchestrator;
pub mod classification_engine;
pub mod confidence_scorer;
pub mod fee_client;
pub mod fee_resolver;
pub mod keyword_classifier;
pub mod pattern_store;
pub mod profit_classifier;
pub mod title_normalizer;

pub use batch_orchestrator::{BatchError, BatchOrchestrator, BatchRequest};
pub use classification_engine::ClassificationEngine;
pub use fee_client::{FeeClientError, RemoteFeeClient};
pub use fee_resolver::FeeResolver;
pub use keyword_classifier::KeywordHeuristicClassifier;
pub use pattern_store::LearnedPatternStore;
pub use profit_classifier::ProfitEnhancedClassifier;
