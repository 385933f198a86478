//! Data models for resale-classifier

pub mod batch_job;
pub mod classification;
pub mod fee;
pub mod parameters;
pub mod pattern;
pub mod product;
pub mod product_record;

pub use batch_job::{BatchJob, BatchScope, BatchStage, BatchStatus};
pub use classification::{
    CategoryCandidate, ClassificationMethod, ClassificationResult, AUTO_CONFIDENCE_CEILING,
    HUMAN_VERIFIED_CONFIDENCE,
};
pub use fee::{FeeQuote, PaymentFeeSettings};
pub use parameters::{ClassifierParameters, ClassifierParametersUpdate};
pub use pattern::{LearnedPattern, PatternStats};
pub use product::ProductDescriptor;
pub use product_record::{ProductRecord, ProductStatus};
