//! Fundamental valuation: growth estimation, classification, quality scoring
//! and the DCF, comparable-multiple and startup valuators.

pub mod beta;
pub mod classifier;
pub mod comparable;
pub mod dcf;
pub mod growth;
pub mod quality;
pub mod startup;

pub use beta::{resolve_beta, BetaEstimate};
pub use classifier::{ClassificationOutcome, Classifier, ClassifierInput};
pub use comparable::ComparableValuator;
pub use dcf::DcfValuator;
pub use growth::{GrowthEstimator, GrowthMode};
pub use quality::{QualityInputs, QualityScorer};
pub use startup::StartupValuator;
