//! Configuration: `servicecut.toml`, command-line overrides and validation.
//!
//! The raw file form is permissive. [`validation::validate_config`] turns it
//! into a [`crate::sweep::ClusteringRequest`], reporting every problem at once.

pub mod core;
pub mod loader;
pub mod validation;

pub use self::core::{
    BackendKind, ClusterCountSpec, EvaluationConfig, RangeSpec, RawClusteringConfig,
    SemanticConfig, SweepValues,
};
pub use loader::{load_config, parse_config, CONFIG_FILE_NAME};
pub use validation::{
    build_request, run_validation, validate_config, validate_evaluation, ConfigValidation,
    EvaluationPlan,
};
