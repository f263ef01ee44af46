//! # Pipeline Module
//!
//! Generazione dei derivati, separata in sottomoduli:
//! - `asset_pipeline`: Orchestratore principale (workspace → batch → publish)
//! - `batch_runner`: Discovery, pool di worker e aggregazione
//! - `derivative_generator`: Worker per una singola sorgente
//! - `path_resolver`: Logica di calcolo path centralizzata

pub mod asset_pipeline;
pub mod batch_runner;
pub mod derivative_generator;
pub mod path_resolver;

pub use asset_pipeline::AssetPipeline;
pub use batch_runner::{BatchRunner, RunSummary};
pub use derivative_generator::{Artifact, DerivativeGenerator, GenerationOutcome, SourceImage};
pub use path_resolver::PathResolver;
