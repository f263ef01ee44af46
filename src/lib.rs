//! # Image Derivatives Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per i test
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom per diverse operazioni
//! - `profile`: Catalogo dei profili di output ed encoding
//! - `codec`: Capability `ImageCodec` e implementazione nativa
//! - `file_manager`: Discovery delle sorgenti e relocation legacy
//! - `workspace`: Layout del repository, `.gitignore` e lock
//! - `pipeline`: Generazione dei derivati e orchestratore principale
//! - `publish`: Stage/commit/push dei derivati
//! - `progress`: Progress tracking durante la batch
//! - `report`: Report finale testuale o JSON
//!
//! ## Utilizzo:
//! ```ignore
//! use image_derivatives::{AssetPipeline, Config};
//!
//! let pipeline = AssetPipeline::open(&repo_root, Config::default())?;
//! let report = pipeline.run().await?;
//! println!("{}", report);
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod pipeline;
pub mod profile;
pub mod progress;
pub mod publish;
pub mod report;
pub mod workspace;

pub use codec::{ImageCodec, NativeCodec};
pub use config::{CollisionPolicy, Config};
pub use error::{GenerateError, PublishFailure, SetupError};
pub use pipeline::{AssetPipeline, BatchRunner, DerivativeGenerator, RunSummary};
pub use profile::{Encoding, OutputProfile, ProfileCatalog};
pub use publish::{GitPublisher, PublishCoordinator, PublishOutcome, VersionControlPublisher};
pub use report::RunReport;
pub use workspace::Workspace;
