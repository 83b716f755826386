//! Infrastructure layer - external adapters (database, filesystem, PDF, store).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod config;
pub mod document_writer;
pub mod local_storage;
pub mod pdf_renderer;
pub mod simulated_store;

pub use config::{ensure_config_exists, load_config, save_config};
pub use document_writer::stage_document;
pub use local_storage::{LocalStorage, SectionTable};
pub use pdf_renderer::PdfRenderer;
pub use simulated_store::{SimulatedStore, StoreBehavior};
