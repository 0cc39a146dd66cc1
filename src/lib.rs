pub mod cli;
pub mod error;
pub mod loaders;
pub mod models;
pub mod processors;
pub mod readers;
pub mod settings;
pub mod utils;
pub mod warehouse;

pub use error::{EtlError, Result};
pub use loaders::{BulkTransformLoader, LoadReport, Loader, RunStage, UpsertLoader};
pub use settings::EtlConfig;
