//! RagDesk Core: knowledge domains, configuration and the error taxonomy.

pub mod config;
pub mod domain;
pub mod error;

pub use config::{DataPaths, EmbedderKind, RagDeskConfig, SamplingConfig};
pub use domain::Domain;
pub use error::{Error, Result};
