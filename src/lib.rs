pub mod auth;
pub mod batch;
pub mod catalog;
pub mod config;
pub mod cover_art;
pub mod error;
pub mod matcher;
pub mod pipeline;
pub mod reference;
pub mod retry;
pub mod tags;
pub mod text;
pub mod youtube;
pub mod ytdlp;

pub use batch::{expand, run_batch, Batch, BatchReport, DownloadOutcome};
pub use catalog::{Catalog, SpotifyCatalog, TrackRecord};
pub use config::Config;
pub use error::{Error, Result};
pub use matcher::{select_candidate, CandidateSource};
pub use pipeline::TrackPipeline;
pub use reference::{parse_reference, CatalogReference, ReferenceKind};
pub use retry::Retry;
pub use ytdlp::CookieSource;
