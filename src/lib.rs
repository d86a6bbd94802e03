
mod cooccurrence;
mod train;

pub mod config;
pub mod embeddings;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod similarity;
pub mod tokenizer;

pub use config::{files_handling, Config, Mode, Params, TrainParams};
pub use cooccurrence::Vocab;
pub use embeddings::{load, nearest, train, Embeddings, PretrainedModel, TrainedModel};
pub use error::{EmbeddingError, Result};
pub use pipeline::Pipeline;
pub use registry::{CatalogEntry, LocalRegistry, ModelRegistry};
pub use similarity::Similarity;
pub use tokenizer::{Tokenizer, WordPunct};

/// Start-up logging for the binaries, `RUST_LOG` overrides the `info` default.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
