//! Text embeddings for Hippo.
//!
//! Turns text into fixed-dimension `f32` vectors for semantic recall and
//! duplicate detection.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Embedder trait                         │
//! │  - embed() -> Vec<f32>                  │
//! └─────────────────────────────────────────┘
//!                    │
//!          ┌─────────┴─────────┐
//!          ▼                   ▼
//!   ┌─────────────┐    ┌──────────────┐
//!   │ HashEmbedder│    │ OpenAiEmbedder│──▶ HttpTransport
//!   │  (offline)  │    │   (remote)    │
//!   └─────────────┘    └──────────────┘
//! ```

pub mod embeddings;
pub mod error;
pub mod transport;

pub use embeddings::{
    DEFAULT_OPENAI_MODEL, DEFAULT_REQUEST_TIMEOUT, Embedder, EmbedderSpec, HashEmbedder,
    OPENAI_EMBEDDINGS_URL, OpenAiEmbedder, OpenAiEmbedderConfig, SharedEmbedder, build_embedder,
    fnv1a_32, local_embedding,
};
pub use error::{EmbedError, Result};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, SharedTransport};
