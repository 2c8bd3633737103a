//! Image clustering support: a tiered feature-vector cache, the batch
//! pipeline that fills it, and the organizer that turns cluster
//! assignments into a presentation layout.

// Public API exports
pub mod cache;
pub mod clusterer;
pub mod config;
pub mod error;
pub mod organizer;
pub mod perception;
pub mod pipeline;
pub mod reduction;
pub mod vecfile;

// Re-export main types for convenience
pub use cache::{Cache, CacheIndex, CacheTier, ItemId, NamingScheme, ReductionSpec, TierCounts};
pub use config::PipelineConfig;
pub use error::{Error, Result};

pub use perception::{
    Decoder, Extractor, ImageDecoder, ModelInfo, ModelRegistry, Picture, RawPixels, Shape,
};
pub use pipeline::{BatchPipeline, Batcher, PipelineOutput};
pub use reduction::{RandomProjection, Reducer};

pub use clusterer::{default_cluster_count, Clustering, Fit, KMeans, Scores};
pub use organizer::{
    organize, ClusterAssignment, ClusterLayout, ClusterOrder, LayoutRow, OrganizerOptions,
};
