pub mod batch;
pub mod cache;
pub mod datasets;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod spectral;
pub mod transform;
pub mod wl;

pub use batch::{collate, BatchedGraph};
pub use cache::{CacheMetadata, PreparedCache};
pub use datasets::{DatasetLoader, GraphSplit, IgDataset, Split};
pub use error::{IgError, IgResult};
pub use graph::{GraphRecord, RecordLoader, RecordWriter};
pub use pipeline::{
    AugmentConfig, DatasetPreprocessor, Fold, FoldParams, PrepareConfig, StratifiedKFold,
    SubsetBatches,
};
pub use spectral::laplacian_positional_encoding;
pub use transform::GraphTransform;
pub use wl::wl_positional_encoding;
