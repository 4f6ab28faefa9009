pub mod config;
pub mod folds;
pub mod preprocess;

pub use config::{AugmentConfig, FoldParams, PrepareConfig};
pub use folds::{Fold, StratifiedKFold, SubsetBatches};
pub use preprocess::{DatasetPreprocessor, PassTiming};
