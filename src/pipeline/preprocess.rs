use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::cache::PreparedCache;
use crate::datasets::{DatasetLoader, IgDataset};
use crate::error::IgResult;
use crate::pipeline::config::AugmentConfig;
use crate::transform::GraphTransform;

#[derive(Debug, Clone, PartialEq)]
pub struct PassTiming {
    pub transform: GraphTransform,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
pub struct DatasetPreprocessor;

impl DatasetPreprocessor {
    pub fn augment(dataset: &mut IgDataset, config: &AugmentConfig) -> IgResult<Vec<PassTiming>> {
        let mut timings = Vec::new();
        for transform in config.transforms() {
            let start = Instant::now();
            info!("{}", pass_banner(transform));
            dataset.apply_transform(transform)?;
            let elapsed = start.elapsed();
            info!("Time {}: {:?}", transform, elapsed);
            timings.push(PassTiming { transform, elapsed });
        }
        Ok(timings)
    }

    /// Load and augment, reusing a cached prepared dataset when one matches.
    pub fn prepare(
        loader: &DatasetLoader,
        config: &AugmentConfig,
        cache: Option<&PreparedCache>,
    ) -> Result<IgDataset> {
        if let Some(cache) = cache {
            match cache.load(loader, config) {
                Ok(Some(dataset)) => return Ok(dataset),
                Ok(None) => {}
                Err(err) => warn!("Ignoring unreadable prepared dataset: {err:#}"),
            }
        }

        let mut dataset = loader.load_dataset()?;
        Self::augment(&mut dataset, config).context("augment dataset")?;

        if let Some(cache) = cache {
            let dir = cache
                .store(loader, config, &dataset)
                .context("store prepared dataset")?;
            info!("Stored prepared dataset at {:?}", dir);
        }
        Ok(dataset)
    }
}

fn pass_banner(transform: GraphTransform) -> &'static str {
    match transform {
        GraphTransform::SelfLoop => "Adding graph self-loops",
        GraphTransform::LaplacianPe { .. } => "Adding Laplacian positional encoding",
        GraphTransform::WlPe => "Adding WL positional encoding",
        GraphTransform::FullGraph => "Converting the given graphs to full graphs",
    }
}
