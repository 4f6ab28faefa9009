use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{info, warn};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use igsgraph::{
    DatasetLoader, DatasetPreprocessor, IgDataset, PrepareConfig, PreparedCache, StratifiedKFold,
    SubsetBatches,
};

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

fn parse_args() -> Result<PrepareConfig> {
    let args: Vec<String> = env::args().skip(1).collect();
    let config_path = args
        .iter()
        .position(|arg| arg == "--config")
        .map(|pos| {
            args.get(pos + 1)
                .map(PathBuf::from)
                .context("--config needs a value")
        })
        .transpose()?;
    let mut config = match config_path {
        Some(path) => PrepareConfig::from_path(&path)?,
        None => PrepareConfig::default(),
    };

    let mut iter = args.into_iter();
    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--config" => {
                iter.next();
            }
            "--no-cache" => config.use_cache = false,
            "--data-dir" => config.data_dir = PathBuf::from(flag_value(&flag, iter.next())?),
            "--seed" => config.params.seed = parse_value(&flag, iter.next())?,
            "--kfold-splits" => config.params.kfold_splits = parse_value(&flag, iter.next())?,
            "--batch-size" => config.params.batch_size = parse_value(&flag, iter.next())?,
            "--pos-enc-dim" => config.net_params.pos_enc_dim = parse_value(&flag, iter.next())?,
            other => anyhow::bail!("Unexpected argument: {other}"),
        }
    }

    config.validate()?;
    Ok(config)
}

fn flag_value(flag: &str, value: Option<String>) -> Result<String> {
    value.with_context(|| format!("{flag} needs a value"))
}

fn parse_value<T>(flag: &str, value: Option<String>) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = flag_value(flag, value)?;
    raw.parse()
        .with_context(|| format!("invalid value {raw:?} for {flag}"))
}

fn main() -> Result<()> {
    init_logging();
    let config = parse_args()?;

    let start = Instant::now();
    let loader = DatasetLoader::new(config.data_dir.clone());
    let cache = config
        .use_cache
        .then(|| PreparedCache::new(config.cache_dir.clone()));
    info!(
        "Dataset {}: preparing from {:?} (augment {:?})",
        config.dataset,
        loader.root(),
        config.net_params
    );
    let dataset = DatasetPreprocessor::prepare(&loader, &config.net_params, cache.as_ref())
        .with_context(|| format!("prepare dataset {}", config.dataset))?;
    info!("Dataset {} ready in {:?}", config.dataset, start.elapsed());

    report_splits(&dataset);
    check_folds(&dataset, &config)
}

fn report_splits(dataset: &IgDataset) {
    for split in dataset.splits() {
        info!(
            "Split {}: graphs {}, nodes {}, edges {}, labels {:?}",
            split.split,
            split.len(),
            split.total_nodes(),
            split.total_edges(),
            split.label_counts()
        );
    }
}

fn check_folds(dataset: &IgDataset, config: &PrepareConfig) -> Result<()> {
    if dataset.train.is_empty() {
        warn!("Training split is empty, skipping fold checks");
        return Ok(());
    }
    let labels = dataset.train.labels();
    let splitter = StratifiedKFold::new(config.params.kfold_splits, config.params.seed)?;
    let folds = splitter
        .split(&labels)
        .context("split training set into folds")?;
    for fold in &folds {
        info!(
            "Fold {}: train {}, test {}",
            fold.index,
            fold.train.len(),
            fold.test.len()
        );
    }

    let Some(first) = folds.first() else {
        return Ok(());
    };
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.params.seed);
    let batches = SubsetBatches::new(
        &dataset.train.records,
        &first.train,
        config.params.batch_size,
        &mut rng,
    )?;
    let expected = batches.batch_count();
    let mut nodes = 0;
    for batch in batches {
        let (graph, _) = batch.context("collate fold 0 training batch")?;
        nodes += graph.node_count();
    }
    info!(
        "Fold {}: {} training batches, {} nodes",
        first.index, expected, nodes
    );
    Ok(())
}
