use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use igsgraph::{
    AugmentConfig, DatasetLoader, DatasetPreprocessor, IgDataset, PrepareConfig, PreparedCache,
    RecordWriter, Split, StratifiedKFold, SubsetBatches,
};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

fn temp_root(name: &str) -> Result<PathBuf> {
    let epoch = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("igsgraph_{}_{}_{}", name, std::process::id(), epoch));
    fs::create_dir_all(&path).with_context(|| format!("create {:?}", path))?;
    Ok(path)
}

/// Cycles and paths of growing size, alternating labels.
fn split_json(count: usize) -> String {
    let records: Vec<String> = (0..count)
        .map(|i| {
            let n = 3 + i % 4;
            let mut edges: Vec<String> = (0..n - 1)
                .flat_map(|v| [format!("[{v}, {}, 1.0]", v + 1), format!("[{}, {v}, 1.0]", v + 1)])
                .collect();
            if i % 2 == 0 {
                edges.push(format!("[{}, 0, 1.0]", n - 1));
                edges.push(format!("[0, {}, 1.0]", n - 1));
            }
            format!(
                r#"{{"num_node": {n}, "edges": [{}], "target": {}}}"#,
                edges.join(", "),
                i % 2
            )
        })
        .collect();
    format!("[{}]", records.join(",\n"))
}

fn write_source(root: &PathBuf) -> Result<DatasetLoader> {
    let data = root.join("IGs");
    fs::create_dir_all(&data)?;
    let loader = DatasetLoader::new(data);
    fs::write(loader.split_path(Split::Train), split_json(20))?;
    fs::write(loader.split_path(Split::Val), split_json(4))?;
    fs::write(loader.split_path(Split::Test), split_json(4))?;
    Ok(loader)
}

fn augment_config() -> AugmentConfig {
    AugmentConfig {
        self_loop: false,
        lap_pos_enc: true,
        pos_enc_dim: 3,
        wl_pos_enc: true,
        full_graph: false,
    }
}

fn snapshot(dataset: &IgDataset) -> Result<Vec<String>> {
    dataset
        .splits()
        .iter()
        .map(|split| RecordWriter::to_json_string(&split.records))
        .collect()
}

#[test]
fn prepared_cache_round_trips_and_invalidates() -> Result<()> {
    let root = temp_root("cache")?;
    let loader = write_source(&root)?;
    let cache = PreparedCache::new(root.join("cache"));
    let config = augment_config();

    assert!(cache.load(&loader, &config)?.is_none());
    let prepared = DatasetPreprocessor::prepare(&loader, &config, Some(&cache))?;
    let cached = cache
        .load(&loader, &config)?
        .context("prepared dataset should be cached")?;
    assert_eq!(snapshot(&cached)?, snapshot(&prepared)?);
    assert!(cached.train.records.iter().all(|r| r.has_lap_pos_enc() && r.has_wl_pos_enc()));

    let mut other = config.clone();
    other.pos_enc_dim = 2;
    assert!(cache.load(&loader, &other)?.is_none());

    let mut train = OpenOptions::new()
        .append(true)
        .open(loader.split_path(Split::Train))?;
    writeln!(train)?;
    drop(train);
    assert!(cache.load(&loader, &config)?.is_none());

    cache.clear()?;
    fs::remove_dir_all(root)?;
    Ok(())
}

#[test]
fn folds_and_subset_batches_cover_training_split() -> Result<()> {
    let root = temp_root("folds")?;
    let loader = write_source(&root)?;
    let config = PrepareConfig {
        data_dir: loader.root().to_path_buf(),
        use_cache: false,
        net_params: augment_config(),
        ..PrepareConfig::default()
    };
    config.validate()?;

    let dataset = DatasetPreprocessor::prepare(&loader, &config.net_params, None)?;
    let labels = dataset.train.labels();
    let folds = StratifiedKFold::new(config.params.kfold_splits, config.params.seed)?.split(&labels)?;
    assert_eq!(folds.len(), 5);

    let mut tested: Vec<usize> = folds.iter().flat_map(|f| f.test.clone()).collect();
    tested.sort_unstable();
    assert_eq!(tested, (0..labels.len()).collect::<Vec<_>>());
    for fold in &folds {
        let positives = fold.test.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(positives, 2);
        assert_eq!(fold.test.len(), 4);
    }

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.params.seed);
    let fold = &folds[0];
    let mut seen = 0;
    let mut nodes = 0;
    for batch in SubsetBatches::new(&dataset.train.records, &fold.train, 6, &mut rng)? {
        let (graph, batch_labels) = batch?;
        assert_eq!(graph.batch_size(), batch_labels.len());
        assert_eq!(graph.lap_pos_enc.as_ref().map(|m| m.ncols()), Some(3));
        seen += batch_labels.len();
        nodes += graph.node_count();
    }
    assert_eq!(seen, fold.train.len());
    let expected_nodes: usize = fold
        .train
        .iter()
        .map(|&i| dataset.train.records[i].node_count())
        .sum();
    assert_eq!(nodes, expected_nodes);

    fs::remove_dir_all(root)?;
    Ok(())
}
