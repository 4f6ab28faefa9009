use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use log::info;
use ndarray::Array1;
use rayon::prelude::*;

use crate::batch::{collate, BatchedGraph};
use crate::error::IgResult;
use crate::graph::{GraphRecord, RecordLoader};
use crate::transform::GraphTransform;

pub const DEFAULT_ROOT: &str = "data/IGs";
const SPLIT_FILE_PREFIX: &str = "igraph";
pub const DATASET_NAME: &str = "IG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Val, Split::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{SPLIT_FILE_PREFIX}-{}.json", self.as_str())
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct GraphSplit {
    pub split: Split,
    pub records: Vec<GraphRecord>,
}

impl GraphSplit {
    pub fn new(split: Split, records: Vec<GraphRecord>) -> Self {
        Self { split, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn labels(&self) -> Vec<i64> {
        self.records.iter().map(|record| record.label).collect()
    }

    pub fn label_counts(&self) -> BTreeMap<i64, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.label).or_insert(0) += 1;
        }
        counts
    }

    pub fn total_nodes(&self) -> usize {
        self.records.iter().map(GraphRecord::node_count).sum()
    }

    pub fn total_edges(&self) -> usize {
        self.records.iter().map(GraphRecord::edge_count).sum()
    }

    fn transformed(&self, transform: GraphTransform) -> IgResult<Vec<GraphRecord>> {
        self.records
            .par_iter()
            .map(|record| transform.apply(record))
            .collect()
    }
}

/// Transforms replace every record of every split, or none on failure.
#[derive(Debug, Clone)]
pub struct IgDataset {
    pub name: String,
    pub train: GraphSplit,
    pub val: GraphSplit,
    pub test: GraphSplit,
}

impl IgDataset {
    pub fn new(train: GraphSplit, val: GraphSplit, test: GraphSplit) -> Self {
        Self {
            name: DATASET_NAME.to_string(),
            train,
            val,
            test,
        }
    }

    pub fn split(&self, split: Split) -> &GraphSplit {
        match split {
            Split::Train => &self.train,
            Split::Val => &self.val,
            Split::Test => &self.test,
        }
    }

    pub fn splits(&self) -> [&GraphSplit; 3] {
        [&self.train, &self.val, &self.test]
    }

    pub fn apply_transform(&mut self, transform: GraphTransform) -> IgResult<()> {
        let train = self.train.transformed(transform)?;
        let val = self.val.transformed(transform)?;
        let test = self.test.transformed(transform)?;
        self.train.records = train;
        self.val.records = val;
        self.test.records = test;
        Ok(())
    }

    pub fn collate(&self, samples: &[GraphRecord]) -> IgResult<(BatchedGraph, Array1<i64>)> {
        collate(samples)
    }
}

#[derive(Debug, Clone)]
pub struct DatasetLoader {
    root: PathBuf,
}

impl DatasetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn split_path(&self, split: Split) -> PathBuf {
        self.root.join(split.file_name())
    }

    pub fn load_split(&self, split: Split) -> Result<GraphSplit> {
        let path = self.split_path(split);
        let records = RecordLoader::from_path(&path)
            .with_context(|| format!("load {} split from {:?}", split, path))?;
        info!(
            "preparing {} graphs for the {} set",
            records.len(),
            split.as_str().to_uppercase()
        );
        Ok(GraphSplit::new(split, records))
    }

    pub fn load_dataset(&self) -> Result<IgDataset> {
        let start = Instant::now();
        info!("Loading dataset {} from {:?}", DATASET_NAME, self.root);
        let train = self.load_split(Split::Train)?;
        let val = self.load_split(Split::Val)?;
        let test = self.load_split(Split::Test)?;
        info!(
            "Finished loading: train {}, val {}, test {} in {:?}",
            train.len(),
            val.len(),
            test.len(),
            start.elapsed()
        );
        Ok(IgDataset::new(train, val, test))
    }
}
