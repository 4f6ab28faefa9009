use std::collections::BTreeMap;

use log::warn;
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::batch::{collate_refs, BatchedGraph};
use crate::error::{IgError, IgResult};
use crate::graph::GraphRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub index: usize,
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Each class is shuffled and dealt round-robin across folds, continuing where
/// the previous class stopped.
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
    seed: u64,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize, seed: u64) -> IgResult<Self> {
        if n_splits < 2 {
            return Err(IgError::InvalidConfig(format!(
                "k-fold needs at least 2 splits, got {n_splits}"
            )));
        }
        Ok(Self { n_splits, seed })
    }

    pub fn split(&self, labels: &[i64]) -> IgResult<Vec<Fold>> {
        if labels.len() < self.n_splits {
            return Err(IgError::InvalidConfig(format!(
                "cannot split {} samples into {} folds",
                labels.len(),
                self.n_splits
            )));
        }

        let mut classes: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, label) in labels.iter().enumerate() {
            classes.entry(*label).or_default().push(idx);
        }
        if let Some((label, members)) = classes.iter().find(|(_, m)| m.len() < self.n_splits) {
            warn!(
                "class {} has only {} members, fewer than {} folds",
                label,
                members.len(),
                self.n_splits
            );
        }

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        let mut assignment = vec![0usize; labels.len()];
        let mut next_fold = 0;
        for members in classes.values_mut() {
            members.shuffle(&mut rng);
            for &idx in members.iter() {
                assignment[idx] = next_fold;
                next_fold = (next_fold + 1) % self.n_splits;
            }
        }

        let folds = (0..self.n_splits)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..labels.len()).partition(|&idx| assignment[idx] == fold);
                Fold {
                    index: fold,
                    train,
                    test,
                }
            })
            .collect();
        Ok(folds)
    }
}

pub struct SubsetBatches<'a> {
    records: &'a [GraphRecord],
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl<'a> SubsetBatches<'a> {
    pub fn new<R: Rng + ?Sized>(
        records: &'a [GraphRecord],
        indices: &[usize],
        batch_size: usize,
        rng: &mut R,
    ) -> IgResult<Self> {
        if batch_size == 0 {
            return Err(IgError::InvalidConfig("batch_size must be positive".to_string()));
        }
        if let Some(&idx) = indices.iter().find(|&&idx| idx >= records.len()) {
            return Err(IgError::InvalidConfig(format!(
                "subset index {idx} out of range for {} records",
                records.len()
            )));
        }
        let mut order = indices.to_vec();
        order.shuffle(rng);
        Ok(Self {
            records,
            order,
            batch_size,
            cursor: 0,
        })
    }

    pub fn batch_count(&self) -> usize {
        self.order.len().div_ceil(self.batch_size)
    }
}

impl Iterator for SubsetBatches<'_> {
    type Item = IgResult<(BatchedGraph, Array1<i64>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let batch: Vec<&GraphRecord> = self.order[self.cursor..end]
            .iter()
            .map(|&idx| &self.records[idx])
            .collect();
        self.cursor = end;
        Some(collate_refs(&batch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<i64> {
        let mut labels = vec![0; 12];
        labels.extend(vec![1; 7]);
        labels.extend(vec![2; 3]);
        labels
    }

    #[test]
    fn folds_partition_every_index() {
        let labels = labels();
        let folds = StratifiedKFold::new(3, 41).expect("splitter").split(&labels).expect("split");
        assert_eq!(folds.len(), 3);

        let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.test.iter().copied()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..labels.len()).collect::<Vec<_>>());

        for fold in &folds {
            assert_eq!(fold.train.len() + fold.test.len(), labels.len());
            assert!(fold.test.iter().all(|idx| !fold.train.contains(idx)));
        }
        let sizes: Vec<usize> = folds.iter().map(|f| f.test.len()).collect();
        assert!(sizes.iter().max().unwrap() - sizes.iter().min().unwrap() <= 1);
    }

    #[test]
    fn folds_are_stratified_and_seeded() {
        let labels = labels();
        let splitter = StratifiedKFold::new(3, 7).expect("splitter");
        let folds = splitter.split(&labels).expect("split");
        for class in [0, 1, 2] {
            let total = labels.iter().filter(|l| **l == class).count();
            for fold in &folds {
                let in_fold = fold.test.iter().filter(|&&idx| labels[idx] == class).count();
                let even = total as f64 / 3.0;
                assert!((in_fold as f64 - even).abs() < 1.0);
            }
        }
        assert_eq!(folds, splitter.split(&labels).expect("split again"));
    }

    #[test]
    fn degenerate_fold_requests_fail() {
        assert!(StratifiedKFold::new(1, 0).is_err());
        let splitter = StratifiedKFold::new(5, 0).expect("splitter");
        assert!(splitter.split(&[0, 1, 0]).is_err());
    }

    #[test]
    fn subset_batches_cover_subset_once() {
        let records: Vec<GraphRecord> = (0..10)
            .map(|i| GraphRecord::with_unit_features(i % 3 + 1, &[], i as i64))
            .collect();
        let subset = [1, 3, 4, 6, 8, 9, 0];
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let batches = SubsetBatches::new(&records, &subset, 3, &mut rng).expect("batches");
        assert_eq!(batches.batch_count(), 3);

        let mut labels = Vec::new();
        let mut sizes = Vec::new();
        for batch in batches {
            let (graph, batch_labels) = batch.expect("collate");
            assert_eq!(graph.batch_size(), batch_labels.len());
            sizes.push(batch_labels.len());
            labels.extend(batch_labels.iter().copied());
        }
        assert_eq!(sizes, vec![3, 3, 1]);
        labels.sort_unstable();
        assert_eq!(labels, vec![0, 1, 3, 4, 6, 8, 9]);
    }

    #[test]
    fn subset_batches_validate_arguments() {
        let records = vec![GraphRecord::with_unit_features(1, &[], 0)];
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        assert!(SubsetBatches::new(&records, &[0], 0, &mut rng).is_err());
        assert!(SubsetBatches::new(&records, &[1], 2, &mut rng).is_err());
    }
}
