use ndarray::{Array1, Array2};
use petgraph::visit::EdgeRef;

use crate::error::{IgError, IgResult};
use crate::graph::GraphRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct BatchedGraph {
    pub batch_num_nodes: Vec<usize>,
    pub batch_num_edges: Vec<usize>,
    pub graph_ids: Vec<usize>,
    pub src: Vec<usize>,
    pub dst: Vec<usize>,
    pub node_features: Array2<f32>,
    pub edge_features: Array2<f32>,
    pub lap_pos_enc: Option<Array2<f32>>,
    pub wl_pos_enc: Option<Vec<u32>>,
}

impl BatchedGraph {
    pub fn batch_size(&self) -> usize {
        self.batch_num_nodes.len()
    }

    pub fn node_count(&self) -> usize {
        self.graph_ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.src.len()
    }
}

/// Disjoint union of the samples plus their labels, both in input order. An
/// encoding is stacked only when every graph carries it.
pub fn collate(samples: &[GraphRecord]) -> IgResult<(BatchedGraph, Array1<i64>)> {
    let refs: Vec<&GraphRecord> = samples.iter().collect();
    collate_refs(&refs)
}

pub fn collate_refs(samples: &[&GraphRecord]) -> IgResult<(BatchedGraph, Array1<i64>)> {
    let node_dim = common_width(samples, "node feature", |r| r.node_feat_dim)?;
    let edge_dim = common_width(samples, "edge feature", |r| r.edge_feat_dim)?;

    let total_nodes: usize = samples.iter().map(|r| r.node_count()).sum();
    let total_edges: usize = samples.iter().map(|r| r.edge_count()).sum();

    let mut batch_num_nodes = Vec::with_capacity(samples.len());
    let mut batch_num_edges = Vec::with_capacity(samples.len());
    let mut graph_ids = Vec::with_capacity(total_nodes);
    let mut src = Vec::with_capacity(total_edges);
    let mut dst = Vec::with_capacity(total_edges);
    let mut node_rows = Vec::with_capacity(total_nodes * node_dim);
    let mut edge_rows = Vec::with_capacity(total_edges * edge_dim);

    let mut offset = 0;
    for (graph_id, record) in samples.iter().enumerate() {
        let n = record.node_count();
        batch_num_nodes.push(n);
        batch_num_edges.push(record.edge_count());
        graph_ids.extend(std::iter::repeat(graph_id).take(n));
        for feat in record.node_features() {
            node_rows.extend_from_slice(feat);
        }
        for edge in record.graph.edge_references() {
            src.push(offset + edge.source().index());
            dst.push(offset + edge.target().index());
            edge_rows.extend_from_slice(&edge.weight().feat);
        }
        offset += n;
    }

    let node_features = Array2::from_shape_vec((total_nodes, node_dim), node_rows)
        .map_err(|err| IgError::BatchMismatch(format!("node features: {err}")))?;
    let edge_features = Array2::from_shape_vec((total_edges, edge_dim), edge_rows)
        .map_err(|err| IgError::BatchMismatch(format!("edge features: {err}")))?;

    let batched = BatchedGraph {
        batch_num_nodes,
        batch_num_edges,
        graph_ids,
        src,
        dst,
        node_features,
        edge_features,
        lap_pos_enc: stack_laplacian(samples, total_nodes)?,
        wl_pos_enc: stack_wl(samples)?,
    };
    let labels = samples.iter().map(|record| record.label).collect();
    Ok((batched, labels))
}

fn common_width(
    samples: &[&GraphRecord],
    what: &str,
    width: impl Fn(&GraphRecord) -> usize,
) -> IgResult<usize> {
    let Some(&first) = samples.first() else {
        return Ok(1);
    };
    let expected = width(first);
    let mismatch = samples
        .iter()
        .copied()
        .enumerate()
        .find(|&(_, record)| width(record) != expected);
    if let Some((idx, other)) = mismatch {
        return Err(IgError::BatchMismatch(format!(
            "{what} width {} in sample {idx} differs from {expected}",
            width(other)
        )));
    }
    Ok(expected)
}

fn stack_laplacian(samples: &[&GraphRecord], total_nodes: usize) -> IgResult<Option<Array2<f32>>> {
    let present = samples.iter().filter(|r| r.has_lap_pos_enc()).count();
    if present == 0 {
        return Ok(None);
    }
    if present != samples.len() {
        return Err(IgError::BatchMismatch(format!(
            "laplacian encoding present on {present} of {} graphs",
            samples.len()
        )));
    }

    let dim = common_width(samples, "laplacian encoding", |r| {
        r.lap_pos_enc.as_ref().map_or(0, |m| m.ncols())
    })?;
    let mut rows = Vec::with_capacity(total_nodes * dim);
    for record in samples {
        if let Some(encoding) = &record.lap_pos_enc {
            if encoding.nrows() != record.node_count() {
                return Err(IgError::BatchMismatch(format!(
                    "laplacian encoding has {} rows for {} nodes",
                    encoding.nrows(),
                    record.node_count()
                )));
            }
            rows.extend(encoding.iter().copied());
        }
    }
    Array2::from_shape_vec((total_nodes, dim), rows)
        .map(Some)
        .map_err(|err| IgError::BatchMismatch(format!("laplacian encoding: {err}")))
}

fn stack_wl(samples: &[&GraphRecord]) -> IgResult<Option<Vec<u32>>> {
    let present = samples.iter().filter(|r| r.has_wl_pos_enc()).count();
    if present == 0 {
        return Ok(None);
    }
    if present != samples.len() {
        return Err(IgError::BatchMismatch(format!(
            "wl encoding present on {present} of {} graphs",
            samples.len()
        )));
    }
    let mut colors = Vec::new();
    for record in samples {
        if let Some(wl) = &record.wl_pos_enc {
            colors.extend_from_slice(wl);
        }
    }
    Ok(Some(colors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::GraphTransform;

    fn samples() -> Vec<GraphRecord> {
        vec![
            GraphRecord::with_unit_features(2, &[(0, 1)], 1),
            GraphRecord::with_unit_features(3, &[(0, 1), (1, 2), (2, 0)], 0),
            GraphRecord::with_unit_features(1, &[], 2),
        ]
    }

    #[test]
    fn collate_offsets_edges_and_keeps_order() {
        let (batch, labels) = collate(&samples()).expect("collate");
        assert_eq!(batch.node_count(), 6);
        assert_eq!(batch.edge_count(), 4);
        assert_eq!(batch.batch_size(), 3);
        assert_eq!(batch.batch_num_nodes, vec![2, 3, 1]);
        assert_eq!(batch.batch_num_edges, vec![1, 3, 0]);
        assert_eq!(batch.graph_ids, vec![0, 0, 1, 1, 1, 2]);
        assert_eq!(batch.src, vec![0, 2, 3, 4]);
        assert_eq!(batch.dst, vec![1, 3, 4, 2]);
        assert_eq!(batch.node_features.dim(), (6, 1));
        assert_eq!(batch.edge_features.dim(), (4, 1));
        assert_eq!(labels.to_vec(), vec![1, 0, 2]);
        assert!(batch.lap_pos_enc.is_none());
        assert!(batch.wl_pos_enc.is_none());
    }

    #[test]
    fn collate_stacks_encodings() {
        let encoded: Vec<GraphRecord> = samples()
            .iter()
            .map(|r| GraphTransform::LaplacianPe { dim: 2 }.apply(r).expect("lap"))
            .map(|r| GraphTransform::WlPe.apply(&r).expect("wl"))
            .collect();
        let (batch, _) = collate(&encoded).expect("collate");
        let lap = batch.lap_pos_enc.expect("stacked laplacian");
        assert_eq!(lap.dim(), (6, 2));
        assert_eq!(lap.row(5).to_vec(), vec![0.0, 0.0]);
        assert_eq!(batch.wl_pos_enc.map(|c| c.len()), Some(6));
    }

    #[test]
    fn mixed_encoding_presence_is_rejected() {
        let mut batch = samples();
        batch[0] = GraphTransform::WlPe.apply(&batch[0]).expect("wl");
        assert!(matches!(collate(&batch), Err(IgError::BatchMismatch(_))));
    }

    #[test]
    fn empty_batch_is_empty() {
        let (batch, labels) = collate(&[]).expect("collate");
        assert_eq!(batch.node_count(), 0);
        assert_eq!(labels.len(), 0);
    }
}
