use std::fmt;

use petgraph::prelude::NodeIndex;

use crate::error::IgResult;
use crate::graph::{EdgeAttributes, GraphRecord, RecordGraph};
use crate::spectral::laplacian_positional_encoding;
use crate::wl::wl_positional_encoding;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphTransform {
    SelfLoop,
    FullGraph,
    LaplacianPe { dim: usize },
    WlPe,
}

impl GraphTransform {
    pub fn apply(&self, record: &GraphRecord) -> IgResult<GraphRecord> {
        match *self {
            GraphTransform::SelfLoop => Ok(self_loop(record)),
            GraphTransform::FullGraph => Ok(full_graph(record)),
            GraphTransform::LaplacianPe { dim } => {
                let mut next = record.clone();
                next.lap_pos_enc = Some(laplacian_positional_encoding(record, dim)?);
                Ok(next)
            }
            GraphTransform::WlPe => {
                let mut next = record.clone();
                next.wl_pos_enc = Some(wl_positional_encoding(record));
                Ok(next)
            }
        }
    }
}

impl fmt::Display for GraphTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphTransform::SelfLoop => write!(f, "self-loop"),
            GraphTransform::FullGraph => write!(f, "full-graph"),
            GraphTransform::LaplacianPe { dim } => write!(f, "laplacian-pe(dim={dim})"),
            GraphTransform::WlPe => write!(f, "wl-pe"),
        }
    }
}

/// New loops get zero features. Encodings are dropped only when a loop is added.
pub fn self_loop(record: &GraphRecord) -> GraphRecord {
    let missing: Vec<usize> = (0..record.node_count())
        .filter(|&node| !record.has_self_loop(node))
        .collect();
    if missing.is_empty() {
        return record.clone();
    }

    let mut graph = record.graph.clone();
    for node in missing {
        let idx = NodeIndex::new(node);
        graph.add_edge(idx, idx, placeholder_edge(record.edge_feat_dim));
    }
    GraphRecord::from_graph(graph, record.label, record.node_feat_dim, record.edge_feat_dim)
}

pub fn full_graph(record: &GraphRecord) -> GraphRecord {
    let n = record.node_count();
    let mut graph = RecordGraph::with_capacity(n, n * n.saturating_sub(1));
    for feat in record.node_features() {
        graph.add_node(feat.clone());
    }
    for src in 0..n {
        for dst in (0..n).filter(|&dst| dst != src) {
            graph.add_edge(
                NodeIndex::new(src),
                NodeIndex::new(dst),
                placeholder_edge(record.edge_feat_dim),
            );
        }
    }

    let mut next =
        GraphRecord::from_graph(graph, record.label, record.node_feat_dim, record.edge_feat_dim);
    if let Some(encoding) = &record.lap_pos_enc {
        next.lap_pos_enc = Some(encoding.clone());
    }
    if let Some(colors) = &record.wl_pos_enc {
        next.wl_pos_enc = Some(colors.clone());
    }
    next
}

fn placeholder_edge(width: usize) -> EdgeAttributes {
    EdgeAttributes {
        weight: 1.0,
        feat: vec![0.0; width],
    }
}
