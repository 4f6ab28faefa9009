use ndarray::Array2;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

pub type NodeFeatures = Vec<f32>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeAttributes {
    pub weight: f64,
    pub feat: Vec<f32>,
}

pub type RecordGraph = DiGraph<NodeFeatures, EdgeAttributes>;

/// Persisted form of one record. Exactly one of `adj` (dense `N x N`) or
/// `edges` (`[src, dst, value]` triples) must be present. The `*_dim` fields
/// declare row widths and matter when a list is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub num_node: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adj: Option<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<(usize, usize, f64)>>,
    pub target: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_feat: Option<Vec<Vec<f32>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_feat_dim: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_feat: Option<Vec<Vec<f32>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_feat_dim: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lap_pos_enc: Option<Vec<Vec<f32>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lap_pos_enc_dim: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wl_pos_enc: Option<Vec<u32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSplit {
    List(Vec<RawRecord>),
    Wrapped { records: Vec<RawRecord> },
}

impl RawSplit {
    pub fn into_records(self) -> Vec<RawRecord> {
        match self {
            RawSplit::List(records) => records,
            RawSplit::Wrapped { records } => records,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphRecord {
    pub graph: RecordGraph,
    pub label: i64,
    pub node_feat_dim: usize,
    pub edge_feat_dim: usize,
    pub lap_pos_enc: Option<Array2<f32>>,
    pub wl_pos_enc: Option<Vec<u32>>,
}

impl GraphRecord {
    pub fn with_unit_features(node_count: usize, edges: &[(usize, usize)], label: i64) -> Self {
        let mut graph = RecordGraph::with_capacity(node_count, edges.len());
        for _ in 0..node_count {
            graph.add_node(vec![1.0]);
        }
        for &(src, dst) in edges {
            graph.add_edge(
                NodeIndex::new(src),
                NodeIndex::new(dst),
                EdgeAttributes {
                    weight: 1.0,
                    feat: vec![1.0],
                },
            );
        }
        Self::from_graph(graph, label, 1, 1)
    }

    pub fn from_graph(
        graph: RecordGraph,
        label: i64,
        node_feat_dim: usize,
        edge_feat_dim: usize,
    ) -> Self {
        Self {
            graph,
            label,
            node_feat_dim,
            edge_feat_dim,
            lap_pos_enc: None,
            wl_pos_enc: None,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn edge_list(&self) -> Vec<(usize, usize)> {
        self.graph
            .edge_references()
            .map(|edge| (edge.source().index(), edge.target().index()))
            .collect()
    }

    pub fn node_features(&self) -> impl Iterator<Item = &NodeFeatures> {
        self.graph.node_weights()
    }

    pub fn edge_features(&self) -> impl Iterator<Item = &[f32]> {
        self.graph.edge_weights().map(|edge| edge.feat.as_slice())
    }

    pub fn has_self_loop(&self, node: usize) -> bool {
        let idx = NodeIndex::new(node);
        self.graph.find_edge(idx, idx).is_some()
    }

    pub fn has_lap_pos_enc(&self) -> bool {
        self.lap_pos_enc.is_some()
    }

    pub fn has_wl_pos_enc(&self) -> bool {
        self.wl_pos_enc.is_some()
    }
}
