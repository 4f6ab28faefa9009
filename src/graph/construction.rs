use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexSet;
use ndarray::Array2;
use petgraph::prelude::NodeIndex;

use crate::error::{IgError, IgResult};
use crate::graph::model::{EdgeAttributes, GraphRecord, RawRecord, RawSplit, RecordGraph};

#[derive(Debug, Default)]
pub struct RecordLoader;

impl RecordLoader {
    pub fn from_json_str(json: &str) -> Result<Vec<GraphRecord>> {
        let raw: RawSplit = serde_json::from_str(json).context("parse split json")?;
        Ok(Self::from_raw_split(raw)?)
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Vec<GraphRecord>> {
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;
        Self::from_json_str(&buf)
    }

    pub fn from_path(path: &Path) -> Result<Vec<GraphRecord>> {
        let file = File::open(path).with_context(|| format!("open split file {:?}", path))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("load records from {:?}", path))
    }

    pub fn from_raw_split(raw: RawSplit) -> IgResult<Vec<GraphRecord>> {
        raw.into_records()
            .into_iter()
            .enumerate()
            .map(|(index, record)| Self::from_raw_record(index, record))
            .collect()
    }

    pub fn from_raw_record(index: usize, raw: RawRecord) -> IgResult<GraphRecord> {
        let n = raw.num_node;
        let label = target_to_label(&raw.target)
            .ok_or_else(|| IgError::integrity(index, format!("target {} is not an integer", raw.target)))?;

        let entries = match (raw.adj, raw.edges) {
            (Some(adj), None) => dense_entries(index, n, adj)?,
            (None, Some(edges)) => triple_entries(index, n, edges)?,
            (Some(_), Some(_)) => {
                return Err(IgError::integrity(index, "both `adj` and `edges` are present"));
            }
            (None, None) => {
                return Err(IgError::integrity(index, "missing `adj` or `edges`"));
            }
        };

        let (node_feat_dim, node_features) = match raw.node_feat {
            Some(rows) => {
                if rows.len() != n {
                    return Err(IgError::integrity(
                        index,
                        format!("{} node feature rows for {} nodes", rows.len(), n),
                    ));
                }
                (uniform_width(index, "node_feat", &rows, raw.node_feat_dim)?, rows)
            }
            None => (1, vec![vec![1.0]; n]),
        };

        let (edge_feat_dim, edge_features) = match raw.edge_feat {
            Some(rows) => {
                if rows.len() != entries.len() {
                    return Err(IgError::integrity(
                        index,
                        format!("{} edge feature rows for {} edges", rows.len(), entries.len()),
                    ));
                }
                (uniform_width(index, "edge_feat", &rows, raw.edge_feat_dim)?, rows)
            }
            None => (1, vec![vec![1.0]; entries.len()]),
        };

        let mut graph = RecordGraph::with_capacity(n, entries.len());
        for feat in node_features {
            graph.add_node(feat);
        }
        for ((src, dst, weight), feat) in entries.into_iter().zip(edge_features) {
            graph.add_edge(
                NodeIndex::new(src),
                NodeIndex::new(dst),
                EdgeAttributes { weight, feat },
            );
        }

        let mut record = GraphRecord::from_graph(graph, label, node_feat_dim, edge_feat_dim);

        if let Some(rows) = raw.lap_pos_enc {
            if rows.len() != n {
                return Err(IgError::integrity(
                    index,
                    format!("{} laplacian encoding rows for {} nodes", rows.len(), n),
                ));
            }
            let width = uniform_width(index, "lap_pos_enc", &rows, raw.lap_pos_enc_dim)?;
            let flat: Vec<f32> = rows.into_iter().flatten().collect();
            let matrix = Array2::from_shape_vec((n, width), flat)
                .map_err(|err| IgError::integrity(index, err.to_string()))?;
            record.lap_pos_enc = Some(matrix);
        }
        if let Some(colors) = raw.wl_pos_enc {
            if colors.len() != n {
                return Err(IgError::integrity(
                    index,
                    format!("{} wl colors for {} nodes", colors.len(), n),
                ));
            }
            record.wl_pos_enc = Some(colors);
        }

        Ok(record)
    }
}

fn dense_entries(index: usize, n: usize, adj: Vec<Vec<f64>>) -> IgResult<Vec<(usize, usize, f64)>> {
    if adj.len() != n {
        return Err(IgError::integrity(
            index,
            format!("adjacency has {} rows but num_node is {}", adj.len(), n),
        ));
    }
    let mut entries = Vec::new();
    for (row, values) in adj.into_iter().enumerate() {
        if values.len() != n {
            return Err(IgError::integrity(
                index,
                format!("adjacency row {} has {} columns but num_node is {}", row, values.len(), n),
            ));
        }
        for (col, value) in values.into_iter().enumerate() {
            if !value.is_finite() {
                return Err(IgError::integrity(index, format!("non-finite adjacency at ({row}, {col})")));
            }
            if value != 0.0 {
                entries.push((row, col, value));
            }
        }
    }
    Ok(entries)
}

fn triple_entries(
    index: usize,
    n: usize,
    triples: Vec<(usize, usize, f64)>,
) -> IgResult<Vec<(usize, usize, f64)>> {
    let mut seen = IndexSet::with_capacity(triples.len());
    let mut entries = Vec::with_capacity(triples.len());
    for (src, dst, value) in triples {
        if src >= n || dst >= n {
            return Err(IgError::integrity(
                index,
                format!("edge ({src}, {dst}) out of range for {n} nodes"),
            ));
        }
        if !value.is_finite() {
            return Err(IgError::integrity(index, format!("non-finite adjacency at ({src}, {dst})")));
        }
        if !seen.insert((src, dst)) {
            return Err(IgError::integrity(index, format!("duplicate adjacency entry ({src}, {dst})")));
        }
        if value != 0.0 {
            entries.push((src, dst, value));
        }
    }
    Ok(entries)
}

fn uniform_width(
    index: usize,
    field: &str,
    rows: &[Vec<f32>],
    declared: Option<usize>,
) -> IgResult<usize> {
    let width = declared
        .or_else(|| rows.first().map(Vec::len))
        .unwrap_or(1);
    if let Some(pos) = rows.iter().position(|row| row.len() != width) {
        return Err(IgError::integrity(
            index,
            format!("{field} row {pos} has width {} but expected {width}", rows[pos].len()),
        ));
    }
    Ok(width)
}

fn target_to_label(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(num) => num.as_i64().or_else(|| {
            num.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        serde_json::Value::Bool(b) => Some(i64::from(*b)),
        serde_json::Value::Array(items) if items.len() == 1 => target_to_label(&items[0]),
        _ => None,
    }
}
