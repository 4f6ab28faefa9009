use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use petgraph::visit::EdgeRef;

use crate::graph::model::{GraphRecord, RawRecord, RawSplit};

pub struct RecordWriter;

impl RecordWriter {
    pub fn to_raw_record(record: &GraphRecord) -> RawRecord {
        let edges = record
            .graph
            .edge_references()
            .map(|edge| (edge.source().index(), edge.target().index(), edge.weight().weight))
            .collect();
        let node_feat = record.node_features().cloned().collect();
        let edge_feat = record.edge_features().map(<[f32]>::to_vec).collect();
        let lap_pos_enc = record
            .lap_pos_enc
            .as_ref()
            .map(|matrix| matrix.rows().into_iter().map(|row| row.to_vec()).collect());

        RawRecord {
            num_node: record.node_count(),
            adj: None,
            edges: Some(edges),
            target: serde_json::Value::from(record.label),
            node_feat: Some(node_feat),
            node_feat_dim: Some(record.node_feat_dim),
            edge_feat: Some(edge_feat),
            edge_feat_dim: Some(record.edge_feat_dim),
            lap_pos_enc_dim: record.lap_pos_enc.as_ref().map(|matrix| matrix.ncols()),
            lap_pos_enc,
            wl_pos_enc: record.wl_pos_enc.clone(),
        }
    }

    pub fn to_raw_split(records: &[GraphRecord]) -> RawSplit {
        RawSplit::List(records.iter().map(Self::to_raw_record).collect())
    }

    pub fn to_json_string(records: &[GraphRecord]) -> Result<String> {
        Ok(serde_json::to_string(&Self::to_raw_split(records))?)
    }

    pub fn write_to_path(records: &[GraphRecord], path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create split directory {:?}", parent))?;
        }
        let file = File::create(path).with_context(|| format!("create split file {:?}", path))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &Self::to_raw_split(records))
            .with_context(|| format!("serialize split to {:?}", path))?;
        writer.flush()?;
        Ok(())
    }
}
