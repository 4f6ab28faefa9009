use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{IgError, IgResult};
use crate::transform::GraphTransform;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    pub self_loop: bool,
    pub lap_pos_enc: bool,
    pub pos_enc_dim: usize,
    pub wl_pos_enc: bool,
    pub full_graph: bool,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            self_loop: false,
            lap_pos_enc: false,
            pos_enc_dim: 8,
            wl_pos_enc: false,
            full_graph: false,
        }
    }
}

impl AugmentConfig {
    // full graph must come last, it discards the topology the encoders read
    pub fn transforms(&self) -> Vec<GraphTransform> {
        let mut transforms = Vec::new();
        if self.self_loop {
            transforms.push(GraphTransform::SelfLoop);
        }
        if self.lap_pos_enc {
            transforms.push(GraphTransform::LaplacianPe {
                dim: self.pos_enc_dim,
            });
        }
        if self.wl_pos_enc {
            transforms.push(GraphTransform::WlPe);
        }
        if self.full_graph {
            transforms.push(GraphTransform::FullGraph);
        }
        transforms
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldParams {
    pub seed: u64,
    pub kfold_splits: usize,
    pub batch_size: usize,
}

impl Default for FoldParams {
    fn default() -> Self {
        Self {
            seed: 41,
            kfold_splits: 5,
            batch_size: 128,
        }
    }
}

/// Unknown keys (model hyper-parameters) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareConfig {
    pub dataset: String,
    pub data_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub use_cache: bool,
    pub params: FoldParams,
    pub net_params: AugmentConfig,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            dataset: crate::datasets::DATASET_NAME.to_string(),
            data_dir: PathBuf::from(crate::datasets::DEFAULT_ROOT),
            cache_dir: PathBuf::from(crate::cache::CACHE_DIR),
            use_cache: true,
            params: FoldParams::default(),
            net_params: AugmentConfig::default(),
        }
    }
}

impl PrepareConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("parse configuration json")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("open config file {:?}", path))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parse config file {:?}", path))
    }

    pub fn validate(&self) -> IgResult<()> {
        if self.params.kfold_splits < 2 {
            return Err(IgError::InvalidConfig(format!(
                "kfold_splits must be at least 2, got {}",
                self.params.kfold_splits
            )));
        }
        if self.params.batch_size == 0 {
            return Err(IgError::InvalidConfig("batch_size must be positive".to_string()));
        }
        if self.net_params.lap_pos_enc && self.net_params.pos_enc_dim == 0 {
            return Err(IgError::InvalidConfig(
                "pos_enc_dim must be positive when lap_pos_enc is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transforms_follow_fixed_order() {
        let config = AugmentConfig {
            self_loop: true,
            lap_pos_enc: true,
            pos_enc_dim: 4,
            wl_pos_enc: true,
            full_graph: true,
        };
        assert_eq!(
            config.transforms(),
            vec![
                GraphTransform::SelfLoop,
                GraphTransform::LaplacianPe { dim: 4 },
                GraphTransform::WlPe,
                GraphTransform::FullGraph,
            ]
        );
        assert!(AugmentConfig::default().transforms().is_empty());
    }

    #[test]
    fn training_config_json_is_accepted() {
        let json = r#"{
            "gpu": {"use": false, "id": 0},
            "model": "GraphTransformer",
            "dataset": "IG",
            "params": {"seed": 7, "epochs": 100, "batch_size": 32, "kfold_splits": 10},
            "net_params": {"L": 4, "hidden_dim": 64, "lap_pos_enc": true, "pos_enc_dim": 6,
                           "wl_pos_enc": false, "full_graph": true, "self_loop": false}
        }"#;
        let config = PrepareConfig::from_json_str(json).expect("parse config");
        assert_eq!(config.params.seed, 7);
        assert_eq!(config.params.kfold_splits, 10);
        assert_eq!(config.params.batch_size, 32);
        assert!(config.net_params.lap_pos_enc);
        assert_eq!(config.net_params.pos_enc_dim, 6);
        assert!(config.net_params.full_graph);
        assert_eq!(config.data_dir, PathBuf::from("data/IGs"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_degenerate_values() {
        let mut config = PrepareConfig::default();
        config.params.kfold_splits = 1;
        assert!(matches!(config.validate(), Err(IgError::InvalidConfig(_))));

        let mut config = PrepareConfig::default();
        config.net_params.lap_pos_enc = true;
        config.net_params.pos_enc_dim = 0;
        assert!(config.validate().is_err());
    }
}
