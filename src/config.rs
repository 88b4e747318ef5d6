//! Pipeline configuration, loaded from YAML.
//!
//! One file names the three data partitions, the tagger dimensions and the
//! training hyperparameters:
//!
//! ```yaml
//! data:
//!   train: data/train.txt
//!   validation: data/validation.txt
//!   test: data/test.txt
//! model:
//!   embedding_dim: 200
//!   hidden_dim: 200
//! training:
//!   epochs: 4
//!   batch_size: 32
//!   learning_rate: 0.005
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::train::TrainConfig;

/// Partition paths and reader behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Training partition.
    pub train: PathBuf,
    /// Validation partition.
    pub validation: PathBuf,
    /// Test partition.
    pub test: PathBuf,
    /// Skip malformed lines instead of aborting the load.
    #[serde(default)]
    pub skip_malformed: bool,
}

/// Tagger dimensions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Embedding vector size.
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
    /// Hidden state size of each LSTM direction.
    #[serde(default = "default_hidden_dim")]
    pub hidden_dim: usize,
}

fn default_embedding_dim() -> usize {
    200
}
fn default_hidden_dim() -> usize {
    200
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            embedding_dim: default_embedding_dim(),
            hidden_dim: default_hidden_dim(),
        }
    }
}

/// Whole-pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Data partitions.
    pub data: DataConfig,
    /// Tagger dimensions.
    #[serde(default)]
    pub model: ModelConfig,
    /// Training hyperparameters.
    #[serde(default)]
    pub training: TrainConfig,
}

impl PipelineConfig {
    /// Load and validate a configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject dimension and hyperparameter values that cannot train.
    pub fn validate(&self) -> Result<()> {
        if self.model.embedding_dim == 0 {
            return Err(Error::Config("embedding_dim must be positive".into()));
        }
        if self.model.hidden_dim == 0 {
            return Err(Error::Config("hidden_dim must be positive".into()));
        }
        if self.training.learning_rate <= 0.0 {
            return Err(Error::Config("learning_rate must be positive".into()));
        }
        if self.training.lr_decay <= 0.0 {
            return Err(Error::Config("lr_decay must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.training.momentum) {
            return Err(Error::Config("momentum must be in [0, 1)".into()));
        }
        if let Some(clip) = self.training.clip_norm {
            if clip <= 0.0 {
                return Err(Error::Config("clip_norm must be positive".into()));
            }
        }
        Ok(())
    }
}
