/*
 * @Date         : 2026-10-15
 * @Description  : MNIST 分类模型及 `--model` 选项
 */

mod cnn;
mod fc_net;

pub use cnn::Cnn;
pub use fc_net::{FcNet, INPUT_FEATURES, NUM_CLASSES};

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::Model;
use crate::errors::AutoOptError;

/// `--model` 的可选值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    Fc,
    Cnn,
}

impl ModelKind {
    pub const ALL: [Self; 2] = [Self::Fc, Self::Cnn];

    /// 以`rng`初始化权重，构建对应模型
    pub fn build<R: Rng + ?Sized>(self, rng: &mut R) -> Model {
        match self {
            Self::Fc => FcNet::new(rng).into(),
            Self::Cnn => Cnn::new(rng).into(),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fc => "fc",
            Self::Cnn => "cnn",
        })
    }
}

impl FromStr for ModelKind {
    type Err = AutoOptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fc" => Ok(Self::Fc),
            "cnn" => Ok(Self::Cnn),
            other => Err(AutoOptError::UnknownModel(other.to_string())),
        }
    }
}
