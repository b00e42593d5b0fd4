/*
 * @Date         : 2026-10-15
 * @Description  : `--optimizer` 选项与优化器的静态分发枚举
 */

use std::fmt;
use std::str::FromStr;

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use super::{Adam, AutoAdam, AutoGaussNewton, AutoSgd, GaussNewton, OptimError, Optimizer, Sgd};
use crate::errors::AutoOptError;
use crate::nn::Network;
use crate::train::TrainConfig;

#[enum_dispatch]
pub enum AnyOptimizer {
    Sgd,
    Adam,
    GaussNewton,
    AutoSgd,
    AutoAdam,
    AutoGaussNewton,
}

/// `--optimizer` 的可选值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptimizerKind {
    #[default]
    Sgd,
    Adam,
    GaussNewton,
    AutoSgd,
    AutoAdam,
    AutoGaussNewton,
}

impl OptimizerKind {
    pub const ALL: [Self; 6] = [
        Self::Sgd,
        Self::Adam,
        Self::GaussNewton,
        Self::AutoSgd,
        Self::AutoAdam,
        Self::AutoGaussNewton,
    ];

    /// 用配置中的超参数构建优化器
    ///
    /// SGD 的 dampening 取与 momentum 相同的值。
    pub fn build(self, config: &TrainConfig) -> AnyOptimizer {
        match self {
            Self::Sgd => Sgd::new(config.lr, config.momentum, config.momentum).into(),
            Self::Adam => Adam::new(config.lr, config.beta1, config.beta2, config.eps).into(),
            Self::GaussNewton => {
                GaussNewton::new(config.lr, config.beta1, config.beta2, config.eps).into()
            }
            Self::AutoSgd => AutoSgd::new(config.ewma, config.gamma0, config.eps).into(),
            Self::AutoAdam => AutoAdam::new(
                config.ewma,
                config.gamma0,
                config.beta1,
                config.beta2,
                config.eps,
            )
            .into(),
            Self::AutoGaussNewton => {
                AutoGaussNewton::new(config.ewma, config.gamma0, config.beta2, config.eps).into()
            }
        }
    }

    /// 只有对角 Gauss-Newton 系列需要反向时统计曲率
    pub const fn needs_curvature(self) -> bool {
        matches!(self, Self::GaussNewton | Self::AutoGaussNewton)
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sgd => "sgd",
            Self::Adam => "adam",
            Self::GaussNewton => "gauss-newton",
            Self::AutoSgd => "auto-sgd",
            Self::AutoAdam => "auto-adam",
            Self::AutoGaussNewton => "auto-gauss-newton",
        })
    }
}

impl FromStr for OptimizerKind {
    type Err = AutoOptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sgd" => Ok(Self::Sgd),
            "adam" => Ok(Self::Adam),
            "gauss-newton" | "gn" => Ok(Self::GaussNewton),
            "auto-sgd" => Ok(Self::AutoSgd),
            "auto-adam" => Ok(Self::AutoAdam),
            "auto-gauss-newton" | "auto-gn" => Ok(Self::AutoGaussNewton),
            other => Err(AutoOptError::UnknownOptimizer(other.to_string())),
        }
    }
}
