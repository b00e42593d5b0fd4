/*
 * @Date         : 2026-10-15
 * @Description  : 一次训练的全部超参数
 */

use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::errors::AutoOptError;
use crate::nn::ModelKind;
use crate::optim::OptimizerKind;

/// 训练配置，默认值与命令行默认值一致
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub model: ModelKind,
    pub optimizer: OptimizerKind,
    pub batch_size: usize,
    pub test_batch_size: usize,
    pub epochs: usize,
    /// Auto 优化器中二次统计量的滑动平均系数
    pub ewma: f32,
    /// Auto 优化器 γ0 的初值
    pub gamma0: f32,
    pub lr: f32,
    pub momentum: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub eps: f32,
    /// 仅为兼容命令行，始终在 CPU 上运行
    pub no_cuda: bool,
    /// 随机种子，-1 表示不固定
    pub seed: i64,
    /// 每隔多少个批次输出一次训练进度
    pub log_interval: usize,
    /// MNIST 文件所在目录
    pub data_dir: PathBuf,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::Fc,
            optimizer: OptimizerKind::Sgd,
            batch_size: 64,
            test_batch_size: 1000,
            epochs: 1,
            ewma: 0.9,
            gamma0: 0.999,
            lr: 0.01,
            momentum: 0.0,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-3,
            no_cuda: false,
            seed: -1,
            log_interval: 100,
            data_dir: PathBuf::from("./data"),
        }
    }
}

fn invalid(message: String) -> Result<(), AutoOptError> {
    Err(AutoOptError::InvalidConfig(message))
}

impl TrainConfig {
    /// 检查超参数取值范围
    pub fn validate(&self) -> Result<(), AutoOptError> {
        if self.batch_size == 0 || self.test_batch_size == 0 {
            return invalid(format!(
                "batch size 必须大于 0（训练 {}，测试 {}）",
                self.batch_size, self.test_batch_size
            ));
        }
        if self.log_interval == 0 {
            return invalid("log interval 必须大于 0".to_string());
        }
        if !(self.lr > 0.0 && self.lr.is_finite()) {
            return invalid(format!("学习率必须为正数，实际为 {}", self.lr));
        }
        if !(self.eps > 0.0 && self.eps.is_finite()) {
            return invalid(format!("eps 必须为正数，实际为 {}", self.eps));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return invalid(format!("momentum 须在 [0, 1) 内，实际为 {}", self.momentum));
        }
        for (name, value) in [("beta-1", self.beta1), ("beta-2", self.beta2), ("ewma", self.ewma)] {
            if !(0.0..1.0).contains(&value) {
                return invalid(format!("{name} 须在 [0, 1) 内，实际为 {value}"));
            }
        }
        if !(self.gamma0 > 0.0 && self.gamma0 <= 1.0) {
            return invalid(format!("gamma0 须在 (0, 1] 内，实际为 {}", self.gamma0));
        }
        Ok(())
    }

    /// 固定的种子；仅 `seed == -1` 时返回 `None`，其余负数按位转为 u64
    pub fn fixed_seed(&self) -> Option<u64> {
        (self.seed != -1).then_some(self.seed as u64)
    }

    /// 按种子创建随机源；未固定种子时取系统熵
    pub fn rng(&self) -> StdRng {
        match self.fixed_seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// 以单行 JSON 形式输出，便于写入日志
    pub fn to_json(&self) -> Result<String, AutoOptError> {
        serde_json::to_string(self).map_err(|e| AutoOptError::InvalidConfig(e.to_string()))
    }
}
