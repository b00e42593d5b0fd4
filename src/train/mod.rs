/*
 * @Date         : 2026-10-15
 * @Description  : 训练配置与训练/测试循环
 */

mod config;
mod trainer;

pub use config::TrainConfig;
pub use trainer::{EpochReport, TestReport, run, run_with_data, test, train_epoch};

#[cfg(test)]
mod tests;
