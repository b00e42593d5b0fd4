/*
 * @Date         : 2026-10-15
 * @Description  : MNIST 训练入口：选择网络与优化器，逐 epoch 训练并测试
 *
 * 用法：
 *   mnist --model cnn --optimizer auto-adam --epochs 3 --seed 1
 *   RUST_LOG=autoopt=debug mnist --optimizer auto-sgd   # 同时输出 Auto 优化器的回退信息
 */

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use autoopt::nn::ModelKind;
use autoopt::optim::OptimizerKind;
use autoopt::train::{self, TrainConfig};

#[derive(Parser, Debug)]
#[command(name = "mnist")]
#[command(about = "在 MNIST 上比较 SGD、Adam、Gauss-Newton 与 Auto 系列优化器")]
#[command(version)]
struct Cli {
    /// 网络结构：fc | cnn
    #[arg(long, default_value = "fc")]
    model: ModelKind,

    /// 优化器：sgd | adam | gauss-newton | auto-sgd | auto-adam | auto-gauss-newton
    #[arg(long, default_value = "sgd")]
    optimizer: OptimizerKind,

    /// 训练批大小
    #[arg(long, default_value_t = 64)]
    batch_size: usize,

    /// 测试批大小
    #[arg(long, default_value_t = 1000)]
    test_batch_size: usize,

    /// 训练轮数
    #[arg(long, default_value_t = 1)]
    epochs: usize,

    /// Auto 优化器曲率统计量的滑动平均系数
    #[arg(long, default_value_t = 0.9)]
    ewma: f32,

    /// Auto 优化器 γ0 的初值
    #[arg(long, default_value_t = 0.999)]
    gamma0: f32,

    /// 学习率（SGD、Adam、Gauss-Newton）
    #[arg(long, default_value_t = 0.01)]
    lr: f32,

    /// SGD 动量（dampening 取相同的值）
    #[arg(long, default_value_t = 0.0)]
    momentum: f32,

    /// 一阶矩的滑动平均系数
    #[arg(long = "beta-1", default_value_t = 0.9)]
    beta1: f32,

    /// 二阶矩 / 曲率的滑动平均系数
    #[arg(long = "beta-2", default_value_t = 0.999)]
    beta2: f32,

    /// Adam 的平滑项，同时是 Gauss-Newton 系列的阻尼
    #[arg(long, default_value_t = 1e-3)]
    eps: f32,

    /// 兼容选项：始终在 CPU 上训练
    #[arg(long)]
    no_cuda: bool,

    /// 随机种子，-1 表示不固定
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    seed: i64,

    /// 每隔多少个批次输出一次训练进度
    #[arg(long, default_value_t = 100)]
    log_interval: usize,

    /// MNIST 数据目录，缺少文件时自动下载
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,
}

impl From<Cli> for TrainConfig {
    fn from(cli: Cli) -> Self {
        Self {
            model: cli.model,
            optimizer: cli.optimizer,
            batch_size: cli.batch_size,
            test_batch_size: cli.test_batch_size,
            epochs: cli.epochs,
            ewma: cli.ewma,
            gamma0: cli.gamma0,
            lr: cli.lr,
            momentum: cli.momentum,
            beta1: cli.beta1,
            beta2: cli.beta2,
            eps: cli.eps,
            no_cuda: cli.no_cuda,
            seed: cli.seed,
            log_interval: cli.log_interval,
            data_dir: cli.data_dir,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("autoopt=info,mnist=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = TrainConfig::from(Cli::parse());
    info!("配置: {}", config.to_json()?);

    let reports = train::run(&config)?;
    if let Some(last) = reports.last() {
        info!(
            "训练结束：{} 轮，最终测试准确率 {:.2}%",
            last.epoch,
            100.0 * last.test.accuracy()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_train_config() {
        let cli = Cli::parse_from(["mnist"]);
        assert_eq!(TrainConfig::from(cli), TrainConfig::default());
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::parse_from([
            "mnist",
            "--model",
            "cnn",
            "--optimizer",
            "auto-gn",
            "--beta-1",
            "0.8",
            "--seed",
            "-1",
            "--no-cuda",
            "--data-dir",
            "/tmp/mnist",
        ]);
        let config = TrainConfig::from(cli);
        assert_eq!(config.model, ModelKind::Cnn);
        assert_eq!(config.optimizer, OptimizerKind::AutoGaussNewton);
        assert_eq!(config.beta1, 0.8);
        assert_eq!(config.seed, -1);
        assert!(config.no_cuda);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/mnist"));
    }

    #[test]
    fn test_rejects_unknown_names() {
        assert!(Cli::try_parse_from(["mnist", "--optimizer", "rmsprop"]).is_err());
        assert!(Cli::try_parse_from(["mnist", "--model", "rnn"]).is_err());
    }
}
