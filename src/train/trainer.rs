/*
 * @Date         : 2026-10-15
 * @Description  : 训练与测试循环
 *
 * 每个批次：zero_grad → forward → loss → 非有限值检查 → backward → step。
 * Gauss-Newton 系列在训练时开启曲率跟踪；批次 loss 为逐样本 NLL（loss_all）的平均。
 */

use rand::Rng;
use tracing::info;

use super::TrainConfig;
use crate::data::{DataLoader, MnistDataset, TensorDataset};
use crate::errors::AutoOptError;
use crate::nn::{Model, Network, Reduction, nll_loss, nll_loss_backward};
use crate::optim::{AnyOptimizer, Optimizer};

/// 一次测试的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestReport {
    /// 测试集上逐样本 NLL 之和（`Reduction::Sum`）除以样本数
    pub average_loss: f32,
    pub correct: usize,
    pub total: usize,
}

impl TestReport {
    /// 准确率（0 ~ 1）
    pub fn accuracy(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f32 / self.total as f32
        }
    }
}

/// 一个 epoch 的训练与测试结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    /// 本 epoch 各批次训练 loss 的平均值
    pub train_loss: f32,
    pub test: TestReport,
}

/// 训练一个 epoch，返回各批次 loss 的平均值
///
/// loss 出现 NaN/inf 时立即停止（不再反向与更新），返回 [`AutoOptError::NonFiniteLoss`]。
pub fn train_epoch(
    epoch: usize,
    model: &mut Model,
    optimizer: &mut AnyOptimizer,
    loader: &DataLoader,
    config: &TrainConfig,
) -> Result<f32, AutoOptError> {
    let track_curvature = optimizer.needs_curvature();
    model.train();
    model.set_curvature_tracking(track_curvature);

    let num_batches = loader.num_batches();
    let mut loss_sum = 0.0f64;
    let mut batches = 0usize;

    for (batch_idx, (images, labels)) in loader.iter().enumerate() {
        optimizer.zero_grad(model);
        let output = model.forward(&images)?;
        // 逐样本 loss（loss_all）；任一样本非有限时均值也非有限
        let loss = nll_loss(&output, &labels, Reduction::None)?.mean();

        if !loss.is_finite() {
            return Err(AutoOptError::NonFiniteLoss {
                epoch,
                batch: batch_idx,
                loss,
            });
        }

        model.backward(&nll_loss_backward(&output, &labels)?)?;
        optimizer.step(model)?;

        loss_sum += f64::from(loss);
        batches += 1;

        if batch_idx % config.log_interval == 0 {
            let batch_len = labels.size();
            info!(
                "Train Epoch: {} [{}/{} ({:.0}%)]\tLoss: {:.6}",
                epoch,
                batch_idx * batch_len,
                loader.len(),
                100.0 * batch_idx as f64 / num_batches as f64,
                loss
            );
        }
    }

    model.set_curvature_tracking(false);
    Ok(if batches == 0 {
        0.0
    } else {
        (loss_sum / batches as f64) as f32
    })
}

/// 在评估模式下遍历整个测试集
pub fn test(model: &mut Model, loader: &DataLoader) -> Result<TestReport, AutoOptError> {
    model.eval();
    let mut loss_sum = 0.0f64;
    let mut correct = 0usize;
    let mut total = 0usize;

    for (images, labels) in loader.iter() {
        let output = model.forward(&images)?;
        let batch_loss = nll_loss(&output, &labels, Reduction::Sum)?;
        loss_sum += f64::from(batch_loss.sum());
        correct += output
            .argmax_rows()
            .iter()
            .zip(labels.iter())
            .filter(|&(&pred, &label)| pred as f32 == label)
            .count();
        total += labels.size();
    }

    let report = TestReport {
        average_loss: if total == 0 {
            0.0
        } else {
            (loss_sum / total as f64) as f32
        },
        correct,
        total,
    };
    info!(
        "Test set: Average loss: {:.4}, Accuracy: {}/{} ({:.0}%)",
        report.average_loss,
        report.correct,
        report.total,
        100.0 * report.accuracy()
    );
    Ok(report)
}

/// 下载（如有必要）并加载 MNIST，然后按配置训练
pub fn run(config: &TrainConfig) -> Result<Vec<EpochReport>, AutoOptError> {
    config.validate()?;
    let train = MnistDataset::load(&config.data_dir, true, true)?.into_dataset()?;
    let test = MnistDataset::load(&config.data_dir, false, true)?.into_dataset()?;
    info!("MNIST 已加载：训练集 {} 个样本，测试集 {} 个样本", train.len(), test.len());
    run_with_data(config, train, test)
}

/// 在给定的训练集与测试集上按配置训练，每个 epoch 之后测试一次
pub fn run_with_data(
    config: &TrainConfig,
    train: TensorDataset,
    test_set: TensorDataset,
) -> Result<Vec<EpochReport>, AutoOptError> {
    config.validate()?;
    if config.no_cuda {
        info!("已指定 --no-cuda");
    }
    info!("使用 CPU 训练");

    let mut rng = config.rng();
    let mut model = config.model.build(&mut rng);
    let mut optimizer = config.optimizer.build(config);
    info!(
        "模型 {}（{} 个参数），优化器 {}",
        config.model,
        model.num_params(),
        config.optimizer
    );

    let train_loader = DataLoader::new(train, config.batch_size)
        .shuffle(true)
        .seed(rng.r#gen());
    let test_loader = DataLoader::new(test_set, config.test_batch_size);

    let mut reports = Vec::with_capacity(config.epochs);
    for epoch in 1..=config.epochs {
        let train_loss = train_epoch(epoch, &mut model, &mut optimizer, &train_loader, config)?;
        let report = test(&mut model, &test_loader)?;
        reports.push(EpochReport {
            epoch,
            train_loss,
            test: report,
        });
    }
    Ok(reports)
}
