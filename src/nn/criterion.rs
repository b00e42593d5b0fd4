/*
 * @Date         : 2026-10-15
 * @Description  : 负对数似然损失（NLL），输入为 log-softmax 之后的对数概率
 */

use crate::nn::NnError;
use crate::tensor::Tensor;

/// 损失的归约方式，与 PyTorch 的 `reduction` 参数一致
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// 返回形状为 `[N]` 的逐样本损失
    None,
    /// 批内平均，返回形状为 `[1]` 的张量
    Mean,
    /// 批内求和，返回形状为 `[1]` 的张量
    Sum,
}

/// 校验输出与标签，并返回每个样本的类别下标
fn class_indices(log_probs: &Tensor, targets: &Tensor) -> Result<Vec<usize>, NnError> {
    if log_probs.dimension() != 2 {
        return Err(NnError::ShapeMismatch {
            layer: "nll_loss".to_string(),
            expected: "[batch, classes]".to_string(),
            got: log_probs.shape().to_vec(),
        });
    }
    let (batch, classes) = (log_probs.shape()[0], log_probs.shape()[1]);
    if targets.size() != batch {
        return Err(NnError::BatchMismatch {
            output: batch,
            labels: targets.size(),
        });
    }
    targets
        .iter()
        .map(|&label| {
            if label >= 0.0 && label.fract() == 0.0 && (label as usize) < classes {
                Ok(label as usize)
            } else {
                Err(NnError::InvalidLabel {
                    label,
                    num_classes: classes,
                })
            }
        })
        .collect()
}

/// NLL 损失：`loss_i = -log_probs[i, targets[i]]`
pub fn nll_loss(log_probs: &Tensor, targets: &Tensor, reduction: Reduction) -> Result<Tensor, NnError> {
    let indices = class_indices(log_probs, targets)?;
    let lp = log_probs.view2();
    let per_sample: Vec<f32> = indices
        .iter()
        .enumerate()
        .map(|(i, &c)| -lp[[i, c]])
        .collect();

    Ok(match reduction {
        Reduction::None => {
            let n = per_sample.len();
            Tensor::from_vec(per_sample, &[n])
        }
        Reduction::Mean => {
            let n = per_sample.len().max(1) as f32;
            Tensor::from(per_sample.iter().sum::<f32>() / n)
        }
        Reduction::Sum => Tensor::from(per_sample.iter().sum::<f32>()),
    })
}

/// 平均 NLL 对 `log_probs` 的梯度：目标类别处为 `-1/N`，其余为 0
pub fn nll_loss_backward(log_probs: &Tensor, targets: &Tensor) -> Result<Tensor, NnError> {
    let indices = class_indices(log_probs, targets)?;
    let mut grad = Tensor::zeros(log_probs.shape());
    let scale = -1.0 / indices.len().max(1) as f32;
    for (i, c) in indices.into_iter().enumerate() {
        grad[[i, c]] = scale;
    }
    Ok(grad)
}

/// 平均 NLL 的 Gauss-Newton 矩阵在两个方向上的双线性型 `aᵀ G b`
///
/// `a`、`b` 为网络输出（对数概率）沿两个参数方向的切向量。对 log-softmax 输出，
/// `G = (1/N) Σᵢ Jᵢᵀ diag(pᵢ) Jᵢ`，因此只需 `(1/N) Σᵢ Σ_c p_ic · a_ic · b_ic`。
pub fn gauss_newton_inner(log_probs: &Tensor, a: &Tensor, b: &Tensor) -> Result<f64, NnError> {
    for t in [a, b] {
        if !t.is_same_shape(log_probs) {
            return Err(NnError::ShapeMismatch {
                layer: "gauss_newton_inner".to_string(),
                expected: format!("{:?}", log_probs.shape()),
                got: t.shape().to_vec(),
            });
        }
    }
    let n = log_probs.shape().first().copied().unwrap_or(0).max(1) as f64;
    let weighted = log_probs
        .iter()
        .zip(a.iter().zip(b.iter()))
        .map(|(&lp, (&x, &y))| f64::from(lp.exp()) * f64::from(x) * f64::from(y))
        .sum::<f64>();
    Ok(weighted / n)
}
