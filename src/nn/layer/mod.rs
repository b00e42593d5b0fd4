/*
 * @Date         : 2026-10-15
 * @Description  : 网络层：每层自带前向、反向，以及（可选的）逐样本曲率统计
 */

mod activation;
mod conv2d;
mod dropout;
mod flatten;
mod linear;
mod max_pool2d;
mod sequential;

pub use activation::{LogSoftmax, Relu, log_softmax};
pub use conv2d::Conv2d;
pub use dropout::{Dropout, Dropout2d};
pub use flatten::Flatten;
pub use linear::Linear;
pub use max_pool2d::MaxPool2d;
pub use sequential::Sequential;

use std::collections::BTreeMap;

use rand::Rng;

use super::{NnError, Parameter};
use crate::tensor::Tensor;

/// 前向传播的运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mode {
    /// 训练模式：dropout 生效，并缓存反向所需的数据
    pub training: bool,
    /// 反向时是否额外统计逐样本梯度平方（Gauss-Newton 曲率）
    pub track_curvature: bool,
}

impl Mode {
    pub const fn train() -> Self {
        Self {
            training: true,
            track_curvature: false,
        }
    }

    pub const fn eval() -> Self {
        Self {
            training: false,
            track_curvature: false,
        }
    }
}

/// 参数名 → 扰动方向（与参数同形状），按名称有序以保证求和顺序固定
pub type Directions = BTreeMap<String, Tensor>;

/// 网络层 trait
///
/// `backward` 接收批内平均 loss 对本层输出的梯度，返回对本层输入的梯度，
/// 并把参数梯度累加进各自的 [`Parameter`]。
///
/// `tangent` 是前向模式求导（JVP）：在最近一次训练前向的工作点上，
/// 给定输入的切向量与参数的扰动方向，返回输出的切向量。
/// `None` 表示切向量恒为零。
pub trait Layer {
    fn forward(&mut self, input: &Tensor, mode: Mode) -> Result<Tensor, NnError>;

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NnError>;

    fn tangent(&self, input: Option<&Tensor>, directions: &Directions) -> Result<Option<Tensor>, NnError>;

    fn parameters(&self) -> Vec<&Parameter> {
        Vec::new()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        Vec::new()
    }

    /// 层名称，用于错误信息
    fn name(&self) -> &str;
}

/// PyTorch 默认初始化：U(-1/√fan_in, 1/√fan_in)，权重与偏置相同
pub(crate) fn fan_in_uniform<R: Rng + ?Sized>(fan_in: usize, shape: &[usize], rng: &mut R) -> Tensor {
    let bound = 1.0 / (fan_in as f32).sqrt();
    Tensor::new_uniform(-bound, bound, shape, rng)
}

/// 切向量求和，`None` 视为零
pub(crate) fn accumulate(acc: &mut Option<Tensor>, term: Tensor) {
    match acc {
        Some(a) => *a += &term,
        None => *acc = Some(term),
    }
}

/// 切向量形状须与缓存的工作点一致
pub(crate) fn expect_same_shape(layer: &str, expected: &[usize], got: &Tensor) -> Result<(), NnError> {
    if got.shape() == expected {
        Ok(())
    } else {
        Err(NnError::ShapeMismatch {
            layer: layer.to_string(),
            expected: format!("{expected:?}"),
            got: got.shape().to_vec(),
        })
    }
}

pub(crate) fn expect_rank(layer: &str, input: &Tensor, rank: usize, expected: &str) -> Result<(), NnError> {
    if input.dimension() == rank {
        Ok(())
    } else {
        Err(NnError::ShapeMismatch {
            layer: layer.to_string(),
            expected: expected.to_string(),
            got: input.shape().to_vec(),
        })
    }
}
