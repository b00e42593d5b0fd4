/*
 * @Date         : 2026-10-15
 * @Description  : 网络 trait 及其静态分发枚举
 */

use enum_dispatch::enum_dispatch;

use super::layer::{Directions, Mode};
use super::models::{Cnn, FcNet};
use super::{NnError, Parameter};
use crate::tensor::Tensor;

/// 可训练的模型，按 `--model` 选择
#[enum_dispatch]
pub enum Model {
    FcNet,
    Cnn,
}

#[enum_dispatch(Model)]
pub trait Network {
    /// 前向传播，输入为 `[batch, 1, 28, 28]`（或已展平的 `[batch, 784]`），
    /// 输出为每个类别的对数概率 `[batch, 10]`
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, NnError>;

    /// 由批内平均 loss 对输出的梯度反向传播，把梯度（及曲率）累加进各参数
    fn backward(&mut self, grad_output: &Tensor) -> Result<(), NnError>;

    /// 最近一次训练模式前向的输出（对数概率）
    fn last_output(&self) -> Option<&Tensor>;

    /// 输出对数概率沿参数方向的切向量（前向模式求导），工作点为最近一次训练前向；
    /// 形状与 [`Network::last_output`] 相同，未给出方向的参数视为不动
    fn output_tangent(&self, directions: &Directions) -> Result<Tensor, NnError>;

    fn parameters(&self) -> Vec<&Parameter>;

    fn parameters_mut(&mut self) -> Vec<&mut Parameter>;

    fn mode(&self) -> Mode;

    fn set_mode(&mut self, mode: Mode);

    /// 训练模式：dropout 生效，前向缓存反向所需数据
    fn train(&mut self) {
        let mode = self.mode();
        self.set_mode(Mode {
            training: true,
            ..mode
        });
    }

    /// 评估模式：dropout 为恒等映射，不缓存
    fn eval(&mut self) {
        let mode = self.mode();
        self.set_mode(Mode {
            training: false,
            ..mode
        });
    }

    fn is_training(&self) -> bool {
        self.mode().training
    }

    fn set_curvature_tracking(&mut self, enabled: bool) {
        let mode = self.mode();
        self.set_mode(Mode {
            track_curvature: enabled,
            ..mode
        });
    }

    fn zero_grad(&mut self) {
        for p in self.parameters_mut() {
            p.zero_grad();
        }
    }

    /// 可训练标量的总数
    fn num_params(&self) -> usize {
        self.parameters().iter().map(|p| p.numel()).sum()
    }
}
