/*
 * @Date         : 2026-10-15
 * @Description  : 负责神经网络（neural network）的构建：参数、层、损失与示例模型
 *
 * 不做通用的自动微分：每个层自行实现前向与反向，并在前向时缓存反向所需的数据
 * （输入激活 A_prev、池化位置、dropout 掩码等）。
 */

pub mod criterion;
mod error;
pub mod layer;
pub mod models;
mod network;
mod parameter;

pub use criterion::{Reduction, gauss_newton_inner, nll_loss, nll_loss_backward};
pub use error::NnError;
pub use layer::{Directions, Layer, Mode};
pub use models::{Cnn, FcNet, ModelKind};
pub use network::{Model, Network};
pub use parameter::Parameter;

#[cfg(test)]
mod tests;
