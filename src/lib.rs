//! # autoopt
//!
//! 用纯 rust 在 MNIST 上训练小型分类网络（全连接 `fc` 与卷积 `cnn`），
//! 比较 SGD、Adam、对角 Gauss-Newton，以及自动选择步长与动量的 Auto 系列优化器。
//!
//! 网络层自带前向与反向（无通用自动微分），训练时可额外统计逐样本梯度平方
//! 作为对角曲率，并支持沿参数方向的前向模式求导，供 Auto 系列构造二次模型。
//!

pub mod data;
pub mod errors;
pub mod nn;
pub mod optim;
pub mod tensor;
pub mod train;
