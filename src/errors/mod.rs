/*
 * @Date         : 2026-10-15
 * @Description  : 张量错误与顶层错误类型
 */

use std::fmt;

use thiserror::Error;

use crate::data::DataError;
use crate::nn::NnError;
use crate::optim::OptimError;

/// 会检查形状的张量运算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    AddAssign,
    Sub,
    SubAssign,
    Mul,
    MulAssign,
    Div,
    DivAssign,
    Dot,
}

impl Operator {
    /// 对应的非原地运算
    const fn base(self) -> Self {
        match self {
            Self::AddAssign => Self::Add,
            Self::SubAssign => Self::Sub,
            Self::MulAssign => Self::Mul,
            Self::DivAssign => Self::Div,
            other => other,
        }
    }

    const fn is_assign(self) -> bool {
        matches!(
            self,
            Self::AddAssign | Self::SubAssign | Self::MulAssign | Self::DivAssign
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.base() {
            Self::Add => "相加",
            Self::Sub => "相减",
            Self::Mul => "相乘",
            Self::Div => "相除",
            _ => "求内积",
        };
        if self.is_assign() {
            write!(f, "原地{verb}")
        } else {
            f.write_str(verb)
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TensorError {
    // 张量二元运算
    #[error(
        "形状不一致，故无法{operator}：第一个张量的形状为{tensor1_shape:?}，第二个张量的形状为{tensor2_shape:?}"
    )]
    OperatorError {
        operator: Operator,
        tensor1_shape: Vec<usize>,
        tensor2_shape: Vec<usize>,
    },

    #[error("数据长度{len}与形状{shape:?}不匹配")]
    DataShapeMismatch { len: usize, shape: Vec<usize> },
    #[error("张量形状不兼容")]
    IncompatibleShape,
    #[error("该运算要求{expected}维张量，实际为{got}维")]
    DimensionMismatch { expected: usize, got: usize },
}

/// 训练程序的顶层错误
///
/// 模型/优化器名称无法识别、训练中 loss 非有限值，以及各子模块错误都汇总到这里。
#[derive(Error, Debug)]
pub enum AutoOptError {
    #[error("未知的模型类型: {0}")]
    UnknownModel(String),

    #[error("未知的优化器: {0}")]
    UnknownOptimizer(String),

    #[error("第{epoch}轮第{batch}个批次的 loss 不是有限值（{loss}），训练终止")]
    NonFiniteLoss { epoch: usize, batch: usize, loss: f32 },

    #[error("配置无效: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Nn(#[from] NnError),

    #[error(transparent)]
    Optim(#[from] OptimError),
}
