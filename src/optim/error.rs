use thiserror::Error;

use crate::nn::NnError;

/// 参数更新过程中的错误
#[derive(Debug, Error, PartialEq)]
pub enum OptimError {
    /// 需要曲率的优化器遇到了没有曲率估计的参数
    #[error("参数 {0} 缺少曲率估计，需在前向传播前开启曲率跟踪")]
    MissingCurvature(String),

    /// Auto 系列优化器依赖最近一次训练前向的输出
    #[error("模型没有训练模式下的前向输出，无法估计二次模型")]
    MissingForward,

    #[error(transparent)]
    Nn(#[from] NnError),
}
