use thiserror::Error;

/// 网络前向/反向及损失计算中的错误
#[derive(Debug, Error, PartialEq)]
pub enum NnError {
    /// 输入形状与层的要求不符
    #[error("{layer}: 输入形状不符，期望 {expected}，实际 {got:?}")]
    ShapeMismatch {
        layer: String,
        expected: String,
        got: Vec<usize>,
    },

    /// 在训练模式的前向之前调用了反向
    #[error("{0}: 反向传播前需先在训练模式下执行前向传播")]
    BackwardBeforeForward(String),

    /// 前向模式求导依赖训练前向的缓存
    #[error("{0}: 计算切向量前需先在训练模式下执行前向传播")]
    TangentBeforeForward(String),

    /// 标签不是合法的类别索引
    #[error("标签 {label} 不是 0..{num_classes} 范围内的类别索引")]
    InvalidLabel { label: f32, num_classes: usize },

    /// 输出与标签的样本数不一致
    #[error("样本数不一致: 输出 {output} 个, 标签 {labels} 个")]
    BatchMismatch { output: usize, labels: usize },
}
