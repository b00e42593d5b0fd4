//! 数据加载错误类型定义

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    /// 本地既没有原始文件也没有 .gz 压缩包
    #[error("找不到数据文件 {0:?}，可开启下载选项自动获取")]
    Missing(PathBuf),

    #[error("读写数据失败: {0}")]
    Io(#[from] std::io::Error),

    /// IDX 头部或内容不合法
    #[error("{path:?} 不是合法的 IDX 文件: {reason}")]
    MalformedIdx { path: PathBuf, reason: String },

    #[error("样本下标 {index} 超出数据集大小 {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("特征有 {features} 个样本，标签却有 {labels} 个")]
    LengthMismatch { features: usize, labels: usize },

    #[error("无法获取 {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("{file} 的 MD5 为 {got}，与期望的 {expected} 不符")]
    ChecksumMismatch {
        file: String,
        expected: String,
        got: String,
    },
}
