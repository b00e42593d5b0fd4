//! 内置数据集
//!
//! - MNIST：手写数字分类

mod mnist;

pub use mnist::{MNIST_MEAN, MNIST_STD, MnistDataset, parse_idx_images, parse_idx_labels};
