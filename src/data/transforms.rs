//! 像素预处理

use crate::tensor::Tensor;

/// 0-255 的像素值缩放到 [0, 1]
pub fn normalize_pixels(pixels: &Tensor) -> Tensor {
    pixels / 255.0
}

/// 逐元素 `(x - mean) / std`
pub fn standardize(tensor: &Tensor, mean: f32, std: f32) -> Tensor {
    let scale = std.recip();
    tensor.map(|x| (x - mean) * scale)
}
