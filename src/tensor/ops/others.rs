use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use ndarray::Axis;

impl From<f32> for Tensor {
    /// 将`f32`转换为形状为`[1]`的张量
    fn from(scalar: f32) -> Self {
        Self::new(&[scalar], &[1])
    }
}

impl Tensor {
    /// 对每个元素应用`f`，返回新张量
    pub fn map(&self, f: impl FnMut(f32) -> f32) -> Self {
        Self::from_array(self.array().mapv(f))
    }

    pub fn sqrt(&self) -> Self {
        self.map(f32::sqrt)
    }

    pub fn square(&self) -> Self {
        self.map(|x| x * x)
    }

    /// 对张量中的所有元素求和，以纯数返回
    pub fn sum(&self) -> f32 {
        self.array().sum()
    }

    /// 所有元素的平均值；空张量返回0
    pub fn mean(&self) -> f32 {
        if self.size() == 0 {
            0.0
        } else {
            self.sum() / self.size() as f32
        }
    }

    /// 两个同形张量逐元素相乘后求和（即把张量视为向量时的内积）。
    /// 用`f64`累加，以免大张量上的舍入误差。
    pub fn dot(&self, other: &Self) -> f64 {
        assert!(
            self.is_same_shape(other),
            "{}",
            TensorError::OperatorError {
                operator: Operator::Dot,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: other.shape().to_vec(),
            }
        );
        self.iter()
            .zip(other.iter())
            .map(|(&a, &b)| f64::from(a) * f64::from(b))
            .sum()
    }

    /// 二维张量每一行最大值所在的列下标（并列时取第一个）
    pub fn argmax_rows(&self) -> Vec<usize> {
        self.view2()
            .axis_iter(Axis(0))
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |(best_i, best_v), (i, &v)| {
                        if v > best_v { (i, v) } else { (best_i, best_v) }
                    })
                    .0
            })
            .collect()
    }
}
