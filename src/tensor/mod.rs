/*
 * @Date         : 2026-10-15
 * @Description  : 基于 ndarray 的 f32 张量，供网络层、损失与优化器共用
 */

use ndarray::{Array, ArrayD, ArrayView2, ArrayView4, Ix2, Ix4, IxDyn};
use rand::Rng;
use rand::distributions::{Distribution, Uniform};

use crate::errors::TensorError;

mod ops {
    pub mod arith;
    pub mod assign;
    pub mod others;
}

mod index;
mod property;
mod shape;

#[cfg(test)]
mod tests;

/// 定义张量的结构体。其可以是标量、向量、矩阵或更高维度的数组。
/// 注：内部数据始终保持标准（行优先、连续）内存布局。
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: ArrayD<f32>,
}

impl Tensor {
    /// 创建一个张量。
    /// 若为标量，`shape`可以是[]、[1]、[1,1]...；若为向量，`shape`可以是[n]、[1,n]、[n,1]；
    /// 若为矩阵，`shape`可以是[n,m]；若为更高维度的数组，`shape`可以是[c,n,m,...]。
    /// 注：`data`的长度必须和`shape`中所有元素的乘积相等，否则会panic。
    pub fn new(data: &[f32], shape: &[usize]) -> Self {
        let expected: usize = shape.iter().product();
        assert!(
            data.len() == expected,
            "{}",
            TensorError::DataShapeMismatch {
                len: data.len(),
                shape: shape.to_vec(),
            }
        );
        Self::from_vec(data.to_vec(), shape)
    }

    /// 与`new`相同，但直接接管`Vec`，避免一次拷贝
    pub fn from_vec(data: Vec<f32>, shape: &[usize]) -> Self {
        let len = data.len();
        let data = Array::from_shape_vec(IxDyn(shape), data).unwrap_or_else(|_| {
            panic!(
                "{}",
                TensorError::DataShapeMismatch {
                    len,
                    shape: shape.to_vec(),
                }
            )
        });
        Self { data }
    }

    /// 创建一个全零张量
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::zeros(IxDyn(shape)),
        }
    }

    /// 创建一个所有元素均为`value`的张量
    pub fn full(value: f32, shape: &[usize]) -> Self {
        Self {
            data: ArrayD::from_elem(IxDyn(shape), value),
        }
    }

    /// 创建一个随机张量，其值服从[min, max)上的均匀分布。
    /// 随机源由调用方提供，以便在给定种子时结果可复现。
    pub fn new_uniform<R: Rng + ?Sized>(min: f32, max: f32, shape: &[usize], rng: &mut R) -> Self {
        let size = shape.iter().product::<usize>();
        let data = if min < max {
            let dist = Uniform::new(min, max);
            (0..size).map(|_| dist.sample(rng)).collect()
        } else {
            vec![min; size]
        };
        Self::from_vec(data, shape)
    }
}

// crate 内部与 ndarray 互转
impl Tensor {
    pub(crate) fn from_array<D: ndarray::Dimension>(array: Array<f32, D>) -> Self {
        let data = array.into_dyn();
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        Self { data }
    }

    pub(crate) const fn array(&self) -> &ArrayD<f32> {
        &self.data
    }

    pub(crate) fn array_mut(&mut self) -> &mut ArrayD<f32> {
        &mut self.data
    }

    /// 以二维视图访问，维数不为2时panic
    pub(crate) fn view2(&self) -> ArrayView2<'_, f32> {
        self.data
            .view()
            .into_dimensionality::<Ix2>()
            .unwrap_or_else(|_| {
                panic!(
                    "{}",
                    TensorError::DimensionMismatch {
                        expected: 2,
                        got: self.dimension(),
                    }
                )
            })
    }

    /// 以四维视图访问，维数不为4时panic
    pub(crate) fn view4(&self) -> ArrayView4<'_, f32> {
        self.data
            .view()
            .into_dimensionality::<Ix4>()
            .unwrap_or_else(|_| {
                panic!(
                    "{}",
                    TensorError::DimensionMismatch {
                        expected: 4,
                        got: self.dimension(),
                    }
                )
            })
    }
}
