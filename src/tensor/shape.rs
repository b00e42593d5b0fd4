use ndarray::{Axis, IxDyn};

use super::Tensor;
use crate::errors::TensorError;

impl Tensor {
    /// 按行优先顺序重排为新形状，元素总数须不变
    pub fn reshape(&self, shape: &[usize]) -> Self {
        let reshaped = (self.size() == shape.iter().product::<usize>())
            .then(|| self.data.clone().into_shape(IxDyn(shape)).ok())
            .flatten();
        match reshaped {
            Some(data) => Self::from_array(data),
            None => panic!("{}", TensorError::IncompatibleShape),
        }
    }

    /// 沿第 0 维按下标取样本，下标可重复、可乱序
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self::from_array(self.data.select(Axis(0), indices))
    }

    /// 二维转置，结果为标准布局
    pub fn transpose(&self) -> Self {
        Self::from_array(self.view2().reversed_axes().to_owned())
    }
}
