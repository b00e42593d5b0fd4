/*
 * @Date         : 2026-10-15
 * @Description  : 张量的原地四则运算（+=、-=、*=、/=），供优化器原地更新状态使用
 */

use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use std::ops::{AddAssign, DivAssign, MulAssign, SubAssign};

macro_rules! impl_assign_op {
    ($trait:ident, $method:ident, $op:tt, $operator:expr) => {
        impl $trait<&Tensor> for Tensor {
            fn $method(&mut self, other: &Tensor) {
                assert!(
                    self.is_same_shape(other),
                    "{}",
                    TensorError::OperatorError {
                        operator: $operator,
                        tensor1_shape: self.shape().to_vec(),
                        tensor2_shape: other.shape().to_vec(),
                    }
                );
                *self.array_mut() $op other.array();
            }
        }
        impl $trait<Tensor> for Tensor {
            fn $method(&mut self, other: Tensor) {
                *self $op &other;
            }
        }
        impl $trait<f32> for Tensor {
            fn $method(&mut self, scalar: f32) {
                *self.array_mut() $op scalar;
            }
        }
    };
}

impl_assign_op!(AddAssign, add_assign, +=, Operator::AddAssign);
impl_assign_op!(SubAssign, sub_assign, -=, Operator::SubAssign);
impl_assign_op!(MulAssign, mul_assign, *=, Operator::MulAssign);
impl_assign_op!(DivAssign, div_assign, /=, Operator::DivAssign);
