/*
 * @Date         : 2026-10-15
 * @Description  : 可训练参数：数值 + 梯度 + 曲率（对角 Gauss-Newton）估计
 */

use crate::tensor::Tensor;

/// 可训练参数
///
/// - `grad`：批内平均 loss 对该参数的梯度，反向传播时累加
/// - `curvature`：开启曲率跟踪时，逐样本梯度平方的批内平均 `(1/N) Σ gᵢ²`，
///   即对角经验 Fisher / Gauss-Newton 近似；同样累加
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    value: Tensor,
    grad: Option<Tensor>,
    curvature: Option<Tensor>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: Tensor) -> Self {
        Self {
            name: name.into(),
            value,
            grad: None,
            curvature: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn value(&self) -> &Tensor {
        &self.value
    }

    pub fn shape(&self) -> &[usize] {
        self.value.shape()
    }

    /// 参数中标量的个数
    pub fn numel(&self) -> usize {
        self.value.size()
    }

    pub const fn grad(&self) -> Option<&Tensor> {
        self.grad.as_ref()
    }

    pub const fn curvature(&self) -> Option<&Tensor> {
        self.curvature.as_ref()
    }

    /// 直接设置参数值（形状须一致）
    pub fn set_value(&mut self, value: Tensor) {
        assert!(
            value.is_same_shape(&self.value),
            "参数 {} 的形状须为 {:?}，实际为 {:?}",
            self.name,
            self.value.shape(),
            value.shape()
        );
        self.value = value;
    }

    /// θ = θ - delta
    pub fn apply_update(&mut self, delta: &Tensor) {
        self.value -= delta;
    }

    pub fn accumulate_grad(&mut self, grad: Tensor) {
        match &mut self.grad {
            Some(g) => *g += &grad,
            None => self.grad = Some(grad),
        }
    }

    pub fn accumulate_curvature(&mut self, curvature: Tensor) {
        match &mut self.curvature {
            Some(c) => *c += &curvature,
            None => self.curvature = Some(curvature),
        }
    }

    /// 清空梯度与曲率
    pub fn zero_grad(&mut self) {
        self.grad = None;
        self.curvature = None;
    }
}
