/*
 * @Date         : 2026-10-15
 * @Description  : 优化器核心 trait
 */

use enum_dispatch::enum_dispatch;

use super::OptimError;
use super::kind::AnyOptimizer;
use crate::nn::{Network, Parameter};
use crate::tensor::Tensor;

#[enum_dispatch(AnyOptimizer)]
pub trait Optimizer {
    /// 清空模型中所有参数的梯度与曲率
    fn zero_grad(&self, model: &mut dyn Network) {
        model.zero_grad();
    }

    /// 参数更新（使用已计算的梯度）
    ///
    /// ```ignore
    /// optimizer.zero_grad(&mut model);
    /// let output = model.forward(&images)?;
    /// model.backward(&nll_loss_backward(&output, &labels)?)?;
    /// optimizer.step(&mut model)?; // ← 只更新参数，不做 forward/backward
    /// ```
    ///
    /// 没有梯度的参数会被跳过。
    fn step(&mut self, model: &mut dyn Network) -> Result<(), OptimError>;

    /// 是否需要模型在反向传播时统计曲率（逐样本梯度平方）
    fn needs_curvature(&self) -> bool;

    fn learning_rate(&self) -> f32;

    fn set_learning_rate(&mut self, lr: f32);

    /// 重置累积状态
    fn reset(&mut self);
}

/// 取出参数的梯度副本；没有梯度时返回 `None`
pub(super) fn grad_of(param: &Parameter) -> Option<Tensor> {
    param.grad().cloned()
}

/// 有梯度的参数都须带曲率；在修改任何状态之前调用
pub(super) fn ensure_curvature(model: &dyn Network) -> Result<(), OptimError> {
    match model
        .parameters()
        .into_iter()
        .find(|p| p.grad().is_some() && p.curvature().is_none())
    {
        Some(param) => Err(OptimError::MissingCurvature(param.name().to_string())),
        None => Ok(()),
    }
}

/// 取出参数的曲率副本；需要曲率而缺失时报错
pub(super) fn curvature_of(param: &Parameter) -> Result<Tensor, OptimError> {
    param
        .curvature()
        .cloned()
        .ok_or_else(|| OptimError::MissingCurvature(param.name().to_string()))
}
