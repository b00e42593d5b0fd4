/*
 * @Date         : 2026-10-15
 * @Description  : Adam 优化器
 */

use super::base::{Optimizer, grad_of};
use super::ewma::Ewma;
use super::OptimError;
use crate::nn::Network;
use crate::tensor::Tensor;

/// Adam 的一阶、二阶矩估计，AutoAdam 也用它构造搜索方向
pub(crate) struct AdamMoments {
    /// 一阶矩估计
    m: Ewma,
    /// 二阶矩估计
    v: Ewma,
    epsilon: f32,
    /// 时间步
    t: usize,
}

impl AdamMoments {
    pub(crate) fn new(beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            m: Ewma::new(beta1),
            v: Ewma::new(beta2),
            epsilon,
            t: 0,
        }
    }

    /// 进入下一个时间步，每次 `step` 调用一次
    pub(crate) fn tick(&mut self) {
        self.t += 1;
    }

    /// 更新矩估计并返回 `m̂ / (√v̂ + ε)`
    pub(crate) fn direction(&mut self, name: &str, grad: &Tensor) -> Tensor {
        let m_hat = self.m.update(name, grad, self.t);
        let v_hat = self.v.update(name, &grad.square(), self.t);
        m_hat / (v_hat.sqrt() + self.epsilon)
    }

    pub(crate) fn reset(&mut self) {
        self.m.clear();
        self.v.clear();
        self.t = 0;
    }
}

/// Adam 优化器
pub struct Adam {
    learning_rate: f32,
    moments: AdamMoments,
}

impl Adam {
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            moments: AdamMoments::new(beta1, beta2, epsilon),
        }
    }

    /// 使用默认参数创建Adam优化器
    #[cfg(test)]
    pub(crate) fn new_default(learning_rate: f32) -> Self {
        Self::new(learning_rate, 0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn step(&mut self, model: &mut dyn Network) -> Result<(), OptimError> {
        self.moments.tick();
        for param in model.parameters_mut() {
            let Some(grad) = grad_of(param) else {
                continue;
            };
            // θ = θ - α · m̂ / (√v̂ + ε)
            let direction = self.moments.direction(param.name(), &grad);
            param.apply_update(&(direction * self.learning_rate));
        }
        Ok(())
    }

    fn needs_curvature(&self) -> bool {
        false
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f32) {
        self.learning_rate = lr;
    }

    fn reset(&mut self) {
        self.moments.reset();
    }
}
