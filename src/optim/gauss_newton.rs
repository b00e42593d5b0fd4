/*
 * @Date         : 2026-10-15
 * @Description  : 对角 Gauss-Newton（Levenberg-Marquardt 阻尼）优化器
 *
 * 曲率取模型反向时统计的对角经验 Fisher `F = (1/N) Σ gᵢ²`。
 * 梯度与曲率分别做 β1、β2 的滑动平均（带偏差修正），更新量为 `lr · m̂ / (ĉ + eps)`，
 * 其中 `eps` 是阻尼系数。
 */

use super::OptimError;
use super::base::{Optimizer, curvature_of, ensure_curvature, grad_of};
use super::ewma::Ewma;
use crate::nn::Network;

pub struct GaussNewton {
    learning_rate: f32,
    eps: f32,
    m: Ewma,
    c: Ewma,
    t: usize,
}

impl GaussNewton {
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, eps: f32) -> Self {
        Self {
            learning_rate,
            eps,
            m: Ewma::new(beta1),
            c: Ewma::new(beta2),
            t: 0,
        }
    }
}

impl Optimizer for GaussNewton {
    fn step(&mut self, model: &mut dyn Network) -> Result<(), OptimError> {
        ensure_curvature(&*model)?;
        self.t += 1;
        for param in model.parameters_mut() {
            let Some(grad) = grad_of(param) else {
                continue;
            };
            let curvature = curvature_of(param)?;
            let m_hat = self.m.update(param.name(), &grad, self.t);
            let c_hat = self.c.update(param.name(), &curvature, self.t);
            let direction = m_hat / (c_hat + self.eps);
            param.apply_update(&(direction * self.learning_rate));
        }
        Ok(())
    }

    fn needs_curvature(&self) -> bool {
        true
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f32) {
        self.learning_rate = lr;
    }

    fn reset(&mut self) {
        self.m.clear();
        self.c.clear();
        self.t = 0;
    }
}
