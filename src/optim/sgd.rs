/*
 * @Date         : 2026-10-15
 * @Description  : 带动量的 SGD，语义与 `torch.optim.SGD` 一致
 */

use std::collections::HashMap;

use super::base::{Optimizer, grad_of};
use super::OptimError;
use crate::nn::Network;
use crate::tensor::Tensor;

/// SGD (随机梯度下降) 优化器
///
/// 动量缓冲区在第一步直接取梯度，之后 `b = μ·b + (1 - dampening)·g`，`θ -= lr·b`。
/// `momentum` 为 0 时即普通梯度下降。
pub struct Sgd {
    learning_rate: f32,
    momentum: f32,
    dampening: f32,
    buffers: HashMap<String, Tensor>,
}

impl Sgd {
    pub fn new(learning_rate: f32, momentum: f32, dampening: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            dampening,
            buffers: HashMap::new(),
        }
    }

    pub const fn momentum(&self) -> f32 {
        self.momentum
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, model: &mut dyn Network) -> Result<(), OptimError> {
        for param in model.parameters_mut() {
            let Some(grad) = grad_of(param) else {
                continue;
            };
            let direction = if self.momentum == 0.0 {
                grad
            } else {
                match self.buffers.get_mut(param.name()) {
                    Some(buf) => {
                        *buf *= self.momentum;
                        *buf += grad * (1.0 - self.dampening);
                        buf.clone()
                    }
                    None => {
                        self.buffers.insert(param.name().to_string(), grad.clone());
                        grad
                    }
                }
            };
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
        self.buffers.clear();
    }
}
