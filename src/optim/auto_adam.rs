/*
 * @Date         : 2026-10-15
 * @Description  : AutoAdam：以 Adam 归一化后的一阶矩为搜索方向，自动求步长与动量
 */

use super::OptimError;
use super::adam::AdamMoments;
use super::auto::{AutoStep, collect_directions};
use super::base::Optimizer;
use crate::nn::Network;

pub struct AutoAdam {
    auto: AutoStep,
    moments: AdamMoments,
}

impl AutoAdam {
    /// `eps` 同时作为 Adam 分母的平滑项与二次模型的阻尼
    pub fn new(ewma: f32, gamma0: f32, beta1: f32, beta2: f32, eps: f32) -> Self {
        Self {
            auto: AutoStep::new(f64::from(ewma), f64::from(gamma0), f64::from(eps)),
            moments: AdamMoments::new(beta1, beta2, eps),
        }
    }

    pub const fn auto_step(&self) -> &AutoStep {
        &self.auto
    }
}

impl Optimizer for AutoAdam {
    fn step(&mut self, model: &mut dyn Network) -> Result<(), OptimError> {
        self.moments.tick();
        let moments = &mut self.moments;
        let directions = collect_directions(&*model, |param, grad| Ok(moments.direction(param.name(), grad)))?;
        self.auto.step(model, &directions)
    }

    fn needs_curvature(&self) -> bool {
        false
    }

    fn learning_rate(&self) -> f32 {
        self.auto.gammas().0 as f32
    }

    fn set_learning_rate(&mut self, lr: f32) {
        self.auto.set_gamma0(f64::from(lr));
    }

    fn reset(&mut self) {
        self.auto.reset();
        self.moments.reset();
    }
}
