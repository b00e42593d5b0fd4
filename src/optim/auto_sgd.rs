/*
 * @Date         : 2026-10-15
 * @Description  : AutoSGD：以原始梯度为搜索方向，自动求步长与动量
 */

use super::OptimError;
use super::auto::{AutoStep, collect_directions};
use super::base::Optimizer;
use crate::nn::Network;

pub struct AutoSgd {
    auto: AutoStep,
}

impl AutoSgd {
    /// `eps` 为二次模型的阻尼
    pub fn new(ewma: f32, gamma0: f32, eps: f32) -> Self {
        Self {
            auto: AutoStep::new(f64::from(ewma), f64::from(gamma0), f64::from(eps)),
        }
    }

    pub const fn auto_step(&self) -> &AutoStep {
        &self.auto
    }
}

impl Optimizer for AutoSgd {
    fn step(&mut self, model: &mut dyn Network) -> Result<(), OptimError> {
        let directions = collect_directions(&*model, |_, grad| Ok(grad.clone()))?;
        self.auto.step(model, &directions)
    }

    fn needs_curvature(&self) -> bool {
        false
    }

    /// 当前的 γ0
    fn learning_rate(&self) -> f32 {
        self.auto.gammas().0 as f32
    }

    /// 重新设定 γ0，之后仍会逐步自动调整
    fn set_learning_rate(&mut self, lr: f32) {
        self.auto.set_gamma0(f64::from(lr));
    }

    fn reset(&mut self) {
        self.auto.reset();
    }
}
