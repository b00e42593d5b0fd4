/*
 * @Date         : 2026-10-15
 * @Description  : AutoGaussNewton：以对角 Gauss-Newton 方向 g / (ĉ + eps) 为搜索方向，自动求步长与动量
 */

use super::OptimError;
use super::auto::{AutoStep, collect_directions};
use super::base::{Optimizer, curvature_of, ensure_curvature};
use super::ewma::Ewma;
use crate::nn::Network;

pub struct AutoGaussNewton {
    auto: AutoStep,
    /// 对角曲率的滑动平均（β2）
    c: Ewma,
    eps: f32,
    t: usize,
}

impl AutoGaussNewton {
    pub fn new(ewma: f32, gamma0: f32, beta2: f32, eps: f32) -> Self {
        Self {
            auto: AutoStep::new(f64::from(ewma), f64::from(gamma0), f64::from(eps)),
            c: Ewma::new(beta2),
            eps,
            t: 0,
        }
    }

    pub const fn auto_step(&self) -> &AutoStep {
        &self.auto
    }
}

impl Optimizer for AutoGaussNewton {
    fn step(&mut self, model: &mut dyn Network) -> Result<(), OptimError> {
        ensure_curvature(&*model)?;
        self.t += 1;
        let (c, eps, t) = (&mut self.c, self.eps, self.t);
        let directions = collect_directions(&*model, |param, grad| {
            let c_hat = c.update(param.name(), &curvature_of(param)?, t);
            Ok(grad / &(c_hat + eps))
        })?;
        self.auto.step(model, &directions)
    }

    fn needs_curvature(&self) -> bool {
        true
    }

    fn learning_rate(&self) -> f32 {
        self.auto.gammas().0 as f32
    }

    fn set_learning_rate(&mut self, lr: f32) {
        self.auto.set_gamma0(f64::from(lr));
    }

    fn reset(&mut self) {
        self.auto.reset();
        self.c.clear();
        self.t = 0;
    }
}
