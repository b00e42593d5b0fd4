/*
 * @Date         : 2026-10-15
 * @Description  : 优化器模块：SGD、Adam、对角 Gauss-Newton，以及自动选择步长与动量的 Auto 系列
 */

mod adam;
mod auto;
mod auto_adam;
mod auto_gauss_newton;
mod auto_sgd;
mod base;
mod error;
mod ewma;
mod gauss_newton;
mod kind;
mod sgd;

pub use adam::Adam;
pub use auto::{AutoStep, MAX_MOMENTUM, QuadraticStats, solve};
pub use auto_adam::AutoAdam;
pub use auto_gauss_newton::AutoGaussNewton;
pub use auto_sgd::AutoSgd;
pub use base::Optimizer;
pub use error::OptimError;
pub use gauss_newton::GaussNewton;
pub use kind::{AnyOptimizer, OptimizerKind};
pub use sgd::Sgd;

#[cfg(test)]
mod tests;
