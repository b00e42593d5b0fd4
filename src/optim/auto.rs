/*
 * @Date         : 2026-10-15
 * @Description  : Auto 系列优化器共用的步长/动量求解器
 *
 * 给定各参数张量的搜索方向 `u` 与上一步的步长 `d`，本步步长取 `s = γ0·u + γ1·d`
 * （θ ← θ - s），γ0、γ1 为全模型共用的两个标量。把 loss 在当前点展开为二次模型
 *
 *   L(θ - s) ≈ L(θ) - g·s + ½ sᵀ H s
 *
 * 其中 H 为当前批次 NLL 的 Gauss-Newton 矩阵加阻尼 eps·I。aᵀHb 不需要显式构造 H：
 * 由网络输出沿 a、b 的切向量（前向模式求导）即可得到。对 (γ0, γ1) 求极小，得到
 *
 *   γ0·uHu + γ1·uHd = g·u
 *   γ0·uHd + γ1·dHd = g·d
 *
 * 曲率项 uHu、uHd、dHd 做滑动平均，且 uHu、dHd 不低于本批次的值；一次项 g·u、g·d
 * 取当前梯度。方程组奇异或解出负动量时退化为只求 γ0 的一维问题；
 * 一维问题的曲率不为正（或解不为正）时沿用上一步的 γ。
 */

use tracing::debug;

use super::OptimError;
use crate::nn::{Directions, Network, Parameter, gauss_newton_inner};
use crate::tensor::Tensor;

/// γ1 的上限，保证动量项收缩
pub const MAX_MOMENTUM: f64 = 0.999;

/// 行列式相对 `uHu·dHd` 小于该值时视为奇异
const SINGULAR_TOLERANCE: f64 = 1e-10;

/// 二次模型的统计量
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QuadraticStats {
    pub u_h_u: f64,
    pub g_u: f64,
    /// 与上一步相关的统计量：(uHd, dHd, g·d)；第一步没有
    pub with_prev: Option<(f64, f64, f64)>,
}

pub struct AutoStep {
    ewma: f64,
    gamma0: f64,
    /// 二次模型的阻尼
    eps: f64,
    gamma: (f64, f64),
    /// 平滑后的统计量
    stats: Option<QuadraticStats>,
    prev_step: Directions,
}

fn smooth(old: f64, new: f64, beta: f64) -> f64 {
    beta * old + (1.0 - beta) * new
}

impl AutoStep {
    /// `ewma` 为曲率统计量的平滑系数，`gamma0` 为 γ0 的初值，`eps` 为阻尼
    pub fn new(ewma: f64, gamma0: f64, eps: f64) -> Self {
        Self {
            ewma,
            gamma0,
            eps,
            gamma: (gamma0, 0.0),
            stats: None,
            prev_step: Directions::new(),
        }
    }

    /// 沿 `directions` 求解本步 (γ0, γ1) 并更新模型参数
    ///
    /// 模型须刚完成一次训练模式的前向与反向：梯度取自各参数，
    /// 曲率由最近一次前向的输出及其切向量得到。没有方向的参数保持不动。
    pub fn step(&mut self, model: &mut dyn Network, directions: &Directions) -> Result<(), OptimError> {
        let current = self.observe(&*model, directions)?;
        let stats = self.smooth_stats(current);
        self.stats = Some(stats);
        self.gamma = solve(&stats, self.gamma);

        let (g0, g1) = self.gamma;
        let mut steps = Directions::new();
        for param in model.parameters_mut() {
            let Some(u) = directions.get(param.name()) else {
                continue;
            };
            let mut step = u * g0 as f32;
            if let Some(d) = self.prev_step.get(param.name()) {
                step += d * g1 as f32;
            }
            param.apply_update(&step);
            steps.insert(param.name().to_string(), step);
        }
        self.prev_step = steps;
        Ok(())
    }

    /// 本批次的统计量（未平滑）
    pub fn observe(&self, model: &dyn Network, directions: &Directions) -> Result<QuadraticStats, OptimError> {
        let log_probs = model.last_output().ok_or(OptimError::MissingForward)?;

        let mut g_u = 0.0;
        let mut g_d = 0.0;
        for param in model.parameters() {
            let Some(grad) = param.grad() else {
                continue;
            };
            if let Some(u) = directions.get(param.name()) {
                g_u += grad.dot(u);
            }
            if let Some(d) = self.prev_step.get(param.name()) {
                g_d += grad.dot(d);
            }
        }

        let ju = model.output_tangent(directions)?;
        let u_h_u = gauss_newton_inner(log_probs, &ju, &ju)? + self.eps * inner(directions, directions);

        let with_prev = if self.prev_step.is_empty() {
            None
        } else {
            let jd = model.output_tangent(&self.prev_step)?;
            let u_h_d = gauss_newton_inner(log_probs, &ju, &jd)? + self.eps * inner(directions, &self.prev_step);
            let d_h_d = gauss_newton_inner(log_probs, &jd, &jd)? + self.eps * inner(&self.prev_step, &self.prev_step);
            Some((u_h_d, d_h_d, g_d))
        };

        Ok(QuadraticStats {
            u_h_u,
            g_u,
            with_prev,
        })
    }

    /// 曲率项滑动平均，且 uHu、dHd 不低于本批次的值；一次项取当前值
    fn smooth_stats(&self, current: QuadraticStats) -> QuadraticStats {
        let beta = self.ewma;
        let Some(old) = self.stats else {
            return current;
        };
        QuadraticStats {
            u_h_u: smooth(old.u_h_u, current.u_h_u, beta).max(current.u_h_u),
            g_u: current.g_u,
            with_prev: match (old.with_prev, current.with_prev) {
                (Some((a, b, _)), Some((u_h_d, d_h_d, g_d))) => Some((
                    smooth(a, u_h_d, beta),
                    smooth(b, d_h_d, beta).max(d_h_d),
                    g_d,
                )),
                (_, new) => new,
            },
        }
    }

    /// 当前的 (γ0, γ1)
    pub const fn gammas(&self) -> (f64, f64) {
        self.gamma
    }

    /// 最近一次使用的（平滑后）统计量
    pub const fn stats(&self) -> Option<QuadraticStats> {
        self.stats
    }

    /// 重新设定 γ0，之后仍会逐步自动调整
    pub fn set_gamma0(&mut self, gamma0: f64) {
        self.gamma0 = gamma0;
        self.gamma.0 = gamma0;
    }

    pub fn reset(&mut self) {
        self.gamma = (self.gamma0, 0.0);
        self.stats = None;
        self.prev_step.clear();
    }
}

/// 两组同名张量的内积之和
fn inner(a: &Directions, b: &Directions) -> f64 {
    a.iter()
        .filter_map(|(name, x)| b.get(name).map(|y| x.dot(y)))
        .sum()
}

/// 由统计量求 (γ0, γ1)，失败时回退
pub fn solve(stats: &QuadraticStats, previous: (f64, f64)) -> (f64, f64) {
    if let Some((u_h_d, d_h_d, g_d)) = stats.with_prev {
        let det = stats.u_h_u * d_h_d - u_h_d * u_h_d;
        if det > SINGULAR_TOLERANCE * stats.u_h_u * d_h_d && det.is_finite() {
            let gamma0 = (stats.g_u * d_h_d - u_h_d * g_d) / det;
            let gamma1 = (stats.u_h_u * g_d - u_h_d * stats.g_u) / det;
            if gamma1 >= 0.0 && gamma0 > 0.0 && gamma0.is_finite() && gamma1.is_finite() {
                return (gamma0, gamma1.min(MAX_MOMENTUM));
            }
            debug!("二维解不可用 (γ0={gamma0:.3e}, γ1={gamma1:.3e})，退化为一维求解");
        } else {
            debug!("二次型奇异 (det={det:.3e})，退化为一维求解");
        }
    }

    if stats.u_h_u > 0.0 {
        let gamma0 = stats.g_u / stats.u_h_u;
        if gamma0 > 0.0 && gamma0.is_finite() {
            return (gamma0, 0.0);
        }
    }
    debug!(
        "曲率或方向不可用 (uHu={:.3e}, g·u={:.3e})，沿用上一步的 γ",
        stats.u_h_u, stats.g_u
    );
    previous
}

/// 由模型中各参数的梯度构造方向
pub(super) fn collect_directions(
    model: &dyn Network,
    mut direction: impl FnMut(&Parameter, &Tensor) -> Result<Tensor, OptimError>,
) -> Result<Directions, OptimError> {
    model
        .parameters()
        .into_iter()
        .filter_map(|p| p.grad().map(|g| (p, g)))
        .map(|(param, grad)| Ok((param.name().to_string(), direction(param, grad)?)))
        .collect()
}
