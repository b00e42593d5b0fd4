/*
 * @Date         : 2026-10-15
 * @Description  : Linear (全连接) 层 - PyTorch 风格
 *
 * 输入/输出形状：
 * - 输入：[batch_size, in_features]
 * - 输出：[batch_size, out_features]
 *
 * 计算：output = x @ W^T + b，W 形状为 [out_features, in_features]
 */

use ndarray::{Array2, Axis, Ix1};
use rand::Rng;

use super::{Directions, Layer, Mode, accumulate, expect_rank, expect_same_shape, fan_in_uniform};
use crate::nn::{NnError, Parameter};
use crate::tensor::Tensor;

/// 前向时缓存的数据
struct LinearCache {
    /// 本层输入激活（A_prev），[batch, in]
    input: Tensor,
    track_curvature: bool,
}

/// Linear (全连接) 层
///
/// 开启曲率跟踪时，利用缓存的输入 `a` 与输出梯度 `δ` 直接得到逐样本梯度平方之和：
/// 权重为 `(δ²)ᵀ (a²)`，偏置为 `Σ δ²`，无需逐样本展开。
pub struct Linear {
    name: String,
    weight: Parameter,
    bias: Parameter,
    in_features: usize,
    out_features: usize,
    cache: Option<LinearCache>,
}

impl Linear {
    pub fn new<R: Rng + ?Sized>(
        name: &str,
        in_features: usize,
        out_features: usize,
        rng: &mut R,
    ) -> Self {
        let weight = fan_in_uniform(in_features, &[out_features, in_features], rng);
        let bias = fan_in_uniform(in_features, &[out_features], rng);
        Self {
            name: name.to_string(),
            weight: Parameter::new(format!("{name}.weight"), weight),
            bias: Parameter::new(format!("{name}.bias"), bias),
            in_features,
            out_features,
            cache: None,
        }
    }

    pub const fn in_features(&self) -> usize {
        self.in_features
    }

    pub const fn out_features(&self) -> usize {
        self.out_features
    }

    pub const fn weight(&self) -> &Parameter {
        &self.weight
    }

    pub const fn bias(&self) -> &Parameter {
        &self.bias
    }

    #[cfg(test)]
    pub(crate) const fn weight_mut(&mut self) -> &mut Parameter {
        &mut self.weight
    }

    #[cfg(test)]
    pub(crate) const fn bias_mut(&mut self) -> &mut Parameter {
        &mut self.bias
    }

    /// 最近一次训练前向缓存的输入激活
    #[cfg(test)]
    pub(crate) fn input_activation(&self) -> Option<&Tensor> {
        self.cache.as_ref().map(|c| &c.input)
    }
}

impl Layer for Linear {
    fn forward(&mut self, input: &Tensor, mode: Mode) -> Result<Tensor, NnError> {
        expect_rank(&self.name, input, 2, "[batch, in_features]")?;
        if input.shape()[1] != self.in_features {
            return Err(NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: format!("[batch, {}]", self.in_features),
                got: input.shape().to_vec(),
            });
        }

        let w = self.weight.value().view2();
        let b = self
            .bias
            .value()
            .view()
            .into_dimensionality::<Ix1>()
            .map_err(|_| NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: format!("[{}]", self.out_features),
                got: self.bias.shape().to_vec(),
            })?;
        let output = input.view2().dot(&w.t()) + &b;

        self.cache = mode.training.then(|| LinearCache {
            input: input.clone(),
            track_curvature: mode.track_curvature,
        });
        Ok(Tensor::from_array(output))
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NnError> {
        let cache = self
            .cache
            .as_ref()
            .ok_or_else(|| NnError::BackwardBeforeForward(self.name.clone()))?;
        let x = cache.input.view2();
        let g = grad_output.view2();
        if g.nrows() != x.nrows() || g.ncols() != self.out_features {
            return Err(NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: format!("[{}, {}]", x.nrows(), self.out_features),
                got: grad_output.shape().to_vec(),
            });
        }

        let grad_w = g.t().dot(&x);
        let grad_b = g.sum_axis(Axis(0));
        let grad_input = g.dot(&self.weight.value().view2());

        if cache.track_curvature {
            // F = N · Σᵢ cᵢ²，cᵢ 为样本 i 对平均梯度的贡献
            let n = x.nrows() as f32;
            let g_sq = g.mapv(|v| v * v);
            let x_sq = x.mapv(|v| v * v);
            let curv_w = g_sq.t().dot(&x_sq) * n;
            let curv_b = g_sq.sum_axis(Axis(0)) * n;
            self.weight.accumulate_curvature(Tensor::from_array(curv_w));
            self.bias.accumulate_curvature(Tensor::from_array(curv_b));
        }

        self.weight.accumulate_grad(Tensor::from_array(grad_w));
        self.bias.accumulate_grad(Tensor::from_array(grad_b));
        Ok(Tensor::from_array(grad_input))
    }

    /// `t·Wᵀ + x·U_wᵀ + u_b`，x 为缓存的输入
    fn tangent(&self, input: Option<&Tensor>, directions: &Directions) -> Result<Option<Tensor>, NnError> {
        let cache = self
            .cache
            .as_ref()
            .ok_or_else(|| NnError::TangentBeforeForward(self.name.clone()))?;
        let x = cache.input.view2();
        let mut out = None;

        if let Some(t) = input {
            expect_same_shape(&self.name, cache.input.shape(), t)?;
            let term = t.view2().dot(&self.weight.value().view2().t());
            accumulate(&mut out, Tensor::from_array(term));
        }
        if let Some(u) = directions.get(self.weight.name()) {
            expect_same_shape(&self.name, self.weight.shape(), u)?;
            accumulate(&mut out, Tensor::from_array(x.dot(&u.view2().t())));
        }
        if let Some(u) = directions.get(self.bias.name()) {
            expect_same_shape(&self.name, self.bias.shape(), u)?;
            let row = u.reshape(&[1, self.out_features]);
            let term = Array2::<f32>::zeros((x.nrows(), self.out_features)) + &row.view2();
            accumulate(&mut out, Tensor::from_array(term));
        }
        Ok(out)
    }

    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.weight, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.weight, &mut self.bias]
    }

    fn name(&self) -> &str {
        &self.name
    }
}
