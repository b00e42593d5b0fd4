/*
 * @Date         : 2026-10-15
 * @Description  : Dropout 与 Dropout2d（按通道整体置零），仅在训练模式生效
 *
 * 保留的元素按 1 / (1 - p) 放大，使期望不变；评估模式下为恒等映射。
 */

use ndarray::{Array4, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Directions, Layer, Mode, expect_rank};
use crate::nn::NnError;
use crate::tensor::Tensor;

fn keep_scale(p: f32) -> f32 {
    if p < 1.0 { 1.0 / (1.0 - p) } else { 0.0 }
}

/// 切向量与梯度一样乘以掩码；没有掩码时原样通过
fn masked_tangent(name: &str, mask: Option<&Tensor>, input: Option<&Tensor>) -> Result<Option<Tensor>, NnError> {
    match (mask, input) {
        (_, None) => Ok(None),
        (Some(mask), Some(t)) if mask.is_same_shape(t) => Ok(Some(t * mask)),
        (Some(mask), Some(t)) => Err(NnError::ShapeMismatch {
            layer: name.to_string(),
            expected: format!("{:?}", mask.shape()),
            got: t.shape().to_vec(),
        }),
        (None, Some(t)) => Ok(Some(t.clone())),
    }
}

/// 逐元素 Dropout
pub struct Dropout {
    name: String,
    p: f32,
    rng: StdRng,
    /// 训练前向使用的掩码（已含放大系数）；`None` 表示上次前向为恒等映射
    mask: Option<Tensor>,
}

impl Dropout {
    /// `p` 为置零概率，`rng` 仅用于派生本层的随机源
    pub fn new<R: Rng + ?Sized>(name: &str, p: f32, rng: &mut R) -> Self {
        Self {
            name: name.to_string(),
            p,
            rng: StdRng::seed_from_u64(rng.r#gen()),
            mask: None,
        }
    }
}

impl Layer for Dropout {
    fn forward(&mut self, input: &Tensor, mode: Mode) -> Result<Tensor, NnError> {
        if !mode.training || self.p <= 0.0 {
            self.mask = None;
            return Ok(input.clone());
        }
        let scale = keep_scale(self.p);
        let p = f64::from(self.p);
        let rng = &mut self.rng;
        let mask = input.map(|_| if rng.gen_bool(p.min(1.0)) { 0.0 } else { scale });
        let output = input * &mask;
        self.mask = Some(mask);
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NnError> {
        match &self.mask {
            Some(mask) if mask.is_same_shape(grad_output) => Ok(grad_output * mask),
            Some(mask) => Err(NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: format!("{:?}", mask.shape()),
                got: grad_output.shape().to_vec(),
            }),
            None => Ok(grad_output.clone()),
        }
    }

    fn tangent(&self, input: Option<&Tensor>, _directions: &Directions) -> Result<Option<Tensor>, NnError> {
        masked_tangent(&self.name, self.mask.as_ref(), input)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 按通道的 Dropout：对每个样本的每个通道整体保留或置零
pub struct Dropout2d {
    name: String,
    p: f32,
    rng: StdRng,
    mask: Option<Tensor>,
}

impl Dropout2d {
    pub fn new<R: Rng + ?Sized>(name: &str, p: f32, rng: &mut R) -> Self {
        Self {
            name: name.to_string(),
            p,
            rng: StdRng::seed_from_u64(rng.r#gen()),
            mask: None,
        }
    }
}

impl Layer for Dropout2d {
    fn forward(&mut self, input: &Tensor, mode: Mode) -> Result<Tensor, NnError> {
        expect_rank(&self.name, input, 4, "[batch, C, H, W]")?;
        if !mode.training || self.p <= 0.0 {
            self.mask = None;
            return Ok(input.clone());
        }
        let (n, c, h, w) = input.view4().dim();
        let scale = keep_scale(self.p);
        let p = f64::from(self.p).min(1.0);

        let mut mask = Array4::<f32>::zeros((n, c, h, w));
        for mut sample in mask.axis_iter_mut(Axis(0)) {
            for mut channel in sample.axis_iter_mut(Axis(0)) {
                if !self.rng.gen_bool(p) {
                    channel.fill(scale);
                }
            }
        }
        let mask = Tensor::from_array(mask);
        let output = input * &mask;
        self.mask = Some(mask);
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NnError> {
        match &self.mask {
            Some(mask) if mask.is_same_shape(grad_output) => Ok(grad_output * mask),
            Some(mask) => Err(NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: format!("{:?}", mask.shape()),
                got: grad_output.shape().to_vec(),
            }),
            None => Ok(grad_output.clone()),
        }
    }

    fn tangent(&self, input: Option<&Tensor>, _directions: &Directions) -> Result<Option<Tensor>, NnError> {
        masked_tangent(&self.name, self.mask.as_ref(), input)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
