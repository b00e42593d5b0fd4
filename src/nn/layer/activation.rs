/*
 * @Date         : 2026-10-15
 * @Description  : 无参数的激活层：ReLU 与 LogSoftmax
 */

use ndarray::{Array2, Axis};

use super::{Directions, Layer, Mode, expect_rank, expect_same_shape};
use crate::nn::NnError;
use crate::tensor::Tensor;

/// ReLU：max(0, x)，NaN 原样传递
pub struct Relu {
    name: String,
    /// 前向时 x > 0 或 x 为 NaN 的位置
    mask: Option<Tensor>,
}

impl Relu {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mask: None,
        }
    }
}

/// `f32::max(NaN, 0.0)` 为 0，会吞掉发散的激活
fn passes(x: f32) -> bool {
    x > 0.0 || x.is_nan()
}

impl Layer for Relu {
    fn forward(&mut self, input: &Tensor, mode: Mode) -> Result<Tensor, NnError> {
        self.mask = mode
            .training
            .then(|| input.map(|x| if passes(x) { 1.0 } else { 0.0 }));
        Ok(input.map(|x| if passes(x) { x } else { 0.0 }))
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NnError> {
        let mask = self
            .mask
            .as_ref()
            .ok_or_else(|| NnError::BackwardBeforeForward(self.name.clone()))?;
        if !mask.is_same_shape(grad_output) {
            return Err(NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: format!("{:?}", mask.shape()),
                got: grad_output.shape().to_vec(),
            });
        }
        Ok(grad_output * mask)
    }

    fn tangent(&self, input: Option<&Tensor>, _directions: &Directions) -> Result<Option<Tensor>, NnError> {
        let mask = self
            .mask
            .as_ref()
            .ok_or_else(|| NnError::TangentBeforeForward(self.name.clone()))?;
        input
            .map(|t| -> Result<Tensor, NnError> {
                expect_same_shape(&self.name, mask.shape(), t)?;
                Ok(t * mask)
            })
            .transpose()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 沿类别维计算 log-softmax：x - log Σ exp(x)
pub struct LogSoftmax {
    name: String,
    /// 前向输出（对数概率），反向时用其 exp 作为 softmax
    output: Option<Tensor>,
}

impl LogSoftmax {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            output: None,
        }
    }
}

/// 数值稳定的逐行 log-softmax
pub fn log_softmax(input: &Tensor) -> Tensor {
    let x = input.view2();
    let mut out = Array2::<f32>::zeros(x.raw_dim());
    for (mut out_row, row) in out.axis_iter_mut(Axis(0)).zip(x.axis_iter(Axis(0))) {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        let log_sum = row.iter().map(|&v| (v - max).exp()).sum::<f32>().ln();
        out_row.assign(&row.mapv(|v| (v - max) - log_sum));
    }
    Tensor::from_array(out)
}

impl Layer for LogSoftmax {
    fn forward(&mut self, input: &Tensor, mode: Mode) -> Result<Tensor, NnError> {
        expect_rank(&self.name, input, 2, "[batch, classes]")?;
        let output = log_softmax(input);
        self.output = mode.training.then(|| output.clone());
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NnError> {
        let output = self
            .output
            .as_ref()
            .ok_or_else(|| NnError::BackwardBeforeForward(self.name.clone()))?;
        if !output.is_same_shape(grad_output) {
            return Err(NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: format!("{:?}", output.shape()),
                got: grad_output.shape().to_vec(),
            });
        }
        // dx = g - softmax · Σ g
        let g = grad_output.view2();
        let softmax = output.view2().mapv(f32::exp);
        let row_sums = g.sum_axis(Axis(1)).insert_axis(Axis(1));
        let grad_input = &g - &(softmax * &row_sums);
        Ok(Tensor::from_array(grad_input))
    }

    /// dy = t - Σ softmax · t（逐行）
    fn tangent(&self, input: Option<&Tensor>, _directions: &Directions) -> Result<Option<Tensor>, NnError> {
        let output = self
            .output
            .as_ref()
            .ok_or_else(|| NnError::TangentBeforeForward(self.name.clone()))?;
        let Some(t) = input else {
            return Ok(None);
        };
        expect_same_shape(&self.name, output.shape(), t)?;
        let t = t.view2();
        let softmax = output.view2().mapv(f32::exp);
        let row_sums = (&softmax * &t).sum_axis(Axis(1)).insert_axis(Axis(1));
        Ok(Some(Tensor::from_array(&t - &row_sums)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
