/*
 * @Date         : 2026-10-15
 * @Description  : 展平层：[batch, ...] → [batch, features]，即 PyTorch 的 `x.view(-1, features)`
 */

use super::{Directions, Layer, Mode};
use crate::nn::NnError;
use crate::tensor::Tensor;

pub struct Flatten {
    name: String,
    features: usize,
    input_shape: Option<Vec<usize>>,
}

impl Flatten {
    /// `features` 为每个样本展平后的长度；输入元素总数须是它的整数倍
    pub fn new(name: &str, features: usize) -> Self {
        Self {
            name: name.to_string(),
            features,
            input_shape: None,
        }
    }
}

impl Layer for Flatten {
    fn forward(&mut self, input: &Tensor, mode: Mode) -> Result<Tensor, NnError> {
        if self.features == 0 || input.size() % self.features != 0 {
            return Err(NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: format!("元素数为 {} 的整数倍", self.features),
                got: input.shape().to_vec(),
            });
        }
        self.input_shape = mode.training.then(|| input.shape().to_vec());
        Ok(input.reshape(&[input.size() / self.features, self.features]))
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NnError> {
        let shape = self
            .input_shape
            .as_ref()
            .ok_or_else(|| NnError::BackwardBeforeForward(self.name.clone()))?;
        if grad_output.size() != shape.iter().product::<usize>() {
            return Err(NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: format!("{shape:?}"),
                got: grad_output.shape().to_vec(),
            });
        }
        Ok(grad_output.reshape(shape))
    }

    fn tangent(&self, input: Option<&Tensor>, _directions: &Directions) -> Result<Option<Tensor>, NnError> {
        let shape = self
            .input_shape
            .as_ref()
            .ok_or_else(|| NnError::TangentBeforeForward(self.name.clone()))?;
        let Some(t) = input else {
            return Ok(None);
        };
        if t.shape() != shape.as_slice() {
            return Err(NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: format!("{shape:?}"),
                got: t.shape().to_vec(),
            });
        }
        Ok(Some(t.reshape(&[t.size() / self.features, self.features])))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
