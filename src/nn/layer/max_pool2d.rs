/*
 * @Date         : 2026-10-15
 * @Description  : 2D 最大池化层（窗口与步长相同）
 *
 * - 输入必须是 4D [batch, C, H, W]，输出 [batch, C, H / k, W / k]（向下取整）
 * - 记录最大值位置用于反向传播（稀疏梯度）
 */

use ndarray::Array4;

use super::{Directions, Layer, Mode, expect_rank, expect_same_shape};
use crate::nn::NnError;
use crate::tensor::Tensor;

struct MaxPoolCache {
    /// 每个输出位置对应的输入位置 (y, x)
    argmax: Array4<(usize, usize)>,
    input_shape: [usize; 4],
}

/// 2D 最大池化层
pub struct MaxPool2d {
    name: String,
    kernel_size: usize,
    cache: Option<MaxPoolCache>,
}

impl MaxPool2d {
    pub fn new(name: &str, kernel_size: usize) -> Self {
        Self {
            name: name.to_string(),
            kernel_size,
            cache: None,
        }
    }
}

impl Layer for MaxPool2d {
    fn forward(&mut self, input: &Tensor, mode: Mode) -> Result<Tensor, NnError> {
        expect_rank(&self.name, input, 4, "[batch, C, H, W]")?;
        let x = input.view4();
        let (n, c, h, w) = x.dim();
        let k = self.kernel_size;
        let (oh, ow) = (h / k, w / k);
        if oh == 0 || ow == 0 {
            return Err(NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: format!("[batch, C, ≥{k}, ≥{k}]"),
                got: input.shape().to_vec(),
            });
        }

        let mut output = Array4::<f32>::zeros((n, c, oh, ow));
        let mut argmax = Array4::<(usize, usize)>::from_elem((n, c, oh, ow), (0, 0));
        for b in 0..n {
            for ch in 0..c {
                for oy in 0..oh {
                    for ox in 0..ow {
                        let mut best = (oy * k, ox * k);
                        let mut best_v = f32::NEG_INFINITY;
                        for y in oy * k..(oy + 1) * k {
                            for xx in ox * k..(ox + 1) * k {
                                let v = x[[b, ch, y, xx]];
                                if v > best_v || v.is_nan() {
                                    best_v = v;
                                    best = (y, xx);
                                }
                            }
                        }
                        output[[b, ch, oy, ox]] = best_v;
                        argmax[[b, ch, oy, ox]] = best;
                    }
                }
            }
        }

        self.cache = mode.training.then_some(MaxPoolCache {
            argmax,
            input_shape: [n, c, h, w],
        });
        Ok(Tensor::from_array(output))
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NnError> {
        let cache = self
            .cache
            .as_ref()
            .ok_or_else(|| NnError::BackwardBeforeForward(self.name.clone()))?;
        if grad_output.shape() != cache.argmax.shape() {
            return Err(NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: format!("{:?}", cache.argmax.shape()),
                got: grad_output.shape().to_vec(),
            });
        }

        let [n, c, h, w] = cache.input_shape;
        let mut grad_input = Array4::<f32>::zeros((n, c, h, w));
        let g = grad_output.view4();
        for ((b, ch, oy, ox), &(y, x)) in cache.argmax.indexed_iter() {
            grad_input[[b, ch, y, x]] += g[[b, ch, oy, ox]];
        }
        Ok(Tensor::from_array(grad_input))
    }

    /// 在前向记录的最大值位置取切向量
    fn tangent(&self, input: Option<&Tensor>, _directions: &Directions) -> Result<Option<Tensor>, NnError> {
        let cache = self
            .cache
            .as_ref()
            .ok_or_else(|| NnError::TangentBeforeForward(self.name.clone()))?;
        let Some(t) = input else {
            return Ok(None);
        };
        expect_same_shape(&self.name, &cache.input_shape, t)?;
        let t = t.view4();
        let output = cache
            .argmax
            .indexed_iter()
            .map(|((b, ch, _, _), &(y, x))| t[[b, ch, y, x]])
            .collect::<Vec<_>>();
        Ok(Some(Tensor::from_vec(output, cache.argmax.shape())))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
