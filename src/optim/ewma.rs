/*
 * @Date         : 2026-10-15
 * @Description  : 按参数名保存的指数加权滑动平均（零初始化 + 偏差修正）
 */

use std::collections::HashMap;

use crate::tensor::Tensor;

pub(crate) struct Ewma {
    beta: f32,
    values: HashMap<String, Tensor>,
}

impl Ewma {
    pub(crate) fn new(beta: f32) -> Self {
        Self {
            beta,
            values: HashMap::new(),
        }
    }

    /// `v = β·v + (1 - β)·x`，返回第`t`步（从1开始）偏差修正后的 `v / (1 - βᵗ)`
    pub(crate) fn update(&mut self, name: &str, x: &Tensor, t: usize) -> Tensor {
        let beta = self.beta;
        let v = self
            .values
            .entry(name.to_string())
            .or_insert_with(|| Tensor::zeros(x.shape()));
        *v *= beta;
        *v += x * (1.0 - beta);
        let correction = 1.0 - beta.powi(t as i32);
        if correction > 0.0 {
            &*v / correction
        } else {
            v.clone()
        }
    }

    pub(crate) fn clear(&mut self) {
        self.values.clear();
    }
}
