mod basic;

use crate::nn::{Directions, Mode, Network, NnError, Parameter};
use crate::tensor::Tensor;

/// 只含一个参数 `w` 的玩具模型，梯度与曲率由测试直接写入
///
/// 输出的切向量就是 `w` 的方向本身，输出取 `ln h`，
/// 于是 Auto 系列看到的二次型为 `aᵀHb = Σ h·a·b`。
pub(super) struct Toy {
    params: Vec<Parameter>,
    log_probs: Option<Tensor>,
}

impl Toy {
    pub(super) fn new(values: &[f32]) -> Self {
        Self::with_hessian(values, &vec![1.0; values.len()])
    }

    pub(super) fn with_hessian(values: &[f32], hessian: &[f32]) -> Self {
        let mut toy = Self {
            params: vec![Parameter::new("w", Tensor::new(values, &[values.len()]))],
            log_probs: None,
        };
        toy.set_hessian(hessian);
        toy
    }

    pub(super) fn set_hessian(&mut self, hessian: &[f32]) {
        self.log_probs = Some(Tensor::new(hessian, &[1, hessian.len()]).map(f32::ln));
    }

    /// 模拟没有做过训练前向
    pub(super) fn clear_output(&mut self) {
        self.log_probs = None;
    }

    pub(super) fn set_grad(&mut self, grad: &[f32], curvature: Option<&[f32]>) {
        let p = &mut self.params[0];
        p.zero_grad();
        p.accumulate_grad(Tensor::new(grad, &[grad.len()]));
        if let Some(c) = curvature {
            p.accumulate_curvature(Tensor::new(c, &[c.len()]));
        }
    }

    pub(super) fn value(&self) -> Vec<f32> {
        self.params[0].value().to_vec()
    }
}

impl Network for Toy {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, NnError> {
        Ok(input.clone())
    }

    fn backward(&mut self, _grad_output: &Tensor) -> Result<(), NnError> {
        Ok(())
    }

    fn last_output(&self) -> Option<&Tensor> {
        self.log_probs.as_ref()
    }

    fn output_tangent(&self, directions: &Directions) -> Result<Tensor, NnError> {
        let n = self.params[0].numel();
        Ok(directions
            .get("w")
            .map(|u| u.reshape(&[1, n]))
            .unwrap_or_else(|| Tensor::zeros(&[1, n])))
    }

    fn parameters(&self) -> Vec<&Parameter> {
        self.params.iter().collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        self.params.iter_mut().collect()
    }

    fn mode(&self) -> Mode {
        Mode::train()
    }

    fn set_mode(&mut self, _mode: Mode) {}
}
