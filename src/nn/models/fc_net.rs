/*
 * @Date         : 2026-10-15
 * @Description  : 全连接网络：784 → 320 → ReLU → 50 → ReLU → 10 → LogSoftmax
 */

use rand::Rng;

use crate::nn::layer::{Directions, Flatten, Linear, LogSoftmax, Mode, Relu, Sequential};
use crate::nn::{Network, NnError, Parameter};
use crate::tensor::Tensor;

pub const INPUT_FEATURES: usize = 28 * 28;
pub const NUM_CLASSES: usize = 10;

pub struct FcNet {
    layers: Sequential,
    mode: Mode,
    last_output: Option<Tensor>,
}

impl FcNet {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let layers = Sequential::new()
            .push(Flatten::new("flatten", INPUT_FEATURES))
            .push(Linear::new("fc_0", INPUT_FEATURES, 320, rng))
            .push(Relu::new("relu_0"))
            .push(Linear::new("fc_1", 320, 50, rng))
            .push(Relu::new("relu_1"))
            .push(Linear::new("fc_2", 50, NUM_CLASSES, rng))
            .push(LogSoftmax::new("log_softmax"));
        Self {
            layers,
            mode: Mode::train(),
            last_output: None,
        }
    }
}

impl Network for FcNet {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, NnError> {
        let output = self.layers.forward(input, self.mode)?;
        self.last_output = self.mode.training.then(|| output.clone());
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<(), NnError> {
        self.layers.backward(grad_output).map(|_| ())
    }

    fn last_output(&self) -> Option<&Tensor> {
        self.last_output.as_ref()
    }

    fn output_tangent(&self, directions: &Directions) -> Result<Tensor, NnError> {
        let output = self
            .last_output
            .as_ref()
            .ok_or_else(|| NnError::TangentBeforeForward("fc_net".to_string()))?;
        Ok(self
            .layers
            .tangent(directions)?
            .unwrap_or_else(|| Tensor::zeros(output.shape())))
    }

    fn parameters(&self) -> Vec<&Parameter> {
        self.layers.parameters()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        self.layers.parameters_mut()
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }
}
