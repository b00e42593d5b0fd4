/*
 * @Date         : 2026-10-15
 * @Description  : 卷积网络（LeNet 风格）
 *
 * conv(1→10, k5) → maxpool2 → ReLU → conv(10→20, k5) → Dropout2d → maxpool2 → ReLU
 * → view 320 → fc 320→50 → ReLU → Dropout → fc 50→10 → LogSoftmax
 */

use rand::Rng;

use super::fc_net::NUM_CLASSES;
use crate::nn::layer::{
    Conv2d, Directions, Dropout, Dropout2d, Flatten, Linear, LogSoftmax, MaxPool2d, Mode, Relu,
    Sequential,
};
use crate::nn::{Network, NnError, Parameter};
use crate::tensor::Tensor;

/// 第二个池化层输出 [20, 4, 4] 展平后的长度
const CONV_FEATURES: usize = 320;

pub struct Cnn {
    layers: Sequential,
    mode: Mode,
    last_output: Option<Tensor>,
}

impl Cnn {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let layers = Sequential::new()
            .push(Conv2d::new("conv1", 1, 10, 5, rng))
            .push(MaxPool2d::new("pool1", 2))
            .push(Relu::new("relu1"))
            .push(Conv2d::new("conv2", 10, 20, 5, rng))
            .push(Dropout2d::new("conv2_drop", 0.5, rng))
            .push(MaxPool2d::new("pool2", 2))
            .push(Relu::new("relu2"))
            .push(Flatten::new("flatten", CONV_FEATURES))
            .push(Linear::new("fc1", CONV_FEATURES, 50, rng))
            .push(Relu::new("relu3"))
            .push(Dropout::new("fc1_drop", 0.5, rng))
            .push(Linear::new("fc2", 50, NUM_CLASSES, rng))
            .push(LogSoftmax::new("log_softmax"));
        Self {
            layers,
            mode: Mode::train(),
            last_output: None,
        }
    }
}

impl Network for Cnn {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, NnError> {
        // 允许直接传入展平的 [batch, 784]
        let output = if input.dimension() == 2 && input.shape()[1] == 28 * 28 {
            let reshaped = input.reshape(&[input.shape()[0], 1, 28, 28]);
            self.layers.forward(&reshaped, self.mode)?
        } else {
            self.layers.forward(input, self.mode)?
        };
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
            .ok_or_else(|| NnError::TangentBeforeForward("cnn".to_string()))?;
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
