/*
 * @Date         : 2026-10-15
 * @Description  : Conv2d (2D 卷积) 层，stride = 1、无填充，基于 im2col
 *
 * 输入/输出形状：
 * - 输入：[batch_size, in_channels, H, W]
 * - 输出：[batch_size, out_channels, H - k + 1, W - k + 1]
 *
 * 计算：对每个样本，output = K · cols + b，其中 cols = im2col(x)，形状 [in_c·k·k, H'·W']
 */

use ndarray::{Array2, Array3, Array4, ArrayView3, Axis, Ix1, s};
use rand::Rng;

use super::{Directions, Layer, Mode, expect_rank, expect_same_shape, fan_in_uniform};
use crate::nn::{NnError, Parameter};
use crate::tensor::Tensor;

struct Conv2dCache {
    /// 每个样本的 im2col 展开（即该层逐样本的 A_prev）
    cols: Vec<Array2<f32>>,
    input_shape: [usize; 4],
    track_curvature: bool,
}

/// Conv2d (2D 卷积) 层
pub struct Conv2d {
    name: String,
    /// 卷积核参数 [out_channels, in_channels, k, k]
    kernel: Parameter,
    /// 偏置参数 [out_channels]
    bias: Parameter,
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    cache: Option<Conv2dCache>,
}

impl Conv2d {
    pub fn new<R: Rng + ?Sized>(
        name: &str,
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        rng: &mut R,
    ) -> Self {
        let fan_in = in_channels * kernel_size * kernel_size;
        let kernel = fan_in_uniform(
            fan_in,
            &[out_channels, in_channels, kernel_size, kernel_size],
            rng,
        );
        let bias = fan_in_uniform(fan_in, &[out_channels], rng);
        Self {
            name: name.to_string(),
            kernel: Parameter::new(format!("{name}.weight"), kernel),
            bias: Parameter::new(format!("{name}.bias"), bias),
            in_channels,
            out_channels,
            kernel_size,
            cache: None,
        }
    }

    pub const fn kernel(&self) -> &Parameter {
        &self.kernel
    }

    pub const fn bias(&self) -> &Parameter {
        &self.bias
    }

    #[cfg(test)]
    pub(crate) const fn kernel_mut(&mut self) -> &mut Parameter {
        &mut self.kernel
    }

    #[cfg(test)]
    pub(crate) const fn bias_mut(&mut self) -> &mut Parameter {
        &mut self.bias
    }

    /// 展开的卷积核 [out_c, in_c·k·k]
    fn kernel_matrix(&self) -> Array2<f32> {
        let k = self.kernel_size;
        self.kernel
            .value()
            .reshape(&[self.out_channels, self.in_channels * k * k])
            .view2()
            .to_owned()
    }

    fn bias_vector(&self) -> Result<ndarray::Array1<f32>, NnError> {
        self.bias
            .value()
            .array()
            .clone()
            .into_dimensionality::<Ix1>()
            .map_err(|_| NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: format!("[{}]", self.out_channels),
                got: self.bias.shape().to_vec(),
            })
    }
}

/// 把一个样本 [C, H, W] 展开成 [C·k·k, H'·W']
fn im2col(x: ArrayView3<'_, f32>, k: usize) -> Array2<f32> {
    let (c, h, w) = x.dim();
    let (oh, ow) = (h - k + 1, w - k + 1);
    let mut cols = Array2::zeros((c * k * k, oh * ow));
    for ch in 0..c {
        for ky in 0..k {
            for kx in 0..k {
                let row = ch * k * k + ky * k + kx;
                for oy in 0..oh {
                    cols.slice_mut(s![row, oy * ow..(oy + 1) * ow])
                        .assign(&x.slice(s![ch, oy + ky, kx..kx + ow]));
                }
            }
        }
    }
    cols
}

/// im2col 的逆：把 [C·k·k, H'·W'] 的梯度累加回 [C, H, W]
fn col2im(cols: &Array2<f32>, shape: (usize, usize, usize), k: usize) -> Array3<f32> {
    let (c, h, w) = shape;
    let (oh, ow) = (h - k + 1, w - k + 1);
    let mut x = Array3::zeros((c, h, w));
    for ch in 0..c {
        for ky in 0..k {
            for kx in 0..k {
                let row = ch * k * k + ky * k + kx;
                for oy in 0..oh {
                    let mut target = x.slice_mut(s![ch, oy + ky, kx..kx + ow]);
                    target += &cols.slice(s![row, oy * ow..(oy + 1) * ow]);
                }
            }
        }
    }
    x
}

impl Layer for Conv2d {
    fn forward(&mut self, input: &Tensor, mode: Mode) -> Result<Tensor, NnError> {
        expect_rank(&self.name, input, 4, "[batch, C, H, W]")?;
        let x = input.view4();
        let (n, c, h, w) = x.dim();
        let k = self.kernel_size;
        if c != self.in_channels || h < k || w < k {
            return Err(NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: format!("[batch, {}, ≥{k}, ≥{k}]", self.in_channels),
                got: input.shape().to_vec(),
            });
        }
        let (oh, ow) = (h - k + 1, w - k + 1);

        let kernel = self.kernel_matrix();
        let bias = self.bias_vector()?.insert_axis(Axis(1));
        let mut output = Array4::zeros((n, self.out_channels, oh, ow));
        let mut all_cols = Vec::with_capacity(if mode.training { n } else { 0 });

        for (i, sample) in x.axis_iter(Axis(0)).enumerate() {
            let cols = im2col(sample, k);
            let out = kernel.dot(&cols) + &bias;
            let out = out
                .into_shape((self.out_channels, oh, ow))
                .map_err(|_| NnError::ShapeMismatch {
                    layer: self.name.clone(),
                    expected: format!("[{}, {oh}, {ow}]", self.out_channels),
                    got: input.shape().to_vec(),
                })?;
            output.index_axis_mut(Axis(0), i).assign(&out);
            if mode.training {
                all_cols.push(cols);
            }
        }

        self.cache = mode.training.then(|| Conv2dCache {
            cols: all_cols,
            input_shape: [n, c, h, w],
            track_curvature: mode.track_curvature,
        });
        Ok(Tensor::from_array(output))
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NnError> {
        let cache = self
            .cache
            .as_ref()
            .ok_or_else(|| NnError::BackwardBeforeForward(self.name.clone()))?;
        let [n, c, h, w] = cache.input_shape;
        let k = self.kernel_size;
        let (oh, ow) = (h - k + 1, w - k + 1);
        if grad_output.shape() != [n, self.out_channels, oh, ow] {
            return Err(NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: format!("[{n}, {}, {oh}, {ow}]", self.out_channels),
                got: grad_output.shape().to_vec(),
            });
        }

        let kernel = self.kernel_matrix();
        let rows = c * k * k;
        let mut grad_kernel = Array2::<f32>::zeros((self.out_channels, rows));
        let mut grad_bias = ndarray::Array1::<f32>::zeros(self.out_channels);
        let mut curv_kernel = cache
            .track_curvature
            .then(|| Array2::<f32>::zeros((self.out_channels, rows)));
        let mut curv_bias = cache
            .track_curvature
            .then(|| ndarray::Array1::<f32>::zeros(self.out_channels));
        let mut grad_input = Array4::<f32>::zeros((n, c, h, w));

        let g_all = grad_output.view4();
        for (i, cols) in cache.cols.iter().enumerate() {
            let g = g_all
                .index_axis(Axis(0), i)
                .to_owned()
                .into_shape((self.out_channels, oh * ow))
                .map_err(|_| NnError::ShapeMismatch {
                    layer: self.name.clone(),
                    expected: format!("[{}, {}]", self.out_channels, oh * ow),
                    got: grad_output.shape().to_vec(),
                })?;

            // 样本 i 对平均梯度的贡献
            let contrib_k = g.dot(&cols.t());
            let contrib_b = g.sum_axis(Axis(1));
            if let (Some(ck), Some(cb)) = (curv_kernel.as_mut(), curv_bias.as_mut()) {
                *ck += &contrib_k.mapv(|v| v * v);
                *cb += &contrib_b.mapv(|v| v * v);
            }
            grad_kernel += &contrib_k;
            grad_bias += &contrib_b;

            let grad_cols = kernel.t().dot(&g);
            grad_input
                .index_axis_mut(Axis(0), i)
                .assign(&col2im(&grad_cols, (c, h, w), k));
        }

        let kernel_shape = [self.out_channels, self.in_channels, k, k];
        if let (Some(ck), Some(cb)) = (curv_kernel, curv_bias) {
            let scale = n as f32;
            self.kernel
                .accumulate_curvature(Tensor::from_array(ck * scale).reshape(&kernel_shape));
            self.bias.accumulate_curvature(Tensor::from_array(cb * scale));
        }
        self.kernel
            .accumulate_grad(Tensor::from_array(grad_kernel).reshape(&kernel_shape));
        self.bias.accumulate_grad(Tensor::from_array(grad_bias));
        Ok(Tensor::from_array(grad_input))
    }

    /// 逐样本 `K·im2col(t) + U_K·cols + u_b`
    fn tangent(&self, input: Option<&Tensor>, directions: &Directions) -> Result<Option<Tensor>, NnError> {
        let cache = self
            .cache
            .as_ref()
            .ok_or_else(|| NnError::TangentBeforeForward(self.name.clone()))?;
        let [n, c, h, w] = cache.input_shape;
        let k = self.kernel_size;
        let (oh, ow) = (h - k + 1, w - k + 1);

        let dir_kernel = match directions.get(self.kernel.name()) {
            Some(u) => {
                expect_same_shape(&self.name, self.kernel.shape(), u)?;
                Some(u.reshape(&[self.out_channels, c * k * k]).view2().to_owned())
            }
            None => None,
        };
        let dir_bias = match directions.get(self.bias.name()) {
            Some(u) => {
                expect_same_shape(&self.name, self.bias.shape(), u)?;
                Some(u.reshape(&[self.out_channels, 1]).view2().to_owned())
            }
            None => None,
        };
        if let Some(t) = input {
            expect_same_shape(&self.name, &cache.input_shape, t)?;
        }
        if input.is_none() && dir_kernel.is_none() && dir_bias.is_none() {
            return Ok(None);
        }

        let kernel = self.kernel_matrix();
        let mut output = Array4::<f32>::zeros((n, self.out_channels, oh, ow));
        for (i, cols) in cache.cols.iter().enumerate() {
            let mut out = Array2::<f32>::zeros((self.out_channels, oh * ow));
            if let Some(t) = input {
                out += &kernel.dot(&im2col(t.view4().index_axis(Axis(0), i), k));
            }
            if let Some(u) = &dir_kernel {
                out += &u.dot(cols);
            }
            if let Some(u) = &dir_bias {
                out += u;
            }
            let out = out
                .into_shape((self.out_channels, oh, ow))
                .map_err(|_| NnError::ShapeMismatch {
                    layer: self.name.clone(),
                    expected: format!("[{}, {oh}, {ow}]", self.out_channels),
                    got: vec![self.out_channels, oh * ow],
                })?;
            output.index_axis_mut(Axis(0), i).assign(&out);
        }
        Ok(Some(Tensor::from_array(output)))
    }

    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.kernel, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.kernel, &mut self.bias]
    }

    fn name(&self) -> &str {
        &self.name
    }
}
