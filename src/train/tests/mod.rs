
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::TensorDataset;
use crate::tensor::Tensor;

/// 类 MNIST 的合成数据：类别 c 的图像在第 2c+4、2c+5 行为亮像素，叠加均匀噪声，
/// 像素值已按 MNIST 的均值与标准差标准化
pub(super) fn synthetic_dataset(n: usize, seed: u64) -> TensorDataset {
    const DARK: f32 = -0.4242;
    const BRIGHT: f32 = 2.8215;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pixels = Vec::with_capacity(n * 28 * 28);
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let class = i % 10;
        for row in 0..28 {
            let bright = row == 2 * class + 4 || row == 2 * class + 5;
            for _ in 0..28 {
                let base = if bright { BRIGHT } else { DARK };
                pixels.push(base + rng.gen_range(-0.3..0.3));
            }
        }
        labels.push(class as f32);
    }
    TensorDataset::new(
        Tensor::from_vec(pixels, &[n, 1, 28, 28]),
        Tensor::from_vec(labels, &[n]),
    )
    .unwrap()
}
