//! MNIST 手写数字数据集
//!
//! 读取 IDX 文件（原始或 .gz），像素缩放到 [0, 1] 后按训练集统计量标准化；
//! 标签保留为类别索引。缺失文件可按需从镜像下载并做 MD5 校验。

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::debug;

use crate::data::dataloader::TensorDataset;
use crate::data::download::download_file;
use crate::data::error::DataError;
use crate::data::transforms::{normalize_pixels, standardize};
use crate::tensor::Tensor;

/// 训练集像素（缩放到 [0, 1] 后）的均值
pub const MNIST_MEAN: f32 = 0.1307;
/// 训练集像素（缩放到 [0, 1] 后）的标准差
pub const MNIST_STD: f32 = 0.3081;

const MIRROR: &str = "https://ossci-datasets.s3.amazonaws.com/mnist/";

const SIDE: usize = 28;
const IMAGES_MAGIC: u32 = 0x0803;
const LABELS_MAGIC: u32 = 0x0801;

/// 一个 IDX 文件：文件名与其 .gz 包的 MD5
struct Resource {
    name: &'static str,
    md5: &'static str,
}

impl Resource {
    /// 在 `root` 下定位该文件，优先原始文件，其次 .gz；都没有时视 `download` 决定是否下载
    fn locate(&self, root: &Path, download: bool) -> Result<PathBuf, DataError> {
        let raw = root.join(self.name);
        let packed = root.join(format!("{}.gz", self.name));
        if let Some(found) = [&raw, &packed].into_iter().find(|p| p.exists()) {
            return Ok(found.clone());
        }
        if !download {
            return Err(DataError::Missing(raw));
        }
        std::fs::create_dir_all(root)?;
        download_file(&format!("{MIRROR}{}.gz", self.name), &packed, Some(self.md5))?;
        Ok(packed)
    }
}

/// (图像, 标签)
const TRAIN: (Resource, Resource) = (
    Resource {
        name: "train-images-idx3-ubyte",
        md5: "f68b3c2dcbeaaa9fbdd348bbdeb94873",
    },
    Resource {
        name: "train-labels-idx1-ubyte",
        md5: "d53e105ee54ea40749a09fcbcd1e9432",
    },
);
const TEST: (Resource, Resource) = (
    Resource {
        name: "t10k-images-idx3-ubyte",
        md5: "9fb629c4189551a2d022fa330f9573f3",
    },
    Resource {
        name: "t10k-labels-idx1-ubyte",
        md5: "ec29112dd5afa0611ce80d1b7f02629c",
    },
);

/// MNIST 数据集：训练集 60000 张，测试集 10000 张，每张 28x28 灰度图
#[derive(Debug, Clone)]
pub struct MnistDataset {
    /// [N, 1, 28, 28]，已标准化
    images: Tensor,
    /// [N]，0-9 的类别索引
    labels: Tensor,
}

impl MnistDataset {
    /// 从 `root` 加载训练集（`train = true`）或测试集
    pub fn load(root: &Path, train: bool, download: bool) -> Result<Self, DataError> {
        let (images, labels) = if train { &TRAIN } else { &TEST };
        let images_path = images.locate(root, download)?;
        let labels_path = labels.locate(root, download)?;
        Self::from_idx_files(&images_path, &labels_path)
    }

    pub fn from_idx_files(images_path: &Path, labels_path: &Path) -> Result<Self, DataError> {
        let pixels = parse_idx_images(images_path)?;
        let labels = parse_idx_labels(labels_path)?;

        let (features, count) = (pixels.shape()[0], labels.size());
        if features != count {
            return Err(DataError::LengthMismatch {
                features,
                labels: count,
            });
        }

        let images =
            standardize(&normalize_pixels(&pixels), MNIST_MEAN, MNIST_STD).reshape(&[count, 1, SIDE, SIDE]);
        debug!(samples = count, path = ?images_path, "MNIST 解析完成");
        Ok(Self { images, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 第 `index` 个样本：([1, 28, 28] 图像, 类别)
    pub fn get(&self, index: usize) -> Result<(Tensor, usize), DataError> {
        let len = self.len();
        if index >= len {
            return Err(DataError::IndexOutOfBounds { index, len });
        }
        let image = self.images.select_rows(&[index]).reshape(&[1, SIDE, SIDE]);
        Ok((image, self.labels[[index]] as usize))
    }

    pub const fn images(&self) -> &Tensor {
        &self.images
    }

    pub const fn labels(&self) -> &Tensor {
        &self.labels
    }

    pub fn into_dataset(self) -> Result<TensorDataset, DataError> {
        TensorDataset::new(self.images, self.labels)
    }
}

/// 读出一个 IDX 文件：校验 magic，返回各维大小与全部字节内容
///
/// 头部为大端 u32：magic（低字节为维数），随后每维一个 u32。
fn read_idx(path: &Path, magic: u32) -> Result<(Vec<usize>, Vec<u8>), DataError> {
    let malformed = |reason: String| DataError::MalformedIdx {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|_| DataError::Missing(path.to_path_buf()))?;
    let mut reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut read_u32 = |what: &str| -> Result<u32, DataError> {
        let mut word = [0u8; 4];
        reader
            .read_exact(&mut word)
            .map_err(|e| malformed(format!("读取{what}失败: {e}")))?;
        Ok(u32::from_be_bytes(word))
    };

    let found = read_u32("magic")?;
    if found != magic {
        return Err(malformed(format!("magic 为 {found:#06x}，期望 {magic:#06x}")));
    }
    let dims = (0..magic & 0xff)
        .map(|_| read_u32("维度").map(|d| d as usize))
        .collect::<Result<Vec<_>, _>>()?;

    let expected = dims
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| malformed(format!("维度 {dims:?} 的元素总数溢出")))?;

    // 头部声明的长度不可信：按实际读到的字节增长缓冲区，再与声明比较
    let mut payload = Vec::new();
    reader
        .by_ref()
        .take(u64::try_from(expected).unwrap_or(u64::MAX))
        .read_to_end(&mut payload)
        .map_err(|e| malformed(format!("读取数据失败: {e}")))?;
    if payload.len() != expected {
        return Err(malformed(format!(
            "头部声明 {expected} 字节，实际只有 {} 字节",
            payload.len()
        )));
    }
    Ok((dims, payload))
}

/// 解析 IDX 图像文件，返回 [N, 784] 的原始像素（0-255）
pub fn parse_idx_images(path: &Path) -> Result<Tensor, DataError> {
    let (dims, pixels) = read_idx(path, IMAGES_MAGIC)?;
    if dims[1..] != [SIDE, SIDE] {
        return Err(DataError::MalformedIdx {
            path: path.to_path_buf(),
            reason: format!("图像尺寸为 {}x{}，期望 28x28", dims[1], dims[2]),
        });
    }
    let data = pixels.into_iter().map(f32::from).collect();
    Ok(Tensor::from_vec(data, &[dims[0], SIDE * SIDE]))
}

/// 解析 IDX 标签文件，返回 [N] 的类别索引
pub fn parse_idx_labels(path: &Path) -> Result<Tensor, DataError> {
    let (dims, labels) = read_idx(path, LABELS_MAGIC)?;
    if let Some(bad) = labels.iter().find(|&&l| l > 9) {
        return Err(DataError::MalformedIdx {
            path: path.to_path_buf(),
            reason: format!("标签 {bad} 超出 0-9 范围"),
        });
    }
    let data = labels.into_iter().map(f32::from).collect();
    Ok(Tensor::from_vec(data, &[dims[0]]))
}
