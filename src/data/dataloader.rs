/*
 * @Date         : 2026-10-15
 * @Description  : 内存数据集与按批次迭代的加载器
 *
 * 每次 `iter()` 视为一个 epoch：开启 shuffle 时重新打乱样本顺序。
 * 设定种子后打乱用的随机源在各 epoch 间延续，整段训练的批次序列可复现。
 */

use std::cell::RefCell;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::data::error::DataError;
use crate::tensor::Tensor;

/// 第一维对齐的特征与标签
#[derive(Debug, Clone)]
pub struct TensorDataset {
    features: Tensor,
    labels: Tensor,
}

fn leading_dim(t: &Tensor) -> usize {
    t.shape().first().copied().unwrap_or(0)
}

impl TensorDataset {
    pub fn new(features: Tensor, labels: Tensor) -> Result<Self, DataError> {
        match (leading_dim(&features), leading_dim(&labels)) {
            (f, l) if f == l => Ok(Self { features, labels }),
            (features, labels) => Err(DataError::LengthMismatch { features, labels }),
        }
    }

    pub fn len(&self) -> usize {
        leading_dim(&self.labels)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn features(&self) -> &Tensor {
        &self.features
    }

    pub const fn labels(&self) -> &Tensor {
        &self.labels
    }

    /// 取出若干样本组成一个批次
    fn gather(&self, rows: &[usize]) -> (Tensor, Tensor) {
        (self.features.select_rows(rows), self.labels.select_rows(rows))
    }
}

/// 批次加载器
///
/// ```ignore
/// let loader = DataLoader::new(dataset, 64).shuffle(true).seed(1);
/// for epoch in 1..=epochs {
///     for (images, labels) in loader.iter() {
///         // ...
///     }
/// }
/// ```
pub struct DataLoader {
    dataset: TensorDataset,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    rng: Option<RefCell<StdRng>>,
}

impl DataLoader {
    /// # Panics
    /// `batch_size` 为 0 时 panic；配置校验会先拦下这种输入
    pub fn new(dataset: TensorDataset, batch_size: usize) -> Self {
        assert!(batch_size > 0, "DataLoader: batch_size 必须大于 0");
        Self {
            dataset,
            batch_size,
            shuffle: false,
            drop_last: false,
            rng: None,
        }
    }

    pub fn shuffle(self, shuffle: bool) -> Self {
        Self { shuffle, ..self }
    }

    /// 样本数不能整除批大小时，是否丢弃末尾的小批次
    pub fn drop_last(self, drop_last: bool) -> Self {
        Self { drop_last, ..self }
    }

    /// 固定打乱顺序用的随机种子；不设时每个 epoch 取线程随机源
    pub fn seed(self, seed: u64) -> Self {
        Self {
            rng: Some(RefCell::new(StdRng::seed_from_u64(seed))),
            ..self
        }
    }

    pub fn num_batches(&self) -> usize {
        let n = self.dataset.len();
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }

    /// 样本数
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// 开始一个 epoch
    pub fn iter(&self) -> DataLoaderIterator<'_> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            match &self.rng {
                Some(rng) => order.shuffle(&mut *rng.borrow_mut()),
                None => order.shuffle(&mut rand::thread_rng()),
            }
        }
        DataLoaderIterator {
            loader: self,
            order,
            cursor: 0,
        }
    }
}

/// 逐批产出 `(features, labels)`
pub struct DataLoaderIterator<'a> {
    loader: &'a DataLoader,
    order: Vec<usize>,
    cursor: usize,
}

impl Iterator for DataLoaderIterator<'_> {
    type Item = (Tensor, Tensor);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.order.get(self.cursor..).filter(|r| !r.is_empty())?;
        let take = rest.len().min(self.loader.batch_size);
        if take < self.loader.batch_size && self.loader.drop_last {
            return None;
        }
        let rows = &rest[..take];
        self.cursor += take;
        Some(self.loader.dataset.gather(rows))
    }
}
