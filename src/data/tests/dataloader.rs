//! TensorDataset / DataLoader 单元测试

use crate::data::{DataError, DataLoader, TensorDataset};
use crate::tensor::Tensor;

/// 第 i 个样本的特征为 [2i, 2i+1]，标签为 i
fn counting_dataset(n: usize) -> TensorDataset {
    let features: Vec<f32> = (0..2 * n).map(|x| x as f32).collect();
    let labels: Vec<f32> = (0..n).map(|x| x as f32).collect();
    TensorDataset::new(Tensor::new(&features, &[n, 2]), Tensor::new(&labels, &[n])).unwrap()
}

fn batch_sizes(loader: &DataLoader) -> Vec<usize> {
    loader.iter().map(|(x, _)| x.shape()[0]).collect()
}

#[test]
fn test_dataset_rejects_misaligned_labels() {
    let err = TensorDataset::new(Tensor::zeros(&[3, 2]), Tensor::zeros(&[2])).unwrap_err();
    assert!(matches!(
        err,
        DataError::LengthMismatch {
            features: 3,
            labels: 2
        }
    ));
    assert_eq!(counting_dataset(4).len(), 4);
    assert!(!counting_dataset(1).is_empty());
}

#[test]
fn test_sequential_batches_keep_remainder() {
    let loader = DataLoader::new(counting_dataset(10), 4);
    assert_eq!(loader.num_batches(), 3);
    assert_eq!(batch_sizes(&loader), [4, 4, 2]);

    let (x, y) = loader.iter().last().unwrap();
    assert_eq!(y.to_vec(), vec![8., 9.]);
    assert_eq!(x.to_vec(), vec![16., 17., 18., 19.]);
}

#[test]
fn test_drop_last_discards_partial_batch() {
    let loader = DataLoader::new(counting_dataset(10), 4).drop_last(true);
    assert_eq!(loader.num_batches(), 2);
    assert_eq!(batch_sizes(&loader), [4, 4]);

    let exact = DataLoader::new(counting_dataset(8), 4).drop_last(true);
    assert_eq!(batch_sizes(&exact), [4, 4]);
}

#[test]
fn test_seeded_shuffle_is_reproducible() {
    let epochs = |seed| {
        let loader = DataLoader::new(counting_dataset(20), 6).shuffle(true).seed(seed);
        (0..3)
            .flat_map(|_| loader.iter().map(|(_, y)| y.to_vec()).collect::<Vec<_>>())
            .collect::<Vec<_>>()
    };
    assert_eq!(epochs(42), epochs(42));
    assert_ne!(epochs(42), epochs(43));
}

#[test]
fn test_shuffle_is_a_permutation_of_pairs() {
    let loader = DataLoader::new(counting_dataset(50), 7).shuffle(true).seed(3);
    let mut seen = Vec::new();
    for (x, y) in loader.iter() {
        for (row, &label) in y.iter().enumerate() {
            assert_eq!(x[[row, 0]], 2. * label);
            assert_eq!(x[[row, 1]], 2. * label + 1.);
            seen.push(label as usize);
        }
    }
    seen.sort_unstable();
    assert_eq!(seen, (0..50).collect::<Vec<_>>());
}

#[test]
fn test_each_epoch_reshuffles() {
    let loader = DataLoader::new(counting_dataset(64), 64).shuffle(true).seed(9);
    let first = loader.iter().next().unwrap().1;
    let second = loader.iter().next().unwrap().1;
    assert_ne!(first, second);
}

#[test]
#[should_panic(expected = "batch_size 必须大于 0")]
fn test_zero_batch_size_panics() {
    DataLoader::new(counting_dataset(3), 0);
}
