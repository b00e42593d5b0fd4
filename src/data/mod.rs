//! MNIST 数据的读取、预处理与分批
//!
//! ```ignore
//! use autoopt::data::{DataLoader, MnistDataset};
//!
//! let train = MnistDataset::load(Path::new("./data"), true, true)?.into_dataset()?;
//! let loader = DataLoader::new(train, 64).shuffle(true).seed(42);
//! for (images, labels) in loader.iter() {
//!     // images: [B, 1, 28, 28]，labels: [B]
//! }
//! ```

mod dataloader;
pub mod datasets;
pub mod download;
pub mod error;
pub mod transforms;

#[cfg(test)]
mod tests;

pub use dataloader::{DataLoader, DataLoaderIterator, TensorDataset};
pub use datasets::{MNIST_MEAN, MNIST_STD, MnistDataset};
pub use error::DataError;
