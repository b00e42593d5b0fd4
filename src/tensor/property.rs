/*
 * @Date         : 2026-10-15
 * @Description  : 只读的属性查询
 */

use ndarray::ArrayViewD;

use super::Tensor;

impl Tensor {
    pub fn view(&self) -> ArrayViewD<'_, f32> {
        self.data.view()
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// 阶数，即 `shape()` 的长度；标量为 0
    pub fn dimension(&self) -> usize {
        self.data.ndim()
    }

    /// 元素总数
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 形状严格相同；[1, 4] 与 [4] 视为不同
    pub fn is_same_shape(&self, other: &Self) -> bool {
        self.data.shape() == other.data.shape()
    }

    /// 只含一个元素（形状为 []、[1]、[1, 1] 等）
    pub fn is_scalar(&self) -> bool {
        self.size() == 1
    }

    /// 标量的值；非标量返回 `None`
    pub fn number(&self) -> Option<f32> {
        self.is_scalar().then(|| self.data.iter().copied().next()).flatten()
    }

    /// 不含 NaN 与 ±inf
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// 行优先遍历
    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.data.iter()
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.iter().copied().collect()
    }
}
