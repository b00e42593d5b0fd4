use approx::assert_abs_diff_eq;

use crate::tensor::Tensor;

#[test]
fn test_sum_mean_dot() {
    let a = Tensor::new(&[1., 2., 3., 4.], &[2, 2]);
    assert_eq!(a.sum(), 10.);
    assert_eq!(a.mean(), 2.5);
    assert_abs_diff_eq!(a.dot(&a), 30.0, epsilon = 1e-9);
}

#[test]
fn test_argmax_rows() {
    let t = Tensor::new(&[0.1, 0.7, 0.2, 0.9, 0.05, 0.05, 0.3, 0.3, 0.4], &[3, 3]);
    assert_eq!(t.argmax_rows(), vec![1, 0, 2]);
}

#[test]
fn test_is_finite() {
    assert!(Tensor::new(&[1., -2.], &[2]).is_finite());
    assert!(!Tensor::new(&[1., f32::NAN], &[2]).is_finite());
    assert!(!Tensor::new(&[f32::INFINITY], &[1]).is_finite());
}

#[test]
fn test_sqrt_square() {
    let a = Tensor::new(&[4., 9.], &[2]);
    assert_eq!(a.sqrt(), Tensor::new(&[2., 3.], &[2]));
    assert_eq!(a.square(), Tensor::new(&[16., 81.], &[2]));
}
