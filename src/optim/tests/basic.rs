/*
 * @Date         : 2026-10-15
 * @Description  : SGD、Adam、GaussNewton 单元测试
 */

use approx::assert_abs_diff_eq;

use super::Toy;
use crate::nn::Network;
use crate::optim::{Adam, GaussNewton, OptimError, Optimizer, Sgd};

fn assert_values(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (a, b) in actual.iter().zip(expected) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-5);
    }
}

#[test]
fn test_sgd_plain_step() {
    let mut model = Toy::new(&[1.0, -2.0]);
    let mut sgd = Sgd::new(0.1, 0.0, 0.0);
    model.set_grad(&[2.0, -4.0], None);
    sgd.step(&mut model).unwrap();
    assert_values(&model.value(), &[0.8, -1.6]);
    assert!(!sgd.needs_curvature());
}

#[test]
fn test_sgd_momentum_with_dampening() {
    // dampening = momentum：首步缓冲区取梯度，之后 b = 0.5·b + 0.5·g
    let mut model = Toy::new(&[0.0]);
    let mut sgd = Sgd::new(0.1, 0.5, 0.5);
    for _ in 0..2 {
        model.set_grad(&[1.0], None);
        sgd.step(&mut model).unwrap();
    }
    assert_values(&model.value(), &[-0.2]);
}

#[test]
fn test_sgd_momentum_without_dampening() {
    let mut model = Toy::new(&[0.0]);
    let mut sgd = Sgd::new(0.1, 0.5, 0.0);
    for _ in 0..2 {
        model.set_grad(&[1.0], None);
        sgd.step(&mut model).unwrap();
    }
    assert_values(&model.value(), &[-0.25]);

    // reset 后缓冲区重新取梯度
    sgd.reset();
    model.set_grad(&[1.0], None);
    sgd.step(&mut model).unwrap();
    assert_values(&model.value(), &[-0.35]);
}

#[test]
fn test_sgd_skips_parameters_without_grad() {
    let mut model = Toy::new(&[1.0]);
    let mut sgd = Sgd::new(0.1, 0.0, 0.0);
    sgd.zero_grad(&mut model);
    sgd.step(&mut model).unwrap();
    assert_values(&model.value(), &[1.0]);
}

#[test]
fn test_learning_rate_accessors() {
    let mut sgd = Sgd::new(0.1, 0.0, 0.0);
    sgd.set_learning_rate(0.5);
    assert_abs_diff_eq!(sgd.learning_rate(), 0.5);
    assert_abs_diff_eq!(Adam::new_default(0.01).learning_rate(), 0.01);
}

#[test]
fn test_adam_first_step_is_lr_times_sign() {
    let mut model = Toy::new(&[1.0, 1.0]);
    let mut adam = Adam::new(0.01, 0.9, 0.999, 1e-8);
    model.set_grad(&[3.0, -0.5], None);
    adam.step(&mut model).unwrap();
    assert_values(&model.value(), &[0.99, 1.01]);
}

#[test]
fn test_adam_bias_correction_keeps_constant_gradient_step() {
    let mut model = Toy::new(&[0.0]);
    let mut adam = Adam::new(0.1, 0.9, 0.999, 1e-8);
    for _ in 0..5 {
        model.set_grad(&[2.0], None);
        adam.step(&mut model).unwrap();
    }
    assert_values(&model.value(), &[-0.5]);
}

#[test]
fn test_gauss_newton_first_step() {
    let mut model = Toy::new(&[1.0, 1.0]);
    let mut gn = GaussNewton::new(0.1, 0.9, 0.999, 1.0);
    assert!(gn.needs_curvature());
    model.set_grad(&[2.0, 2.0], Some(&[3.0, 0.0]));
    gn.step(&mut model).unwrap();
    // θ -= lr · g / (F + eps)
    assert_values(&model.value(), &[0.95, 0.8]);
}

#[test]
fn test_gauss_newton_requires_curvature() {
    let mut model = Toy::new(&[1.0]);
    let mut gn = GaussNewton::new(0.1, 0.9, 0.999, 1e-3);
    model.set_grad(&[1.0], None);
    assert_eq!(
        gn.step(&mut model),
        Err(OptimError::MissingCurvature("w".to_string()))
    );
    assert_values(&model.value(), &[1.0]);
}

#[test]
fn test_zero_grad_clears_model() {
    let mut model = Toy::new(&[1.0]);
    model.set_grad(&[1.0], Some(&[1.0]));
    Adam::new_default(0.1).zero_grad(&mut model);
    assert!(model.parameters()[0].grad().is_none());
    assert!(model.parameters()[0].curvature().is_none());
}

/// 后面的参数缺曲率时，前面的参数也不能被更新
#[test]
fn test_gauss_newton_missing_curvature_leaves_model_untouched() {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::nn::{FcNet, nll_loss_backward};
    use crate::tensor::Tensor;

    let mut model = FcNet::new(&mut StdRng::seed_from_u64(3));
    let images = Tensor::full(0.5, &[2, 1, 28, 28]);
    let labels = Tensor::new(&[1.0, 7.0], &[2]);
    let out = model.forward(&images).unwrap();
    model.backward(&nll_loss_backward(&out, &labels).unwrap()).unwrap();

    let curvature = Tensor::full(1.0, model.parameters()[0].shape());
    model.parameters_mut()[0].accumulate_curvature(curvature);
    let before: Vec<Tensor> = model.parameters().iter().map(|p| p.value().clone()).collect();

    for mut optimizer in [
        crate::optim::AnyOptimizer::from(GaussNewton::new(0.1, 0.9, 0.999, 1e-3)),
        crate::optim::AutoGaussNewton::new(0.9, 0.999, 0.999, 1e-3).into(),
    ] {
        assert_eq!(
            optimizer.step(&mut model),
            Err(OptimError::MissingCurvature("fc_0.bias".to_string()))
        );
        let after: Vec<Tensor> = model.parameters().iter().map(|p| p.value().clone()).collect();
        assert_eq!(before, after);
    }
}
