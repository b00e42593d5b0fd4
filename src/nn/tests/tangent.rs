/*
 * @Date         : 2026-10-15
 * @Description  : 前向模式求导（切向量）单元测试
 */

use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::nn::layer::{
    Conv2d, Directions, Dropout, Flatten, Layer, Linear, LogSoftmax, MaxPool2d, Mode, Relu, Sequential, log_softmax,
};
use crate::nn::{
    Cnn, FcNet, Network, NnError, Reduction, gauss_newton_inner, nll_loss, nll_loss_backward,
};
use crate::tensor::Tensor;

fn assert_close(actual: &Tensor, expected: &Tensor, epsilon: f32) {
    assert_eq!(actual.shape(), expected.shape());
    for (a, b) in actual.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = epsilon);
    }
}

/// 每个参数一个随机方向
fn random_directions(model: &dyn Network, scale: f32, seed: u64) -> Directions {
    let mut rng = StdRng::seed_from_u64(seed);
    model
        .parameters()
        .iter()
        .map(|p| {
            let u = Tensor::new_uniform(-scale, scale, p.shape(), &mut rng);
            (p.name().to_string(), u)
        })
        .collect()
}

/// θ += scale · u，没有方向的参数不动
fn shift(model: &mut dyn Network, directions: &Directions, scale: f32) {
    for p in model.parameters_mut() {
        if let Some(u) = directions.get(p.name()) {
            let value = p.value() + &(u * scale);
            p.set_value(value);
        }
    }
}

#[test]
fn test_linear_tangent_values() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut linear = Linear::new("fc", 3, 2, &mut rng);
    linear
        .weight_mut()
        .set_value(Tensor::new(&[1.0, 0.0, -1.0, 0.5, 2.0, 1.0], &[2, 3]));
    linear.forward(&Tensor::new(&[1.0, 2.0, 3.0], &[1, 3]), Mode::train()).unwrap();

    let directions = Directions::from([
        ("fc.weight".to_string(), Tensor::new(&[1.0, 0.0, 0.0, 0.0, 0.0, 1.0], &[2, 3])),
        ("fc.bias".to_string(), Tensor::new(&[0.5, -1.0], &[2])),
    ]);
    let t = Tensor::new(&[0.0, 1.0, 0.0], &[1, 3]);
    // t·Wᵀ = [0, 2]，x·Uᵀ = [1, 3]，u_b = [0.5, -1]
    let out = linear.tangent(Some(&t), &directions).unwrap().unwrap();
    assert_close(&out, &Tensor::new(&[1.5, 4.0], &[1, 2]), 1e-6);

    assert!(linear.tangent(None, &Directions::new()).unwrap().is_none());
}

#[test]
fn test_tangent_requires_training_forward() {
    let relu = Relu::new("relu");
    let t = Tensor::zeros(&[1, 2]);
    assert_eq!(
        relu.tangent(Some(&t), &Directions::new()).unwrap_err(),
        NnError::TangentBeforeForward("relu".to_string())
    );

    let mut linear = Linear::new("fc", 2, 2, &mut StdRng::seed_from_u64(1));
    linear.forward(&t, Mode::eval()).unwrap();
    assert!(matches!(
        linear.tangent(Some(&t), &Directions::new()),
        Err(NnError::TangentBeforeForward(name)) if name == "fc"
    ));
}

#[test]
fn test_tangent_rejects_wrong_direction_shape() {
    let mut linear = Linear::new("fc", 3, 2, &mut StdRng::seed_from_u64(0));
    linear.forward(&Tensor::zeros(&[1, 3]), Mode::train()).unwrap();
    let directions = Directions::from([("fc.weight".to_string(), Tensor::zeros(&[3, 2]))]);
    assert!(matches!(
        linear.tangent(None, &directions),
        Err(NnError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_log_softmax_tangent_matches_finite_difference() {
    let mut rng = StdRng::seed_from_u64(5);
    let x = Tensor::new_uniform(-2.0, 2.0, &[3, 4], &mut rng);
    let t = Tensor::new_uniform(-1.0, 1.0, &[3, 4], &mut rng);
    let mut layer = LogSoftmax::new("log_softmax");
    let y = layer.forward(&x, Mode::train()).unwrap();
    let s = layer.tangent(Some(&t), &Directions::new()).unwrap().unwrap();

    let eps = 1e-2;
    let numeric = (log_softmax(&(&x + &(&t * eps))) - log_softmax(&(&x - &(&t * eps)))) / (2.0 * eps);
    assert_close(&s, &numeric, 1e-3);

    // 概率加权后每行和为零
    for i in 0..3 {
        let weighted: f32 = (0..4).map(|j| y[[i, j]].exp() * s[[i, j]]).sum();
        assert_abs_diff_eq!(weighted, 0.0, epsilon = 1e-5);
    }
}

#[test]
fn test_max_pool2d_tangent_gathers_at_argmax() {
    let mut pool = MaxPool2d::new("pool", 2);
    let x = Tensor::new(&(1..=16).map(|v| v as f32).collect::<Vec<_>>(), &[1, 1, 4, 4]);
    pool.forward(&x, Mode::train()).unwrap();
    let t = &x * 10.0;
    let out = pool.tangent(Some(&t), &Directions::new()).unwrap().unwrap();
    assert_eq!(out.shape(), &[1, 1, 2, 2]);
    assert_eq!(out.to_vec(), vec![60.0, 80.0, 140.0, 160.0]);
}

#[test]
fn test_dropout_and_flatten_tangents() {
    let mut rng = StdRng::seed_from_u64(2);
    let mut dropout = Dropout::new("drop", 0.5, &mut rng);
    let ones = Tensor::full(1.0, &[2, 8]);
    let y = dropout.forward(&ones, Mode::train()).unwrap();
    let t = dropout.tangent(Some(&ones), &Directions::new()).unwrap().unwrap();
    assert_eq!(t, y);

    let mut flatten = Flatten::new("flatten", 8);
    flatten.forward(&Tensor::zeros(&[2, 2, 2, 2]), Mode::train()).unwrap();
    let t = flatten
        .tangent(Some(&Tensor::zeros(&[2, 2, 2, 2])), &Directions::new())
        .unwrap()
        .unwrap();
    assert_eq!(t.shape(), &[2, 8]);
    assert!(flatten.tangent(None, &Directions::new()).unwrap().is_none());
}

/// 卷积对 (K, b, x) 是双线性的，中心差分应与切向量一致
#[test]
fn test_conv2d_tangent_matches_finite_difference() {
    let mut rng = StdRng::seed_from_u64(9);
    let x = Tensor::new_uniform(-1.0, 1.0, &[2, 2, 5, 5], &mut rng);
    let t = Tensor::new_uniform(-1.0, 1.0, &[2, 2, 5, 5], &mut rng);
    let u_k = Tensor::new_uniform(-1.0, 1.0, &[3, 2, 3, 3], &mut rng);
    let u_b = Tensor::new_uniform(-1.0, 1.0, &[3], &mut rng);

    let mut conv = Conv2d::new("conv", 2, 3, 3, &mut StdRng::seed_from_u64(4));
    conv.forward(&x, Mode::train()).unwrap();
    let directions = Directions::from([
        ("conv.weight".to_string(), u_k.clone()),
        ("conv.bias".to_string(), u_b.clone()),
    ]);
    let tangent = conv.tangent(Some(&t), &directions).unwrap().unwrap();
    assert_eq!(tangent.shape(), &[2, 3, 3, 3]);

    let kernel = conv.kernel().value().clone();
    let bias = conv.bias().value().clone();
    let eps = 1e-2;
    let mut evaluate = |sign: f32| {
        conv.kernel_mut().set_value(&kernel + &(&u_k * (sign * eps)));
        conv.bias_mut().set_value(&bias + &(&u_b * (sign * eps)));
        conv.forward(&(&x + &(&t * (sign * eps))), Mode::eval()).unwrap()
    };
    let plus = evaluate(1.0);
    let minus = evaluate(-1.0);
    let numeric = (plus - minus) / (2.0 * eps);
    assert_close(&tangent, &numeric, 2e-3);
}

#[test]
fn test_sequential_tangent_without_directions_is_none() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut seq = Sequential::new()
        .push(Linear::new("a", 4, 3, &mut rng))
        .push(Relu::new("relu"))
        .push(Linear::new("b", 3, 2, &mut rng));
    seq.forward(&Tensor::full(1.0, &[5, 4]), Mode::train()).unwrap();
    assert!(seq.tangent(&Directions::new()).unwrap().is_none());

    let only_last = Directions::from([("b.bias".to_string(), Tensor::new(&[1.0, 2.0], &[2]))]);
    let t = seq.tangent(&only_last).unwrap().unwrap();
    assert_eq!(t.shape(), &[5, 2]);
    assert!(t.to_vec().chunks(2).all(|row| row == [1.0, 2.0]));
}

#[test]
fn test_fc_net_output_tangent_matches_finite_difference() {
    let mut rng = StdRng::seed_from_u64(12);
    let images = Tensor::new_uniform(-0.5, 2.5, &[4, 1, 28, 28], &mut rng);
    let mut model = FcNet::new(&mut StdRng::seed_from_u64(13));
    model.forward(&images).unwrap();
    let directions = random_directions(&model, 0.01, 14);
    let tangent = model.output_tangent(&directions).unwrap();
    assert_eq!(tangent.shape(), &[4, 10]);

    let eps = 1e-2;
    shift(&mut model, &directions, eps);
    let plus = model.forward(&images).unwrap();
    shift(&mut model, &directions, -2.0 * eps);
    let minus = model.forward(&images).unwrap();
    let numeric = (plus - minus) / (2.0 * eps);

    let scale = tangent.iter().fold(0.0f32, |m, v| m.max(v.abs()));
    assert!(scale > 0.0);
    assert_close(&tangent, &numeric, 0.05 * scale + 1e-4);
}

#[test]
fn test_cnn_output_tangent_is_linear_in_directions() {
    let mut rng = StdRng::seed_from_u64(20);
    let images = Tensor::new_uniform(-0.5, 2.5, &[3, 1, 28, 28], &mut rng);
    let mut model = Cnn::new(&mut StdRng::seed_from_u64(21));
    let log_probs = model.forward(&images).unwrap();
    assert_eq!(model.last_output(), Some(&log_probs));

    let directions = random_directions(&model, 0.1, 22);
    let doubled: Directions = directions
        .iter()
        .map(|(name, u)| (name.clone(), u * 2.0))
        .collect();
    let t1 = model.output_tangent(&directions).unwrap();
    let t2 = model.output_tangent(&doubled).unwrap();
    assert_eq!(t1.shape(), &[3, 10]);
    assert_close(&t2, &(&t1 * 2.0), 1e-4);

    // 沿输出切向量的 Gauss-Newton 二次型非负
    assert!(gauss_newton_inner(&log_probs, &t1, &t1).unwrap() >= 0.0);
    assert_eq!(
        model.output_tangent(&Directions::new()).unwrap(),
        Tensor::zeros(&[3, 10])
    );
}

#[test]
fn test_output_tangent_requires_training_forward() {
    let images = Tensor::zeros(&[2, 784]);
    let mut model = FcNet::new(&mut StdRng::seed_from_u64(0));
    model.eval();
    model.forward(&images).unwrap();
    assert!(model.last_output().is_none());
    assert!(matches!(
        model.output_tangent(&Directions::new()),
        Err(NnError::TangentBeforeForward(_))
    ));
}

/// 二次模型与真实 loss 的一致性：沿方向 u 的二阶差分接近 Gauss-Newton 二次型
#[test]
fn test_gauss_newton_inner_bounds_loss_curvature_at_last_layer() {
    let mut rng = StdRng::seed_from_u64(30);
    let images = Tensor::new_uniform(-0.5, 2.5, &[6, 784], &mut rng);
    let labels = Tensor::from_vec((0..6).map(|i| (i % 10) as f32).collect(), &[6]);
    let mut model = FcNet::new(&mut StdRng::seed_from_u64(31));
    let log_probs = model.forward(&images).unwrap();
    model.backward(&nll_loss_backward(&log_probs, &labels).unwrap()).unwrap();

    // 只扰动最后一层：输出对参数是线性的，此时 Gauss-Newton 即 Hessian
    let mut directions = random_directions(&model, 0.1, 32);
    directions.retain(|name, _| name.starts_with("fc_2"));
    let t = model.output_tangent(&directions).unwrap();
    let gn = gauss_newton_inner(&log_probs, &t, &t).unwrap();

    let loss_at = |model: &mut FcNet| {
        let out = model.forward(&images).unwrap();
        f64::from(nll_loss(&out, &labels, Reduction::Mean).unwrap().number().unwrap())
    };
    let eps = 0.05;
    let l0 = loss_at(&mut model);
    shift(&mut model, &directions, eps);
    let lp = loss_at(&mut model);
    shift(&mut model, &directions, -2.0 * eps);
    let lm = loss_at(&mut model);
    let second = (lp - 2.0 * l0 + lm) / f64::from(eps * eps);
    assert_abs_diff_eq!(second, gn, epsilon = 0.05 * gn.abs() + 1e-3);
}
