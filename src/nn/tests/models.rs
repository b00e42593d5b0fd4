/*
 * @Date         : 2026-10-15
 * @Description  : FcNet / Cnn 模型与 ModelKind 单元测试
 */

use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::errors::AutoOptError;
use crate::nn::{Cnn, FcNet, Model, ModelKind, Network, Reduction, nll_loss, nll_loss_backward};
use crate::tensor::Tensor;

fn batch(n: usize, seed: u64) -> (Tensor, Tensor) {
    let mut rng = StdRng::seed_from_u64(seed);
    let images = Tensor::new_uniform(-0.5, 2.5, &[n, 1, 28, 28], &mut rng);
    let labels = Tensor::from_vec((0..n).map(|i| (i % 10) as f32).collect(), &[n]);
    (images, labels)
}

#[test]
fn test_model_kind_parse() {
    assert_eq!("fc".parse::<ModelKind>().unwrap(), ModelKind::Fc);
    assert_eq!("cnn".parse::<ModelKind>().unwrap(), ModelKind::Cnn);
    assert_eq!(ModelKind::Cnn.to_string(), "cnn");
    assert!(matches!(
        "rnn".parse::<ModelKind>(),
        Err(AutoOptError::UnknownModel(name)) if name == "rnn"
    ));
}

#[test]
fn test_fc_net_structure() {
    let mut rng = StdRng::seed_from_u64(0);
    let model = FcNet::new(&mut rng);
    let names: Vec<_> = model.parameters().iter().map(|p| p.name().to_string()).collect();
    assert_eq!(
        names,
        ["fc_0.weight", "fc_0.bias", "fc_1.weight", "fc_1.bias", "fc_2.weight", "fc_2.bias"]
    );
    assert_eq!(model.num_params(), 784 * 320 + 320 + 320 * 50 + 50 + 50 * 10 + 10);
}

#[test]
fn test_cnn_structure() {
    let mut rng = StdRng::seed_from_u64(0);
    let model = Cnn::new(&mut rng);
    let shapes: Vec<_> = model.parameters().iter().map(|p| p.shape().to_vec()).collect();
    assert_eq!(
        shapes,
        vec![
            vec![10, 1, 5, 5],
            vec![10],
            vec![20, 10, 5, 5],
            vec![20],
            vec![50, 320],
            vec![50],
            vec![10, 50],
            vec![10],
        ]
    );
    assert_eq!(model.num_params(), 260 + 5020 + 16050 + 510);
}

#[test]
fn test_models_output_log_probabilities() {
    let (images, _) = batch(3, 1);
    for kind in ModelKind::ALL {
        let mut model = kind.build(&mut StdRng::seed_from_u64(2));
        model.eval();
        let out = model.forward(&images).unwrap();
        assert_eq!(out.shape(), &[3, 10], "{kind}");
        for row in out.to_vec().chunks(10) {
            let total: f32 = row.iter().map(|v| v.exp()).sum();
            assert_abs_diff_eq!(total, 1.0, epsilon = 1e-4);
        }
    }
}

#[test]
fn test_mode_switches() {
    let mut model: Model = FcNet::new(&mut StdRng::seed_from_u64(0)).into();
    assert!(model.is_training());
    model.set_curvature_tracking(true);
    model.eval();
    assert!(!model.is_training());
    assert!(model.mode().track_curvature);
    model.train();
    assert!(model.is_training());
}

#[test]
fn test_cnn_eval_is_deterministic() {
    let (images, _) = batch(2, 4);
    let mut model = ModelKind::Cnn.build(&mut StdRng::seed_from_u64(9));
    model.eval();
    let a = model.forward(&images).unwrap();
    let b = model.forward(&images).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_backward_fills_grad_and_curvature() {
    let (images, labels) = batch(4, 5);
    for kind in ModelKind::ALL {
        let mut model = kind.build(&mut StdRng::seed_from_u64(6));
        model.train();
        model.set_curvature_tracking(true);
        let out = model.forward(&images).unwrap();
        let grad = nll_loss_backward(&out, &labels).unwrap();
        model.backward(&grad).unwrap();
        for p in model.parameters() {
            assert_eq!(p.grad().unwrap().shape(), p.shape(), "{}", p.name());
            let curvature = p.curvature().unwrap();
            assert!(curvature.iter().all(|&c| c >= 0.0), "{}", p.name());
        }

        model.zero_grad();
        model.set_curvature_tracking(false);
        let out = model.forward(&images).unwrap();
        model.backward(&nll_loss_backward(&out, &labels).unwrap()).unwrap();
        assert!(model.parameters().iter().all(|p| p.curvature().is_none()));
    }
}

/// 对平均 NLL 做有限差分，检查整条反向链路
#[test]
fn test_fc_net_gradient_matches_finite_difference() {
    let (images, labels) = batch(4, 8);
    let mut model = FcNet::new(&mut StdRng::seed_from_u64(10));
    let out = model.forward(&images).unwrap();
    model.backward(&nll_loss_backward(&out, &labels).unwrap()).unwrap();

    let mean_loss = |model: &mut FcNet| {
        let out = model.forward(&images).unwrap();
        f64::from(nll_loss(&out, &labels, Reduction::Mean).unwrap().number().unwrap())
    };
    let eps = 1e-3f32;

    for (param_idx, elem) in [(5, [3]), (3, [7]), (1, [100])] {
        let (value, analytic) = {
            let p = model.parameters()[param_idx];
            (p.value().clone(), p.grad().unwrap()[elem])
        };
        let mut plus = value.clone();
        plus[elem] += eps;
        let mut minus = value.clone();
        minus[elem] -= eps;

        model.parameters_mut()[param_idx].set_value(plus);
        let lp = mean_loss(&mut model);
        model.parameters_mut()[param_idx].set_value(minus);
        let lm = mean_loss(&mut model);
        model.parameters_mut()[param_idx].set_value(value);

        let numeric = (lp - lm) / (2.0 * f64::from(eps));
        assert_abs_diff_eq!(numeric, f64::from(analytic), epsilon = 2e-3);
    }
}
