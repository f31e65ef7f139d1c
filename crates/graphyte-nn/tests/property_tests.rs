//! Property-based tests for graphyte-nn.
//!
//! - Layer outputs are unit vectors for every aggregated node
//! - Clipped gradients never exceed the clip norm
//! - AUC is bounded and flips under label inversion
//! - Loss is non-negative

use graphyte_core::{Features, Graph};
use graphyte_nn::evaluation::roc_auc;
use graphyte_nn::loss::{negative_sampling_loss, LossParams};
use graphyte_nn::optim::{clip_by_norm, frobenius_norm};
use graphyte_nn::{SageLayer, TrainingConfig};
use ndarray::Array2;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const NODES: usize = 10;

fn arb_graph() -> impl Strategy<Value = Graph> {
    prop::collection::vec((0..NODES, 0..NODES), 0..30).prop_map(|edges| Graph::from_edges(&edges))
}

fn arb_features() -> impl Strategy<Value = Features> {
    (1usize..6).prop_flat_map(|d| {
        prop::collection::vec(-5.0f32..5.0, d * NODES).prop_map(move |values| {
            Features::from_array(Array2::from_shape_vec((d, NODES), values).unwrap())
        })
    })
}

mod layer_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn forward_outputs_unit_norm(
            pos in arb_graph(),
            neg in arb_graph(),
            features in arb_features(),
            seed in any::<u64>(),
        ) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let config = TrainingConfig::default();
            let mut layer = SageLayer::new(&pos, &neg, features.dim(), &config, &mut rng).unwrap();
            let out = layer.forward(&features).unwrap();

            for (graph, emb) in [(&pos, &out.pos), (&neg, &out.neg)] {
                for v in 0..NODES {
                    let norm = emb.node(v).dot(&emb.node(v)).sqrt();
                    if graph.neighbors(v).is_empty() {
                        prop_assert_eq!(norm, 0.0);
                    } else {
                        prop_assert!((norm - 1.0).abs() < 1e-4, "node {} norm {}", v, norm);
                    }
                }
            }
        }

        #[test]
        fn loss_non_negative(
            pos in arb_graph(),
            neg in arb_graph(),
            features in arb_features(),
        ) {
            let loss = negative_sampling_loss(&pos, &neg, &features, &features, LossParams::default());
            prop_assert!(loss.is_finite());
            prop_assert!(loss >= 0.0);
        }
    }
}

mod optim_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn clipped_norm_bounded(
            values in prop::collection::vec(-100.0f32..100.0, 12),
            max_norm in 0.1f32..20.0,
        ) {
            let mut grad = Array2::from_shape_vec((3, 4), values).unwrap();
            let before = frobenius_norm(&grad);
            let reported = clip_by_norm(&mut grad, max_norm);
            prop_assert!((reported - before).abs() <= 1e-3 * before.max(1.0));
            prop_assert!(frobenius_norm(&grad) <= max_norm * (1.0 + 1e-4) + 1e-6);
        }
    }
}

mod auc_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn auc_bounded_and_flips(
            scored in prop::collection::vec((-1.0f32..1.0, any::<bool>()), 2..40),
        ) {
            let auc = roc_auc(&scored);
            prop_assert!((0.0..=1.0).contains(&auc));

            let has_both = scored.iter().any(|(_, p)| *p) && scored.iter().any(|(_, p)| !*p);
            if has_both {
                let flipped: Vec<(f32, bool)> = scored.iter().map(|&(s, p)| (s, !p)).collect();
                prop_assert!((auc + roc_auc(&flipped) - 1.0).abs() < 1e-9);
            }
        }
    }
}

#[test]
fn auc_random_scores_average_half() {
    use rand::Rng;

    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let trials = 200;
    let mut total = 0.0;
    for _ in 0..trials {
        let scored: Vec<(f32, bool)> = (0..100)
            .map(|i| (rng.gen::<f32>(), i % 2 == 0))
            .collect();
        total += roc_auc(&scored);
    }
    let mean = total / trials as f64;
    assert!((mean - 0.5).abs() < 0.03, "mean AUC {mean}");
}

#[test]
fn auc_separated_scores_is_one() {
    let mut scored: Vec<(f32, bool)> = (0..20).map(|i| (1.0 + i as f32, true)).collect();
    scored.extend((0..30).map(|i| (-(i as f32), false)));
    assert_eq!(roc_auc(&scored), 1.0);
}
