use rand::SeedableRng;
use rand::rngs::StdRng;

use feedforward::{
    Activation, Dataset, FitConfig, Init, Layer, Loss, Matrix, Network, NetworkBuilder, Shuffle,
    compute_loss, idx,
};

#[test]
fn two_layer_all_ones_network_output_is_pinned() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut net = Network::new(0.01).unwrap();
    for (i, o) in [(2, 3), (3, 1)] {
        let layer = Layer::with_init(i, o, Activation::ReLU, Init::Constant(1.0), &mut rng).unwrap();
        net.add_layer(layer).unwrap();
    }

    let x = Matrix::from_rows(&[vec![1.0], vec![1.0]]).unwrap();
    let out = net.forward_pass(&x);
    assert_eq!(out, Matrix::from_rows(&[vec![10.0]]).unwrap());
}

#[test]
fn linear_regression_loss_decreases() {
    // 1 -> 1 ReLU layer; pre-activations stay positive so it behaves linearly.
    let w = Matrix::filled(1, 1, 1.0);
    let b = Matrix::filled(1, 1, 1.0);
    let mut net = Network::new(0.01).unwrap();
    net.add_layer(Layer::from_parts(w, b, Activation::ReLU).unwrap())
        .unwrap();

    let xs: Vec<f64> = (1..=5).map(f64::from).collect();
    let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x + 4.0).collect();
    let x = Matrix::from_vec(1, 5, xs).unwrap();
    let y = Matrix::from_vec(1, 5, ys).unwrap();

    let mut losses = Vec::new();
    for _ in 0..2_000 {
        losses.push(net.train_step(&x, &y, Loss::L2));
    }

    for pair in losses.windows(2) {
        assert!(pair[1] <= pair[0], "loss went up: {} -> {}", pair[0], pair[1]);
    }
    let first = losses[0];
    let last = *losses.last().unwrap();
    assert!(last < first * 0.05, "first={first} last={last}");

    let layer = &net.layers()[0];
    assert!((layer.weights()[(0, 0)] - 2.0).abs() < 0.5);
}

#[test]
fn compute_loss_by_name() {
    let pred = Matrix::from_rows(&[vec![0.25], vec![0.75]]).unwrap();
    let target = Matrix::from_rows(&[vec![0.0], vec![1.0]]).unwrap();

    let l2 = compute_loss("l2", &pred, &target).unwrap();
    assert!((l2 - 0.0625).abs() < 1e-12);

    let ce = compute_loss("crossEntropy", &pred, &target).unwrap();
    assert!((ce + 0.75_f64.ln()).abs() < 1e-12);

    assert!(compute_loss("huber", &pred, &target).is_err());
}

#[test]
fn idx_files_train_a_classifier() {
    // Four 2x2 "images": bright top row = class 0, bright bottom row = class 1.
    let pixels: Vec<u8> = vec![
        255, 255, 0, 0, //
        0, 0, 255, 255, //
        200, 230, 10, 0, //
        5, 0, 240, 210,
    ];
    let mut image_bytes = Vec::new();
    for v in [idx::IMAGES_MAGIC, 4, 2, 2] {
        image_bytes.extend_from_slice(&v.to_be_bytes());
    }
    image_bytes.extend_from_slice(&pixels);

    let mut label_bytes = Vec::new();
    for v in [idx::LABELS_MAGIC, 4] {
        label_bytes.extend_from_slice(&v.to_be_bytes());
    }
    label_bytes.extend_from_slice(&[0, 1, 0, 1]);

    let dir = std::env::temp_dir().join(format!("feedforward-idx-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let images_path = dir.join("images-idx3-ubyte");
    let labels_path = dir.join("labels-idx1-ubyte");
    std::fs::write(&images_path, &image_bytes).unwrap();
    std::fs::write(&labels_path, &label_bytes).unwrap();

    let images = idx::read_images(&images_path).unwrap();
    let labels = idx::read_labels(&labels_path).unwrap();
    std::fs::remove_dir_all(&dir).unwrap();

    let data = Dataset::from_idx(&images, &labels, 2).unwrap();
    assert_eq!(data.input_features(), 4);

    let mut net = NetworkBuilder::new(4)
        .unwrap()
        .learning_rate(0.5)
        .unwrap()
        .add_layer(8, Activation::ReLU)
        .unwrap()
        .add_layer(2, Activation::Softmax)
        .unwrap()
        .build_with_seed(1)
        .unwrap();

    let report = net
        .fit(
            &data,
            FitConfig {
                epochs: 200,
                batch_size: 2,
                shuffle: Shuffle::Seeded(3),
                loss: Loss::CrossEntropy,
            },
        )
        .unwrap();
    assert!(report.final_loss() < report.epoch_losses[0]);

    let eval = net.evaluate(&data, Loss::CrossEntropy).unwrap();
    assert_eq!(eval.accuracy, 1.0);
}
