use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use feedforward::{
    Activation, Dataset, FitConfig, Loss, Matrix, NetworkBuilder, Result, Shuffle, idx,
};

#[derive(Parser)]
#[command(name = "feedforward")]
#[command(about = "Train small dense feed-forward networks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit y = 2x + 4 with a 1 -> 2 -> 1 ReLU network
    Regression {
        #[arg(long, default_value_t = 200)]
        steps: usize,
        #[arg(long, default_value_t = 0.01)]
        lr: f64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Train a 784 -> hidden -> 10 softmax classifier on MNIST IDX files
    Mnist {
        /// Directory holding the four `*-idx?-ubyte` files
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
        #[arg(long, default_value_t = 5)]
        epochs: usize,
        #[arg(long, default_value_t = 32)]
        batch_size: usize,
        #[arg(long, default_value_t = 0.1)]
        lr: f64,
        #[arg(long, default_value_t = 128)]
        hidden: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Only use the first N training samples
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Regression { steps, lr, seed } => run_regression(steps, lr, seed),
        Commands::Mnist {
            data_dir,
            epochs,
            batch_size,
            lr,
            hidden,
            seed,
            limit,
        } => run_mnist(
            &data_dir,
            FitConfig {
                epochs,
                batch_size,
                shuffle: Shuffle::Seeded(seed),
                loss: Loss::CrossEntropy,
            },
            lr,
            hidden,
            seed,
            limit,
        ),
    }
}

fn run_regression(steps: usize, lr: f64, seed: u64) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut net = NetworkBuilder::new(1)?
        .learning_rate(lr)?
        .add_layer(2, Activation::ReLU)?
        .add_layer(1, Activation::ReLU)?
        .build_with_rng(&mut rng)?;

    let batch = 5;
    let xs: Vec<f64> = (1..=batch).map(|i| i as f64).collect();
    let ys: Vec<f64> = xs
        .iter()
        .map(|x| 2.0 * x + 4.0 + rng.gen_range(-0.01..0.01))
        .collect();
    let x = Matrix::from_vec(1, batch, xs)?;
    let y = Matrix::from_vec(1, batch, ys)?;

    let start = Instant::now();
    for step in 0..steps {
        let cost = net.train_step(&x, &y, Loss::L2);
        if step % 20 == 0 || step + 1 == steps {
            info!("step {step}: cost={cost:.6}");
        }
    }

    let output = net.predict(&x);
    for c in 0..batch {
        println!(
            "x={:.1} predicted={:.4} actual={:.4}",
            x[(0, c)],
            output[(0, c)],
            y[(0, c)]
        );
    }
    info!("trained in {:.3}s", start.elapsed().as_secs_f64());
    net.release();
    Ok(())
}

fn run_mnist(
    data_dir: &std::path::Path,
    cfg: FitConfig,
    lr: f64,
    hidden: usize,
    seed: u64,
    limit: Option<usize>,
) -> Result<()> {
    let load = |images: &str, labels: &str| -> Result<Dataset> {
        let images = idx::read_images(data_dir.join(images))?;
        let labels = idx::read_labels(data_dir.join(labels))?;
        Dataset::from_idx(&images, &labels, 10)
    };

    let mut train = load("train-images-idx3-ubyte", "train-labels-idx1-ubyte")?;
    if let Some(n) = limit {
        train = train.truncate(n);
    }
    let test = load("t10k-images-idx3-ubyte", "t10k-labels-idx1-ubyte")?;
    info!(
        "loaded {} training and {} test samples",
        train.len(),
        test.len()
    );

    let mut net = NetworkBuilder::new(train.input_features())?
        .learning_rate(lr)?
        .add_layer(hidden, Activation::ReLU)?
        .add_layer(10, Activation::Softmax)?
        .build_with_seed(seed)?;

    let start = Instant::now();
    let report = net.fit(&train, cfg)?;
    info!(
        "trained {} epochs in {:.1}s, final loss {:.4}",
        cfg.epochs,
        start.elapsed().as_secs_f64(),
        report.final_loss()
    );

    let eval = net.evaluate(&test, Loss::CrossEntropy)?;
    println!(
        "test loss={:.4} accuracy={:.2}%",
        eval.loss,
        eval.accuracy * 100.0
    );
    Ok(())
}
