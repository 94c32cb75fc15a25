//! Full-batch training loop with periodic validation and early stopping.

use super::decoder::BernoulliPoissonDecoder;
use super::model::{GraphContext, GraphConvNet, Gradients};
use ndarray::{Array, Dimension};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub hidden_size: usize,
    pub weight_decay: f64,
    pub learning_rate: f64,
    pub max_epochs: usize,
    pub validation_interval: usize,
    /// Validations without improvement before stopping.
    pub patience: usize,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            hidden_size: 128,
            weight_decay: 1e-2,
            learning_rate: 1e-3,
            max_epochs: 500,
            validation_interval: 25,
            patience: 10,
            seed: 42,
        }
    }
}

/// Outcome of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub epochs_run: usize,
    pub stopped_early: bool,
    pub best_validation_loss: f64,
    /// Epoch whose parameters were kept.
    pub best_epoch: usize,
}

/// Stops once `patience` consecutive validations fail to beat the best loss.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    steps: usize,
    best_step: usize,
    best: f64,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            steps: 0,
            best_step: 0,
            best: f64::INFINITY,
        }
    }

    /// Record a validation loss.
    pub fn observe(&mut self, loss: f64) {
        self.steps += 1;
        if loss < self.best {
            self.best = loss;
            self.best_step = self.steps;
        }
    }

    /// The latest observation is the best so far.
    pub fn should_save(&self) -> bool {
        self.best_step == self.steps
    }

    pub fn should_stop(&self) -> bool {
        self.steps - self.best_step >= self.patience
    }

    pub fn best(&self) -> f64 {
        self.best
    }
}

/// Adam optimiser state for one parameter tensor.
#[derive(Debug, Clone)]
struct Moments<D: Dimension> {
    first: Array<f64, D>,
    second: Array<f64, D>,
}

impl<D: Dimension> Moments<D> {
    fn like(param: &Array<f64, D>) -> Self {
        Self {
            first: Array::zeros(param.raw_dim()),
            second: Array::zeros(param.raw_dim()),
        }
    }

    fn step(&mut self, param: &mut Array<f64, D>, grad: &Array<f64, D>, adam: &Adam) {
        const BETA1: f64 = 0.9;
        const BETA2: f64 = 0.999;
        const EPSILON: f64 = 1e-8;

        self.first.zip_mut_with(grad, |m, &g| *m = BETA1 * *m + (1.0 - BETA1) * g);
        self.second
            .zip_mut_with(grad, |v, &g| *v = BETA2 * *v + (1.0 - BETA2) * g * g);
        let t = adam.step as i32;
        let first_correction = 1.0 - BETA1.powi(t);
        let second_correction = 1.0 - BETA2.powi(t);
        ndarray::Zip::from(param)
            .and(&self.first)
            .and(&self.second)
            .for_each(|p, &m, &v| {
                let m_hat = m / first_correction;
                let v_hat = v / second_correction;
                *p -= adam.learning_rate * m_hat / (v_hat.sqrt() + EPSILON);
            });
    }
}

#[derive(Debug, Clone)]
struct Adam {
    learning_rate: f64,
    step: usize,
}

struct Optimizer {
    adam: Adam,
    w1: Moments<ndarray::Ix2>,
    b1: Moments<ndarray::Ix1>,
    w2: Moments<ndarray::Ix2>,
    b2: Moments<ndarray::Ix1>,
}

impl Optimizer {
    fn new(net: &GraphConvNet, learning_rate: f64) -> Self {
        Self {
            adam: Adam {
                learning_rate,
                step: 0,
            },
            w1: Moments::like(&net.w1),
            b1: Moments::like(&net.b1),
            w2: Moments::like(&net.w2),
            b2: Moments::like(&net.b2),
        }
    }

    fn apply(&mut self, net: &mut GraphConvNet, gradients: &Gradients) {
        self.adam.step += 1;
        self.w1.step(&mut net.w1, &gradients.w1, &self.adam);
        self.b1.step(&mut net.b1, &gradients.b1, &self.adam);
        self.w2.step(&mut net.w2, &gradients.w2, &self.adam);
        self.b2.step(&mut net.b2, &gradients.b2, &self.adam);
    }
}

/// Train a network reconstructing the adjacency behind `context`.
///
/// Validation runs every `validation_interval` epochs starting at epoch 0.
/// The parameters of the best validation are returned whether training hit
/// `max_epochs` or stopped early.
pub fn train(
    context: &GraphContext,
    decoder: &BernoulliPoissonDecoder,
    n_groups: usize,
    config: &TrainingConfig,
) -> (GraphConvNet, TrainingReport) {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut net = GraphConvNet::new(
        context.propagated_features.ncols(),
        config.hidden_size,
        n_groups,
        &mut rng,
    );
    let mut optimizer = Optimizer::new(&net, config.learning_rate);
    let mut stopping = EarlyStopping::new(config.patience);
    let mut best = (net.clone(), 0);
    let mut stopped_early = false;
    let mut epochs_run = 0;
    let interval = config.validation_interval.max(1);

    for epoch in 0..=config.max_epochs {
        if epoch % interval == 0 {
            let validation_loss = decoder.loss(&net.forward(context).output);
            stopping.observe(validation_loss);
            tracing::debug!(epoch, validation_loss, "validation");
            if stopping.should_save() {
                best = (net.clone(), epoch);
            }
            if stopping.should_stop() {
                tracing::info!(epoch, "early stopping");
                stopped_early = true;
                break;
            }
        }

        let pass = net.forward(context);
        let (_, output_gradient) = decoder.loss_and_gradient(&pass.output);
        let gradients = net.backward(context, &pass, &output_gradient, config.weight_decay);
        optimizer.apply(&mut net, &gradients);
        epochs_run = epoch + 1;
    }

    let (best_net, best_epoch) = best;
    let report = TrainingReport {
        epochs_run,
        stopped_early,
        best_validation_loss: stopping.best(),
        best_epoch,
    };
    (best_net, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_early_stopping_counts_validations() {
        let mut stopping = EarlyStopping::new(2);
        stopping.observe(1.0);
        assert!(stopping.should_save());
        stopping.observe(0.5);
        assert!(stopping.should_save());
        stopping.observe(0.5);
        assert!(!stopping.should_save());
        assert!(!stopping.should_stop());
        stopping.observe(0.7);
        assert!(stopping.should_stop());
        assert_eq!(stopping.best(), 0.5);
    }

    fn two_pairs() -> (GraphContext, BernoulliPoissonDecoder) {
        let adjacency = array![
            [0.0, 1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
            [0.0, 0.0, 1.0, 0.0],
        ];
        let features = array![[1.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 1.0]];
        (
            GraphContext::new(&adjacency, &features),
            BernoulliPoissonDecoder::new(&adjacency),
        )
    }

    #[test]
    fn test_training_keeps_best_validation() {
        let (context, decoder) = two_pairs();
        let config = TrainingConfig {
            hidden_size: 16,
            learning_rate: 1e-2,
            max_epochs: 200,
            validation_interval: 10,
            ..TrainingConfig::default()
        };
        let (net, report) = train(&context, &decoder, 2, &config);
        let initial = {
            let mut rng = StdRng::seed_from_u64(config.seed);
            let net = GraphConvNet::new(2, 16, 2, &mut rng);
            decoder.loss(&net.forward(&context).output)
        };

        assert!(report.best_validation_loss <= initial);
        assert_eq!(report.best_epoch % 10, 0);
        let kept = decoder.loss(&net.forward(&context).output);
        assert!((kept - report.best_validation_loss).abs() < 1e-12);
    }

    #[test]
    fn test_zero_patience_stops_at_first_validation() {
        let (context, decoder) = two_pairs();
        let config = TrainingConfig {
            hidden_size: 4,
            patience: 0,
            ..TrainingConfig::default()
        };
        let (_, report) = train(&context, &decoder, 2, &config);
        assert!(report.stopped_early);
        assert_eq!(report.epochs_run, 0);
        assert_eq!(report.best_epoch, 0);
    }
}
