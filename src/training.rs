//! 学習ドライバ。
//!
//! 組み立て済みのモデルハンドルをオプティマイザ設定でコンパイルし、
//! 指定回数の反復で複合損失（残差 + 制約、項別重み付き）を最小化します。
//! 学習後はデータセットの末尾時刻スライスで一度だけ予測を行い、
//! 生出力の先頭 `n_components` 成分に制限したうえで `[時刻, 空間, 成分]`
//! のテンソルへ戻します。
//!
//! 推論時間は単一のバッチ呼び出しの実時間をサンプル数で割った近似値で、
//! 個別サンプルの分離レイテンシではありません。

use std::time::{Duration, Instant};

use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer, SgdConfig};
use burn::prelude::*;
use burn::tensor::ElementConversion;
use burn::tensor::backend::AutodiffBackend;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::{OptimizerKind, TrainConfig};
use crate::constraint::Constraint;
use crate::dataset::{SolutionDataset, rows_to_tensor};
use crate::error::PinnResult;
use crate::model::Fnn;
use crate::pinn::PdeResidual;
use crate::scenario::ModelHandle;

/// 検証損失の評価に使うコロケーション点の数。
pub const NUM_VALIDATION: usize = 500;
/// 評価に使う末尾時刻ステップ数。
pub const N_LAST_TIME_STEPS: usize = 20;

/// 記録された損失の履歴。
#[derive(Debug, Clone, Default)]
pub struct LossHistory {
    pub steps: Vec<usize>,
    pub train: Vec<f32>,
    pub valid: Vec<f32>,
}

/// 学習の進行を観測するコールバック。
pub trait TrainingCallback {
    /// 損失が記録されるたびに呼ばれます。
    fn on_record(&mut self, epoch: usize, train_loss: f32, val_loss: f32);
}

/// 1フォールドの学習・評価結果。
pub struct FoldOutcome<B: AutodiffBackend> {
    pub val_loss: f32,
    pub prediction: Tensor<B::InnerBackend, 3>,
    pub ground_truth: Tensor<B::InnerBackend, 3>,
    pub history: LossHistory,
    pub network: Fnn<B>,
    pub mean_inference_duration: Duration,
}

/// オプティマイザ設定と損失重みを解決したコンパイル済みモデル。
pub struct Compiled<B: AutodiffBackend> {
    handle: ModelHandle<B>,
    loss_weights: Vec<f32>,
    base_lr: f64,
    validation_points: Tensor<B, 2>,
}

/// モデルハンドルを学習可能な状態にします。
///
/// 損失重みの長さを検証し、検証損失用のコロケーション点を確保します。
pub fn compile<B: AutodiffBackend>(
    handle: ModelHandle<B>,
    config: &TrainConfig,
    learning_rate: f64,
    seed: u64,
    device: &B::Device,
) -> PinnResult<Compiled<B>> {
    let n_terms = 1 + handle.constraints.len();
    let loss_weights = config.resolve_loss_weights(n_terms)?;
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    let validation_points = rows_to_tensor(
        &handle.geomtime.sample_interior(NUM_VALIDATION, &mut rng),
        handle.geomtime.input_dim(),
        device,
    );
    Ok(Compiled {
        handle,
        loss_weights,
        base_lr: learning_rate,
        validation_points,
    })
}

/// 学習を実行し、末尾時刻スライスで評価します。
pub fn train<B: AutodiffBackend>(
    compiled: Compiled<B>,
    config: &TrainConfig,
    epochs: usize,
    display_every: usize,
    dataset: &SolutionDataset,
    callbacks: &mut [Box<dyn TrainingCallback>],
    device: &B::Device,
) -> PinnResult<FoldOutcome<B>> {
    match config.optimizer {
        OptimizerKind::Adam => train_loop(
            compiled,
            AdamConfig::new().init(),
            config,
            epochs,
            display_every,
            dataset,
            callbacks,
            device,
        ),
        OptimizerKind::Sgd => train_loop(
            compiled,
            SgdConfig::new().init(),
            config,
            epochs,
            display_every,
            dataset,
            callbacks,
            device,
        ),
    }
}

fn train_loop<B, O>(
    compiled: Compiled<B>,
    mut optim: O,
    config: &TrainConfig,
    epochs: usize,
    display_every: usize,
    dataset: &SolutionDataset,
    callbacks: &mut [Box<dyn TrainingCallback>],
    device: &B::Device,
) -> PinnResult<FoldOutcome<B>>
where
    B: AutodiffBackend,
    O: Optimizer<Fnn<B>, B>,
{
    let Compiled {
        handle,
        loss_weights,
        base_lr,
        validation_points,
    } = compiled;
    let n_components = handle.n_components;
    let display_every = display_every.max(1);

    let mut model = handle.network;
    let mut history = LossHistory::default();
    let mut val_loss = f32::NAN;
    let training_start = Instant::now();

    for epoch in 1..=epochs {
        let total_loss = composite_loss(
            &model,
            &handle.residual,
            &handle.constraints,
            &handle.collocation,
            &loss_weights,
        );

        if epoch % display_every == 0 || epoch == epochs {
            let train_val: f32 = total_loss.clone().into_scalar().elem();
            let valid = composite_loss(
                &model,
                &handle.residual,
                &handle.constraints,
                &validation_points,
                &loss_weights,
            );
            val_loss = valid.into_scalar().elem();
            history.steps.push(epoch);
            history.train.push(train_val);
            history.valid.push(val_loss);
            for callback in callbacks.iter_mut() {
                callback.on_record(epoch, train_val, val_loss);
            }
            println!(
                "[Epoch {}] Total Loss: {:.6}, Validation Loss: {:.6}",
                epoch, train_val, val_loss
            );
        }

        let lr = config.learning_rate(base_lr, epoch - 1);
        let grads = total_loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(lr, model, grads);
    }
    tracing::info!("学習が完了しました: {:.2?}", training_start.elapsed());

    // 末尾時刻スライスでの一括評価
    let (test_inputs, test_targets) = dataset.test_data(N_LAST_TIME_STEPS, n_components)?;
    let test_input_tensor =
        rows_to_tensor::<B::InnerBackend>(&test_inputs, dataset.input_dim(), device);
    let n_samples = test_input_tensor.dims()[0];
    let model_valid = model.valid();

    let inference_start = Instant::now();
    let raw_pred = model_valid.forward(test_input_tensor);
    // 生出力が評価対象より多い場合は先頭成分へ切り詰める
    let pred = raw_pred.slice([0..n_samples, 0..n_components]);
    let elapsed = inference_start.elapsed();
    let mean_inference_duration = elapsed / n_samples.max(1) as u32;

    let prediction = dataset.unravel(pred, N_LAST_TIME_STEPS, n_components)?;
    let gt_tensor = rows_to_tensor::<B::InnerBackend>(&test_targets, n_components, device);
    let ground_truth = dataset.unravel(gt_tensor, N_LAST_TIME_STEPS, n_components)?;

    Ok(FoldOutcome {
        val_loss,
        prediction,
        ground_truth,
        history,
        network: model,
        mean_inference_duration,
    })
}

/// 残差損失と各制約損失の重み付き和。
fn composite_loss<B: AutodiffBackend>(
    model: &Fnn<B>,
    residual: &PdeResidual,
    constraints: &[Constraint<B>],
    collocation: &Tensor<B, 2>,
    weights: &[f32],
) -> Tensor<B, 1> {
    let mut total = residual.loss(model, collocation).mul_scalar(weights[0]);
    for (constraint, weight) in constraints.iter().zip(&weights[1..]) {
        total = total + constraint.loss(model).mul_scalar(*weight);
    }
    total
}
