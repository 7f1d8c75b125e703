//! 実行オーケストレータ。
//!
//! シナリオ識別子で分岐して学習ドライバを1回または複数フォールド実行し、
//! 誤差指標を集約して一様な結果にまとめます。フォールド内のどの失敗も
//! 実行全体を中断します（部分結果は返しません）。
//!
//! 複数フォールドでは予測と正解を新しい先頭軸で積み上げますが、誤差指標は
//! 最後に処理したフォールドの組だけで計算します（DESIGN.md 参照）。

use std::path::Path;
use std::time::Duration;

use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use ndarray::ArrayD;

use crate::config::TrainConfig;
use crate::error::PinnResult;
use crate::metrics::{hstack_errors, metric_func, stack_errors};
use crate::model::Fnn;
use crate::scenario::{BuildArgs, Scenario, build_scenario};
use crate::training::{FoldOutcome, LossHistory, TrainingCallback, compile, train};

/// 実行への入力一式。
#[derive(Debug)]
pub struct RunArgs<'a> {
    /// シナリオ識別子（例: "diff-react", "pde1D"）
    pub scenario: &'a str,
    pub epochs: usize,
    pub learning_rate: f64,
    /// 損失を記録・表示する反復間隔
    pub display_every: usize,
    pub filename: &'a str,
    pub config: TrainConfig,
    pub input_ch: usize,
    pub output_ch: usize,
    pub root_path: &'a Path,
    /// 検証フォールド数。1なら単一実行
    pub val_num: usize,
    pub if_periodic_bc: bool,
    pub aux_params: Vec<f32>,
    pub x_left: f32,
    pub x_right: f32,
    pub seed: u64,
}

/// 複数フォールドで積み上げた予測と正解。
pub struct FoldStack<B: AutodiffBackend> {
    pub prediction: Tensor<B::InnerBackend, 4>,
    pub ground_truth: Tensor<B::InnerBackend, 4>,
}

/// 一様な実行結果。
pub struct RunOutput<B: AutodiffBackend> {
    pub val_loss: f32,
    /// 単一実行では `[成分数 × 指標数]` の1次元、複数フォールドでは
    /// `[指標数, 成分数]` の2次元
    pub errors: ArrayD<f32>,
    pub history: LossHistory,
    pub network: Fnn<B>,
    pub mean_inference_duration: Duration,
    /// 複数フォールド実行でのみ Some
    pub stack: Option<FoldStack<B>>,
}

/// 学習実行のトップレベル入口。
pub fn run_training<B: AutodiffBackend>(
    args: &RunArgs<'_>,
    callbacks: &mut [Box<dyn TrainingCallback>],
    device: &B::Device,
) -> PinnResult<RunOutput<B>> {
    let scenario = Scenario::parse(args.scenario)?;

    if args.val_num == 1 {
        let outcome = run_fold::<B>(scenario, args, -1, callbacks, device)?;
        let errors = hstack_errors(&metric_func(&outcome.prediction, &outcome.ground_truth)?);
        Ok(RunOutput {
            val_loss: outcome.val_loss,
            errors,
            history: outcome.history,
            network: outcome.network,
            mean_inference_duration: outcome.mean_inference_duration,
            stack: None,
        })
    } else {
        let mut predictions = Vec::new();
        let mut targets = Vec::new();
        let mut last: Option<FoldOutcome<B>> = None;
        for fold in 1..args.val_num {
            let val_batch_idx = -(fold as i64);
            tracing::info!("フォールド {} (バッチ {}) を実行します", fold, val_batch_idx);
            let outcome = run_fold::<B>(scenario, args, val_batch_idx, callbacks, device)?;
            predictions.push(outcome.prediction.clone().unsqueeze::<4>());
            targets.push(outcome.ground_truth.clone().unsqueeze::<4>());
            last = Some(outcome);
        }
        let last = last.expect("val_num > 1 なら少なくとも1フォールド実行される");

        let stack = FoldStack {
            prediction: Tensor::cat(predictions, 0),
            ground_truth: Tensor::cat(targets, 0),
        };
        // 指標は最終フォールドのみで計算する（DESIGN.md 参照）
        let errors = stack_errors(&metric_func(&last.prediction, &last.ground_truth)?)?;
        Ok(RunOutput {
            val_loss: last.val_loss,
            errors,
            history: last.history,
            network: last.network,
            mean_inference_duration: last.mean_inference_duration,
            stack: Some(stack),
        })
    }
}

fn run_fold<B: AutodiffBackend>(
    scenario: Scenario,
    args: &RunArgs<'_>,
    val_batch_idx: i64,
    callbacks: &mut [Box<dyn TrainingCallback>],
    device: &B::Device,
) -> PinnResult<FoldOutcome<B>> {
    let build_args = BuildArgs {
        scenario,
        filename: args.filename,
        root_path: args.root_path,
        val_batch_idx,
        config: &args.config,
        input_ch: args.input_ch,
        output_ch: args.output_ch,
        x_left: args.x_left,
        x_right: args.x_right,
        if_periodic_bc: args.if_periodic_bc,
        aux_params: &args.aux_params,
        seed: args.seed,
    };
    let (handle, dataset) = build_scenario::<B>(&build_args, device)?;
    let compiled = compile(handle, &args.config, args.learning_rate, args.seed, device)?;
    train(
        compiled,
        &args.config,
        args.epochs,
        args.display_every,
        &dataset,
        callbacks,
        device,
    )
}
