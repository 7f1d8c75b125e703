//! コマンドラインインターフェース。
//!
//! `train`（学習と評価）と `infer`（保存済みモデルでの推論）の2つの
//! サブコマンドを提供します。

use std::path::PathBuf;

use burn::backend::{Autodiff, NdArray};
use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use clap::{Args, Parser, Subcommand};
use plotters::prelude::*;

use crate::MODEL_FILENAME;
use crate::config::TrainConfig;
use crate::error::PinnError;
use crate::metrics::METRIC_NAMES;
use crate::run::{RunArgs, run_training};
use crate::training::LossHistory;

/// clapでコマンドラインの構造を定義します。
#[derive(Parser, Debug)]
#[command(author, version, about = "PDE benchmark scenarios trained with physics-informed neural networks", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 実行するサブコマンドを定義します（train または infer）。
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// PINNモデルを学習し、誤差指標と損失グラフを出力します
    Train(TrainArgs),
    /// 保存されたPINNモデルを使い、テストスライスで推論を実行します
    Infer(InferArgs),
}

/// `train` サブコマンドの引数。
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// シナリオ識別子 (diff-react | diff-sorp | swe2d | pde1D | CFD2D | CFD3D)
    #[arg(long)]
    pub scenario: String,
    /// データセットファイル名
    #[arg(long)]
    pub filename: String,
    /// データセットのルートディレクトリ
    #[arg(long, default_value = "data")]
    pub root_path: PathBuf,
    #[arg(long, default_value_t = 15000)]
    pub epochs: usize,
    #[arg(long, default_value_t = 1e-3)]
    pub learning_rate: f64,
    /// 損失を記録・表示する反復間隔
    #[arg(long, default_value_t = 1000)]
    pub display_every: usize,
    /// 検証フォールド数（1なら単一実行）
    #[arg(long, default_value_t = 1)]
    pub val_num: usize,
    /// 学習設定のJSONファイル（省略時は既定値）
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long, default_value_t = 2)]
    pub input_ch: usize,
    #[arg(long, default_value_t = 1)]
    pub output_ch: usize,
    /// 1次元ファミリの空間区間の左端
    #[arg(long, default_value_t = 0.0)]
    pub x_left: f32,
    /// 1次元ファミリの空間区間の右端
    #[arg(long, default_value_t = 1.0)]
    pub x_right: f32,
    /// 周期境界を使うか（pde1D）
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub periodic_bc: bool,
    /// PDEの補助パラメータ（移流速度、粘性係数、比熱比など）
    #[arg(long = "aux", value_delimiter = ',')]
    pub aux_params: Vec<f32>,
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
    /// 学習済みモデルの保存先（省略時は保存しない）
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,
    /// 損失グラフの出力先
    #[arg(long, default_value = "loss_graph.png")]
    pub plot: PathBuf,
}

/// `infer` サブコマンドの引数。
#[derive(Args, Debug)]
pub struct InferArgs {
    /// 学習済みモデルのファイル
    #[arg(long, default_value = MODEL_FILENAME)]
    pub checkpoint: PathBuf,
    /// データセットファイル名
    #[arg(long)]
    pub filename: String,
    #[arg(long, default_value = "data")]
    pub root_path: PathBuf,
    /// ネットワーク形状の設定JSON（チェックポイントと一致させる）
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long, default_value_t = 2)]
    pub input_ch: usize,
    #[arg(long, default_value_t = 1)]
    pub output_ch: usize,
    /// 出力に整流変換を適用するか（diff-sorp のモデル）
    #[arg(long, default_value_t = false)]
    pub relu_output: bool,
    #[arg(long, default_value_t = 20)]
    pub n_last_time_steps: usize,
    #[arg(long, default_value_t = 1)]
    pub n_components: usize,
}

/// `train`サブコマンドを実行します。
///
/// 学習と評価、損失グラフの描画、必要ならモデルのファイル保存を行います。
pub fn train(args: &TrainArgs) -> Result<(), Box<dyn std::error::Error>> {
    type MyBackend = Autodiff<NdArray<f32>>;
    let device = Default::default();

    let config = match &args.config {
        Some(path) => TrainConfig::load(path)?,
        None => TrainConfig::default(),
    };
    let run_args = RunArgs {
        scenario: &args.scenario,
        epochs: args.epochs,
        learning_rate: args.learning_rate,
        display_every: args.display_every,
        filename: &args.filename,
        config,
        input_ch: args.input_ch,
        output_ch: args.output_ch,
        root_path: &args.root_path,
        val_num: args.val_num,
        if_periodic_bc: args.periodic_bc,
        aux_params: args.aux_params.clone(),
        x_left: args.x_left,
        x_right: args.x_right,
        seed: args.seed,
    };

    println!(
        "学習を開始します (シナリオ: {}) - バックエンド: NdArray (CPU)",
        args.scenario
    );
    let output = run_training::<MyBackend>(&run_args, &mut [], &device)?;
    println!("学習が完了しました。");
    println!("=> 検証損失: {:.6}", output.val_loss);
    println!("=> 誤差指標 [{}]:", METRIC_NAMES.join(", "));
    println!("   {:.6}", output.errors);
    println!(
        "=> 平均推論時間: {:.2?} / サンプル",
        output.mean_inference_duration
    );

    plot_loss_history(&output.history, &args.plot)?;
    println!("=> 損失グラフを {:?} に保存しました。", args.plot);

    if let Some(path) = &args.checkpoint {
        output
            .network
            .save_file(
                path.clone(),
                &NamedMpkFileRecorder::<FullPrecisionSettings>::new(),
            )
            .map_err(|e| PinnError::Checkpoint {
                message: e.to_string(),
            })?;
        println!("=> モデルを {:?} に保存しました。", path);
    }
    Ok(())
}

/// 学習過程の損失をグラフとしてPNGファイルに出力します。
fn plot_loss_history(
    history: &LossHistory,
    path: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    if history.train.is_empty() {
        return Ok(());
    }
    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let max_log_loss = history.train.first().unwrap_or(&1.0).log10() + 0.5;
    let min_log_loss = history.train.last().unwrap_or(&1e-6).log10() - 0.5;
    let mut chart = ChartBuilder::on(&root)
        .caption("Loss History", ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0..history.train.len(), min_log_loss..max_log_loss)?;
    chart
        .configure_mesh()
        .y_desc("Loss (log10 scale)")
        .x_desc("Recorded steps")
        .draw()?;
    chart
        .draw_series(LineSeries::new(
            history
                .train
                .iter()
                .enumerate()
                .map(|(i, &val)| (i, val.log10())),
            &RED,
        ))?
        .label("Training Loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
    chart
        .draw_series(LineSeries::new(
            history
                .valid
                .iter()
                .enumerate()
                .map(|(i, &val)| (i, val.log10())),
            &BLUE,
        ))?
        .label("Validation Loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}
