//! 保存済みモデルでの推論。

use std::time::Instant;

use burn::backend::NdArray;
use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};

use crate::cli::InferArgs;
use crate::config::TrainConfig;
use crate::dataset::{SolutionDataset, rows_to_tensor};
use crate::model::{FnnConfig, OutputTransform};

type MyBackend = NdArray<f32>;

/// `infer`サブコマンドを実行します。
///
/// ファイルから学習済みモデルを読み込み、データセットの末尾時刻スライスで
/// 推論を実行して形状と所要時間を表示します。
pub fn run(args: &InferArgs) -> Result<(), Box<dyn std::error::Error>> {
    let device = Default::default();

    if !args.checkpoint.exists() {
        return Err(format!(
            "モデルファイル {:?} が見つかりません。\n最初に 'train' コマンドでモデルを学習・保存してください。",
            args.checkpoint
        )
        .into());
    }

    println!("\n推論を実行します - バックエンド: NdArray (CPU)");

    let config = match &args.config {
        Some(path) => TrainConfig::load(path)?,
        None => TrainConfig::default(),
    };
    let transform = args.relu_output.then_some(OutputTransform::Relu);

    println!("保存済みモデルを {:?} からロード中...", args.checkpoint);
    let model = FnnConfig::new(
        args.input_ch,
        args.output_ch,
        config.num_neurons,
        config.num_layers,
        config.activation,
        config.initialization,
    )
    .with_output_transform(transform)
    .init::<MyBackend>(&device)
    .load_file(
        args.checkpoint.clone(),
        &NamedMpkFileRecorder::<FullPrecisionSettings>::new(),
        &device,
    )?;

    let dataset = SolutionDataset::load(&args.root_path, &args.filename, -1)?;
    let n_components = args.n_components.min(dataset.n_components());
    let (inputs, _) = dataset.test_data(args.n_last_time_steps, n_components)?;
    let input_tensor = rows_to_tensor::<MyBackend>(&inputs, dataset.input_dim(), &device);
    let n_samples = input_tensor.dims()[0];

    let inference_start = Instant::now();
    let predictions = model.forward(input_tensor);
    let inference_duration = inference_start.elapsed();

    println!(
        "推論が完了しました。入力点数: {}, 出力テンソルの形状: {:?}",
        n_samples,
        predictions.dims()
    );
    println!(
        "=> 推論時間: {:.2?} (平均 {:.2?} / サンプル)",
        inference_duration,
        inference_duration / n_samples.max(1) as u32
    );

    Ok(())
}
