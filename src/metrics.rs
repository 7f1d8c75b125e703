//! 予測誤差の指標計算。
//!
//! `[時刻, 空間, 成分]` に戻した予測と正解から、成分ごとに複数の誤差指標を
//! 計算します。単一実行では指標を水平連結した1次元配列、複数フォールドでは
//! 新しい先頭軸で積み上げた2次元配列として集約します。

use burn::prelude::*;
use ndarray::{Array1, Array3, ArrayD, Axis, s};

use crate::error::{PinnError, PinnResult};

/// 指標の並び順。誤差配列の並びはこの順に従います。
pub const METRIC_NAMES: [&str; 5] = ["RMSE", "nRMSE", "max", "boundary-RMSE", "conserved"];

/// 成分ごとの指標値。`values[m][c]` が成分 c の指標 m です。
pub type MetricValues = Vec<Array1<f32>>;

/// 予測と正解から成分ごとの誤差指標を計算します。
pub fn metric_func<B: Backend>(
    prediction: &Tensor<B, 3>,
    ground_truth: &Tensor<B, 3>,
) -> PinnResult<MetricValues> {
    let dims = prediction.dims();
    if dims != ground_truth.dims() {
        return Err(PinnError::dataset(format!(
            "予測 {:?} と正解 {:?} の形状が一致しません",
            dims,
            ground_truth.dims()
        )));
    }
    let [n_time, n_space, n_comp] = dims;
    let pred = to_array(prediction, dims)?;
    let gt = to_array(ground_truth, dims)?;
    let diff = &pred - &gt;

    let mut rmse = Array1::zeros(n_comp);
    let mut nrmse = Array1::zeros(n_comp);
    let mut max_err = Array1::zeros(n_comp);
    let mut boundary_rmse = Array1::zeros(n_comp);
    let mut conserved = Array1::zeros(n_comp);

    for c in 0..n_comp {
        let dc = diff.slice(s![.., .., c]);
        let gc = gt.slice(s![.., .., c]);

        let mse = dc.mapv(|v| v * v).mean().unwrap_or(0.0);
        rmse[c] = mse.sqrt();

        let gt_rms = gc.mapv(|v| v * v).mean().unwrap_or(0.0).sqrt();
        nrmse[c] = rmse[c] / (gt_rms + f32::EPSILON);

        max_err[c] = dc.iter().fold(0.0_f32, |m, v| m.max(v.abs()));

        // 空間の両端の行だけで計算する RMSE
        let first = dc.slice(s![.., 0..1]);
        let last = dc.slice(s![.., n_space - 1..n_space]);
        let boundary_mse = (first.mapv(|v| v * v).sum() + last.mapv(|v| v * v).sum())
            / (2.0 * n_time as f32);
        boundary_rmse[c] = boundary_mse.sqrt();

        // 各時刻の空間平均のずれ（保存量の誤差）の時間方向RMS
        let means = dc.mean_axis(Axis(1)).unwrap_or_else(|| Array1::zeros(n_time));
        conserved[c] = means.mapv(|v| v * v).mean().unwrap_or(0.0).sqrt();
    }

    Ok(vec![rmse, nrmse, max_err, boundary_rmse, conserved])
}

/// 単一実行の誤差を水平連結した1次元配列にします。
pub fn hstack_errors(values: &MetricValues) -> ArrayD<f32> {
    let flat: Vec<f32> = values.iter().flat_map(|a| a.iter().copied()).collect();
    Array1::from(flat).into_dyn()
}

/// 指標ベクトルを新しい先頭軸で積み上げた2次元配列にします。
pub fn stack_errors(values: &MetricValues) -> PinnResult<ArrayD<f32>> {
    let views: Vec<_> = values.iter().map(|a| a.view()).collect();
    ndarray::stack(Axis(0), &views)
        .map(|a| a.into_dyn())
        .map_err(|e| PinnError::dataset(format!("誤差指標の積み上げに失敗しました: {e}")))
}

fn to_array<B: Backend>(
    tensor: &Tensor<B, 3>,
    dims: [usize; 3],
) -> PinnResult<Array3<f32>> {
    let data: Vec<f32> = tensor
        .clone()
        .into_data()
        .to_vec()
        .map_err(|e| PinnError::dataset(format!("テンソルの取り出しに失敗しました: {e:?}")))?;
    Array3::from_shape_vec((dims[0], dims[1], dims[2]), data)
        .map_err(|e| PinnError::dataset(format!("テンソルの形状が不正です: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn tensor(values: &[f32], dims: [usize; 3]) -> Tensor<TestBackend, 3> {
        Tensor::<TestBackend, 1>::from_floats(values, &Default::default()).reshape(dims)
    }

    #[test]
    fn identical_tensors_have_zero_error() {
        let t = tensor(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3, 1]);
        let values = metric_func(&t, &t.clone()).unwrap();
        assert_eq!(values.len(), METRIC_NAMES.len());
        for metric in &values {
            assert_eq!(metric.len(), 1);
            assert!(metric[0].abs() < 1e-12);
        }
    }

    #[test]
    fn constant_offset_shows_up_in_every_metric() {
        let gt = tensor(&[0.0; 8], [2, 4, 1]);
        let pred = tensor(&[0.5; 8], [2, 4, 1]);
        let values = metric_func(&pred, &gt).unwrap();
        let rmse = &values[0];
        let max_err = &values[2];
        let conserved = &values[4];
        assert!((rmse[0] - 0.5).abs() < 1e-6);
        assert!((max_err[0] - 0.5).abs() < 1e-6);
        assert!((conserved[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn per_component_metrics_are_independent() {
        // 成分0は完全一致、成分1のみずれる
        let gt = tensor(&[1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0], [2, 2, 2]);
        let pred = tensor(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0], [2, 2, 2]);
        let values = metric_func(&pred, &gt).unwrap();
        let rmse = &values[0];
        assert!(rmse[0].abs() < 1e-12);
        assert!((rmse[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn hstack_length_is_components_times_metrics() {
        let gt = tensor(&[0.0; 12], [2, 3, 2]);
        let pred = tensor(&[0.1; 12], [2, 3, 2]);
        let values = metric_func(&pred, &gt).unwrap();
        let flat = hstack_errors(&values);
        assert_eq!(flat.shape(), &[2 * METRIC_NAMES.len()]);

        let stacked = stack_errors(&values).unwrap();
        assert_eq!(stacked.shape(), &[METRIC_NAMES.len(), 2]);
    }

    #[test]
    fn shape_mismatch_is_a_dataset_error() {
        let a = tensor(&[0.0; 6], [2, 3, 1]);
        let b = tensor(&[0.0; 3], [1, 3, 1]);
        assert!(matches!(
            metric_func(&a, &b),
            Err(PinnError::Dataset { .. })
        ));
    }
}
