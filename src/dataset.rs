//! 参照解データセットのコンテナとアダプタ。
//!
//! シミュレーション済みの参照解を `bincode` でエンコードした [`SolutionFile`]
//! として読み込み、[`SolutionDataset`] が初期条件・境界条件・テストスライスを
//! 切り出します。ひとつのアダプタはひとつのシナリオ構築に占有され、
//! 実行間で共有されません。
//!
//! 格納レイアウトはバッチごとにフラットな `[時刻][空間][成分]` で、
//! 空間インデックスは最後の軸が最も速く回ります。負のバッチ番号は
//! 末尾からの参照です（-1 が最終バッチ）。

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PinnError, PinnResult};

/// ディスク上の参照解コンテナ。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionFile {
    /// データセットの表示名
    pub label: String,
    /// 保存された時刻列
    pub times: Vec<f32>,
    /// 空間軸ごとの座標列（1〜3軸）
    pub axes: Vec<Vec<f32>>,
    /// 格納されている物理成分数
    pub n_components: usize,
    /// バッチごとのフラットなデータ
    pub batches: Vec<Vec<f32>>,
}

impl SolutionFile {
    /// 空間点の総数。
    pub fn n_space(&self) -> usize {
        self.axes.iter().map(|a| a.len()).product()
    }

    /// 形状の整合性を検証します。
    pub fn validate(&self) -> PinnResult<()> {
        if self.times.is_empty() {
            return Err(PinnError::dataset("時刻列が空です"));
        }
        if self.axes.is_empty() || self.axes.len() > 3 {
            return Err(PinnError::dataset(format!(
                "空間軸数が不正です: {}",
                self.axes.len()
            )));
        }
        if self.axes.iter().any(|a| a.is_empty()) {
            return Err(PinnError::dataset("空の空間軸があります"));
        }
        if self.n_components == 0 {
            return Err(PinnError::dataset("成分数が0です"));
        }
        if self.batches.is_empty() {
            return Err(PinnError::dataset("バッチがありません"));
        }
        let expected = self.times.len() * self.n_space() * self.n_components;
        for (i, batch) in self.batches.iter().enumerate() {
            if batch.len() != expected {
                return Err(PinnError::dataset(format!(
                    "バッチ {} の長さ {} が期待値 {} と一致しません",
                    i,
                    batch.len(),
                    expected
                )));
            }
        }
        Ok(())
    }

    /// コンテナをファイルから読み込みます。
    pub fn load(path: &Path) -> PinnResult<Self> {
        let file = File::open(path).map_err(|e| PinnError::io(path, e))?;
        let reader = BufReader::new(file);
        bincode::deserialize_from(reader).map_err(|e| PinnError::Serde {
            message: format!("{path:?}: {e}"),
        })
    }

    /// コンテナをファイルへ書き出します。
    pub fn save(&self, path: &Path) -> PinnResult<()> {
        let file = File::create(path).map_err(|e| PinnError::io(path, e))?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, self).map_err(|e| PinnError::Serde {
            message: format!("{path:?}: {e}"),
        })
    }
}

/// 1次元データセットの境界トレース。
#[derive(Debug, Clone)]
pub struct BoundaryTrace {
    pub left_inputs: Vec<f32>,
    pub left_values: Vec<f32>,
    pub right_inputs: Vec<f32>,
    pub right_values: Vec<f32>,
}

/// 読み込んだ参照解と選択された検証バッチを束ねたアダプタ。
#[derive(Debug)]
pub struct SolutionDataset {
    file: SolutionFile,
    batch: usize,
}

impl SolutionDataset {
    /// 検証済みコンテナと検証バッチ番号からアダプタを作ります。
    pub fn from_file(file: SolutionFile, val_batch_idx: i64) -> PinnResult<Self> {
        file.validate()?;
        let n = file.batches.len() as i64;
        let resolved = if val_batch_idx < 0 {
            n + val_batch_idx
        } else {
            val_batch_idx
        };
        if resolved < 0 || resolved >= n {
            return Err(PinnError::dataset(format!(
                "検証バッチ番号 {} は範囲外です（バッチ数 {}）",
                val_batch_idx, n
            )));
        }
        Ok(Self {
            file,
            batch: resolved as usize,
        })
    }

    /// ルートパスとファイル名からアダプタを構築します。
    pub fn load(root: &Path, filename: &str, val_batch_idx: i64) -> PinnResult<Self> {
        let path = root.join(filename);
        let file = SolutionFile::load(&path)?;
        tracing::info!(
            "データセット読込: {:?} (バッチ数 {}, 時刻 {}, 空間 {})",
            path,
            file.batches.len(),
            file.times.len(),
            file.n_space()
        );
        Self::from_file(file, val_batch_idx)
    }

    /// 選択中バッチの (空間 × 時刻) サンプル総数。
    pub fn len(&self) -> usize {
        self.file.times.len() * self.file.n_space()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn n_components(&self) -> usize {
        self.file.n_components
    }

    pub fn n_space(&self) -> usize {
        self.file.n_space()
    }

    pub fn n_time(&self) -> usize {
        self.file.times.len()
    }

    /// ネットワーク入力の次元数（時間1 + 空間次元）。
    pub fn input_dim(&self) -> usize {
        1 + self.file.axes.len()
    }

    fn spatial_coords(&self, mut s: usize) -> Vec<f32> {
        // 最後の軸が最も速く回る
        let mut coords = vec![0.0; self.file.axes.len()];
        for (d, axis) in self.file.axes.iter().enumerate().rev() {
            coords[d] = axis[s % axis.len()];
            s /= axis.len();
        }
        coords
    }

    fn input_row(&self, t_idx: usize, s_idx: usize) -> Vec<f32> {
        let mut row = Vec::with_capacity(self.input_dim());
        row.push(self.file.times[t_idx]);
        row.extend(self.spatial_coords(s_idx));
        row
    }

    fn value(&self, t_idx: usize, s_idx: usize, component: usize) -> f32 {
        let n_space = self.file.n_space();
        let n_comp = self.file.n_components;
        self.file.batches[self.batch][(t_idx * n_space + s_idx) * n_comp + component]
    }

    /// 通し番号 `i`（時刻優先）のサンプル点を返します。
    pub fn point(&self, i: usize) -> (Vec<f32>, Vec<f32>) {
        let n_space = self.file.n_space();
        let (t_idx, s_idx) = (i / n_space, i % n_space);
        let targets = (0..self.file.n_components)
            .map(|c| self.value(t_idx, s_idx, c))
            .collect();
        (self.input_row(t_idx, s_idx), targets)
    }

    /// 指定インデックス集合の入力行列と成分別ターゲット列を返します。
    pub fn points_at(&self, indices: &[usize]) -> (Vec<f32>, Vec<Vec<f32>>) {
        let mut inputs = Vec::with_capacity(indices.len() * self.input_dim());
        let mut targets = vec![Vec::with_capacity(indices.len()); self.file.n_components];
        for &i in indices {
            let (row, values) = self.point(i);
            inputs.extend(row);
            for (c, v) in values.into_iter().enumerate() {
                targets[c].push(v);
            }
        }
        (inputs, targets)
    }

    /// 最初の時刻ステップの入力行列と成分別ターゲット列。
    pub fn initial_condition(&self) -> (Vec<f32>, Vec<Vec<f32>>) {
        let indices: Vec<usize> = (0..self.file.n_space()).collect();
        self.points_at(&indices)
    }

    /// 1次元データセットの左右境界トレース（成分0）。
    pub fn boundary_condition(&self) -> PinnResult<BoundaryTrace> {
        if self.file.axes.len() != 1 {
            return Err(PinnError::dataset(
                "境界トレースは1次元データセットでのみ利用できます",
            ));
        }
        let n_x = self.file.axes[0].len();
        let mut trace = BoundaryTrace {
            left_inputs: Vec::with_capacity(self.n_time() * 2),
            left_values: Vec::with_capacity(self.n_time()),
            right_inputs: Vec::with_capacity(self.n_time() * 2),
            right_values: Vec::with_capacity(self.n_time()),
        };
        for t_idx in 0..self.n_time() {
            trace.left_inputs.extend(self.input_row(t_idx, 0));
            trace.left_values.push(self.value(t_idx, 0, 0));
            trace.right_inputs.extend(self.input_row(t_idx, n_x - 1));
            trace.right_values.push(self.value(t_idx, n_x - 1, 0));
        }
        Ok(trace)
    }

    /// 末尾 `n_last_time_steps` ステップの入力と正解値。
    ///
    /// 正解値は先頭 `n_components` 成分に制限した `[点数 × 成分]` のフラット列。
    pub fn test_data(
        &self,
        n_last_time_steps: usize,
        n_components: usize,
    ) -> PinnResult<(Vec<f32>, Vec<f32>)> {
        if n_components > self.file.n_components {
            return Err(PinnError::dataset(format!(
                "要求成分数 {} がデータセットの成分数 {} を超えています",
                n_components, self.file.n_components
            )));
        }
        let n_time = self.n_time();
        let n_last = n_last_time_steps.min(n_time);
        let n_space = self.file.n_space();
        let mut inputs = Vec::with_capacity(n_last * n_space * self.input_dim());
        let mut targets = Vec::with_capacity(n_last * n_space * n_components);
        for t_idx in (n_time - n_last)..n_time {
            for s_idx in 0..n_space {
                inputs.extend(self.input_row(t_idx, s_idx));
                for c in 0..n_components {
                    targets.push(self.value(t_idx, s_idx, c));
                }
            }
        }
        Ok((inputs, targets))
    }

    /// フラットな予測を `[時刻, 空間, 成分]` のテンソルへ戻します。
    pub fn unravel<B: Backend>(
        &self,
        flat: Tensor<B, 2>,
        n_last_time_steps: usize,
        n_components: usize,
    ) -> PinnResult<Tensor<B, 3>> {
        let n_last = n_last_time_steps.min(self.n_time());
        let n_space = self.file.n_space();
        let [rows, cols] = flat.dims();
        if rows != n_last * n_space || cols != n_components {
            return Err(PinnError::dataset(format!(
                "形状 [{rows}, {cols}] を [時刻 {n_last}, 空間 {n_space}, 成分 {n_components}] \
                 に変形できません"
            )));
        }
        Ok(flat.reshape([n_last, n_space, n_components]))
    }
}

/// 行優先のフラット列から2次元テンソルを組み立てます。
pub(crate) fn rows_to_tensor<B: Backend>(
    rows: &[f32],
    n_cols: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    let n_rows = rows.len() / n_cols;
    Tensor::<B, 1>::from_floats(rows, device).reshape([n_rows, n_cols])
}

/// 1列ぶんの値から `[n, 1]` テンソルを組み立てます。
pub(crate) fn column_to_tensor<B: Backend>(values: &[f32], device: &B::Device) -> Tensor<B, 2> {
    Tensor::<B, 1>::from_floats(values, device).reshape([values.len(), 1])
}
