//! データセットの分割と制約点の抽出。
//!
//! 読み込んだ参照解のサンプル点を、学習信号として使う制約サブセット（30%）と
//! 残り（70%）に分割します。分割は (長さ, 比率, シード) の純関数で、
//! 同じ入力に対して常に同じ分割を返します。

use burn::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::dataset::{SolutionDataset, column_to_tensor, rows_to_tensor};

/// 制約サブセットに使う既定の比率。
pub const SPLIT_RATIO: f64 = 0.3;
/// 分割に使う既定のシード。
pub const SPLIT_SEED: u64 = 42;

/// 分割結果。両者は互いに素で、合わせて全インデックスを覆います。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    /// 点制約として教師信号に使うサブセット
    pub constraint: Vec<usize>,
    /// 学習に使わない残り
    pub held_out: Vec<usize>,
}

/// `0..len` をシャッフルして先頭 `floor(ratio * len)` 個を制約側に割り当てます。
pub fn split_indices(len: usize, ratio: f64, seed: u64) -> SplitIndices {
    let mut indices: Vec<usize> = (0..len).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let n_constraint = (len as f64 * ratio) as usize;
    let held_out = indices.split_off(n_constraint);
    tracing::debug!(
        "データ分割: 制約 {} / 保留 {} (比率 {})",
        indices.len(),
        held_out.len(),
        ratio
    );
    SplitIndices {
        constraint: indices,
        held_out,
    }
}

/// 制約サブセットの入力テンソルと成分別ターゲットテンソルを返します。
pub fn constraint_points<B: Backend>(
    dataset: &SolutionDataset,
    indices: &SplitIndices,
    device: &B::Device,
) -> (Tensor<B, 2>, Vec<Tensor<B, 2>>) {
    let (inputs, targets) = dataset.points_at(&indices.constraint);
    let input_tensor = rows_to_tensor(&inputs, dataset.input_dim(), device);
    let target_tensors = targets
        .iter()
        .map(|column| column_to_tensor(column, device))
        .collect();
    (input_tensor, target_tensors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::SolutionDataset;
    use crate::dataset::testutil::tiny_file;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn split_is_deterministic_for_a_seed() {
        let a = split_indices(100, SPLIT_RATIO, SPLIT_SEED);
        let b = split_indices(100, SPLIT_RATIO, SPLIT_SEED);
        assert_eq!(a, b);
        let c = split_indices(100, SPLIT_RATIO, 43);
        assert_ne!(a, c);
    }

    #[test]
    fn split_sizes_follow_the_floor_ratio() {
        let split = split_indices(10, 0.3, SPLIT_SEED);
        assert_eq!(split.constraint.len(), 3);
        assert_eq!(split.held_out.len(), 7);

        let split = split_indices(101, 0.3, SPLIT_SEED);
        assert_eq!(split.constraint.len(), 30);
        assert_eq!(split.held_out.len(), 71);
    }

    #[test]
    fn subsets_are_disjoint_and_cover_everything() {
        let split = split_indices(50, 0.3, SPLIT_SEED);
        let mut all: Vec<usize> = split
            .constraint
            .iter()
            .chain(split.held_out.iter())
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn constraint_points_match_dataset_values() {
        let ds = SolutionDataset::from_file(tiny_file(4, 5, 2, 1), -1).unwrap();
        let split = split_indices(ds.len(), SPLIT_RATIO, SPLIT_SEED);
        let device = Default::default();
        let (inputs, targets) = constraint_points::<TestBackend>(&ds, &split, &device);
        assert_eq!(inputs.dims(), [split.constraint.len(), 2]);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].dims(), [split.constraint.len(), 1]);

        // 先頭インデックスの値がデータセットと一致すること
        let first = split.constraint[0];
        let (_, expected) = ds.point(first);
        let got: Vec<f32> = targets[0]
            .clone()
            .slice([0..1, 0..1])
            .into_data()
            .to_vec()
            .unwrap();
        assert_eq!(got[0], expected[0]);
    }
}
