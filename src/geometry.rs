//! 時空間ドメインとその点サンプリング。
//!
//! 空間ドメイン（区間・矩形・直方体）と時間領域の直積上で、コロケーション点・
//! 境界点・初期時刻点を一様乱数でサンプリングします。乱数生成器は呼び出し側が
//! シード付きで渡すため、同じシードなら同じ点列が得られます。
//!
//! 座標の行レイアウトはネットワーク入力と同じ `[t, x, (y, z)]` です。

use rand::Rng;
use rand::rngs::StdRng;

/// 時間領域 [t0, t1]。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeDomain {
    pub t0: f32,
    pub t1: f32,
}

impl TimeDomain {
    pub fn new(t0: f32, t1: f32) -> Self {
        Self { t0, t1 }
    }
}

/// 空間ドメイン。
#[derive(Debug, Clone, PartialEq)]
pub enum SpatialDomain {
    Interval { left: f32, right: f32 },
    Rectangle { min: [f32; 2], max: [f32; 2] },
    Cuboid { min: [f32; 3], max: [f32; 3] },
}

impl SpatialDomain {
    /// 空間次元数。
    pub fn dim(&self) -> usize {
        match self {
            SpatialDomain::Interval { .. } => 1,
            SpatialDomain::Rectangle { .. } => 2,
            SpatialDomain::Cuboid { .. } => 3,
        }
    }

    fn bounds(&self) -> (&[f32], &[f32]) {
        match self {
            SpatialDomain::Interval { left, right } => {
                (std::slice::from_ref(left), std::slice::from_ref(right))
            }
            SpatialDomain::Rectangle { min, max } => (min.as_slice(), max.as_slice()),
            SpatialDomain::Cuboid { min, max } => (min.as_slice(), max.as_slice()),
        }
    }
}

/// 境界点とその外向き単位法線。
#[derive(Debug, Clone)]
pub struct BoundarySample {
    /// `[t, x, (y, z)]` の行を連結したもの
    pub points: Vec<f32>,
    /// 空間次元ぶんの法線成分の行を連結したもの
    pub normals: Vec<f32>,
}

/// 空間ドメインと時間領域の直積。
#[derive(Debug, Clone, PartialEq)]
pub struct GeomTime {
    pub space: SpatialDomain,
    pub time: TimeDomain,
}

impl GeomTime {
    pub fn new(space: SpatialDomain, time: TimeDomain) -> Self {
        Self { space, time }
    }

    /// ネットワーク入力の次元数（時間1 + 空間次元）。
    pub fn input_dim(&self) -> usize {
        1 + self.space.dim()
    }

    /// 内部コロケーション点を `n` 個サンプリングします。
    pub fn sample_interior(&self, n: usize, rng: &mut StdRng) -> Vec<f32> {
        let (mins, maxs) = self.space.bounds();
        let mut rows = Vec::with_capacity(n * self.input_dim());
        for _ in 0..n {
            rows.push(rng.random_range(self.time.t0..self.time.t1));
            for d in 0..mins.len() {
                rows.push(rng.random_range(mins[d]..maxs[d]));
            }
        }
        rows
    }

    /// 初期時刻 t0 上の点を `n` 個サンプリングします。
    pub fn sample_initial(&self, n: usize, rng: &mut StdRng) -> Vec<f32> {
        let (mins, maxs) = self.space.bounds();
        let mut rows = Vec::with_capacity(n * self.input_dim());
        for _ in 0..n {
            rows.push(self.time.t0);
            for d in 0..mins.len() {
                rows.push(rng.random_range(mins[d]..maxs[d]));
            }
        }
        rows
    }

    /// 空間境界上の点を `n` 個、外向き単位法線付きでサンプリングします。
    pub fn sample_boundary(&self, n: usize, rng: &mut StdRng) -> BoundarySample {
        let (mins, maxs) = self.space.bounds();
        let sd = mins.len();
        let mut points = Vec::with_capacity(n * self.input_dim());
        let mut normals = Vec::with_capacity(n * sd);
        for _ in 0..n {
            let face_dim = rng.random_range(0..sd);
            let on_max = rng.random_range(0..2) == 1;
            points.push(rng.random_range(self.time.t0..self.time.t1));
            for d in 0..sd {
                if d == face_dim {
                    points.push(if on_max { maxs[d] } else { mins[d] });
                } else {
                    points.push(rng.random_range(mins[d]..maxs[d]));
                }
            }
            for d in 0..sd {
                if d == face_dim {
                    normals.push(if on_max { 1.0 } else { -1.0 });
                } else {
                    normals.push(0.0);
                }
            }
        }
        BoundarySample { points, normals }
    }

    /// 指定した軸の下限/上限の面上の点を `n` 個サンプリングします。
    pub fn sample_face(&self, axis: usize, on_max: bool, n: usize, rng: &mut StdRng) -> Vec<f32> {
        let (mins, maxs) = self.space.bounds();
        let mut rows = Vec::with_capacity(n * self.input_dim());
        for _ in 0..n {
            rows.push(rng.random_range(self.time.t0..self.time.t1));
            for d in 0..mins.len() {
                if d == axis {
                    rows.push(if on_max { maxs[d] } else { mins[d] });
                } else {
                    rows.push(rng.random_range(mins[d]..maxs[d]));
                }
            }
        }
        rows
    }

    /// 周期境界用に、対向する面のペア点を `n` 組サンプリングします。
    ///
    /// 各組は1軸の座標だけが下限/上限で異なり、時刻と他の座標を共有します。
    pub fn sample_periodic_pairs(&self, n: usize, rng: &mut StdRng) -> (Vec<f32>, Vec<f32>) {
        let (mins, maxs) = self.space.bounds();
        let sd = mins.len();
        let mut left = Vec::with_capacity(n * self.input_dim());
        let mut right = Vec::with_capacity(n * self.input_dim());
        for _ in 0..n {
            let axis = rng.random_range(0..sd);
            let t = rng.random_range(self.time.t0..self.time.t1);
            left.push(t);
            right.push(t);
            for d in 0..sd {
                if d == axis {
                    left.push(mins[d]);
                    right.push(maxs[d]);
                } else {
                    let c = rng.random_range(mins[d]..maxs[d]);
                    left.push(c);
                    right.push(c);
                }
            }
        }
        (left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn unit_square() -> GeomTime {
        GeomTime::new(
            SpatialDomain::Rectangle {
                min: [-1.0, -1.0],
                max: [1.0, 1.0],
            },
            TimeDomain::new(0.0, 5.0),
        )
    }

    #[test]
    fn interior_points_stay_in_bounds() {
        let geom = unit_square();
        let mut rng = StdRng::seed_from_u64(7);
        let rows = geom.sample_interior(100, &mut rng);
        assert_eq!(rows.len(), 100 * 3);
        for row in rows.chunks(3) {
            assert!(row[0] >= 0.0 && row[0] < 5.0);
            assert!(row[1] >= -1.0 && row[1] < 1.0);
            assert!(row[2] >= -1.0 && row[2] < 1.0);
        }
    }

    #[test]
    fn initial_points_are_at_t0() {
        let geom = unit_square();
        let mut rng = StdRng::seed_from_u64(7);
        let rows = geom.sample_initial(50, &mut rng);
        for row in rows.chunks(3) {
            assert_eq!(row[0], 0.0);
        }
    }

    #[test]
    fn boundary_normals_are_unit_and_outward() {
        let geom = unit_square();
        let mut rng = StdRng::seed_from_u64(7);
        let sample = geom.sample_boundary(80, &mut rng);
        assert_eq!(sample.points.len(), 80 * 3);
        assert_eq!(sample.normals.len(), 80 * 2);
        for (row, normal) in sample.points.chunks(3).zip(sample.normals.chunks(2)) {
            let norm: f32 = normal.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-6);
            let d = normal.iter().position(|v| v.abs() > 0.5).unwrap();
            let coord = row[1 + d];
            assert!(coord == -1.0 || coord == 1.0);
            assert_eq!(normal[d].signum(), coord.signum());
        }
    }

    #[test]
    fn periodic_pairs_differ_in_one_axis() {
        let geom = unit_square();
        let mut rng = StdRng::seed_from_u64(7);
        let (left, right) = geom.sample_periodic_pairs(40, &mut rng);
        for (l, r) in left.chunks(3).zip(right.chunks(3)) {
            assert_eq!(l[0], r[0]);
            let differing: Vec<usize> = (1..3).filter(|&i| l[i] != r[i]).collect();
            assert_eq!(differing.len(), 1);
            let d = differing[0];
            assert_eq!(l[d], -1.0);
            assert_eq!(r[d], 1.0);
        }
    }

    #[test]
    fn sampling_is_deterministic_for_a_seed() {
        let geom = unit_square();
        let a = geom.sample_interior(10, &mut StdRng::seed_from_u64(3));
        let b = geom.sample_interior(10, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }
}
