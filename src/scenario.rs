//! シナリオの選択とモデルハンドルの組み立て。
//!
//! シナリオ識別子ごとに、時空間ドメイン・PDE残差・制約集合・ネットワークを
//! 組み立てて [`ModelHandle`] として返します。シナリオの集合は閉じた列挙型で、
//! 未知の識別子は構築前に「未実装のシナリオ」エラーになります。
//!
//! コロケーション点は内部 1000 点・境界 1000 点・初期時刻 5000 点を
//! サンプリングします。

use std::f32::consts::PI;
use std::path::Path;

use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::TrainConfig;
use crate::constraint::Constraint;
use crate::dataset::{SolutionDataset, column_to_tensor, rows_to_tensor};
use crate::error::{PinnError, PinnResult};
use crate::filename::{ParsedFilename, Pde1dFamily};
use crate::geometry::{GeomTime, SpatialDomain, TimeDomain};
use crate::model::{Fnn, FnnConfig, OutputTransform};
use crate::pinn::{PdeResidual, SORPTION_D};
use crate::split::{SPLIT_RATIO, SPLIT_SEED, constraint_points, split_indices};

/// 内部コロケーション点の数。
pub const NUM_DOMAIN: usize = 1000;
/// 境界点の数。
pub const NUM_BOUNDARY: usize = 1000;
/// 初期時刻点の数。
pub const NUM_INITIAL: usize = 5000;

/// 対応するシナリオの閉じた集合。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    DiffReact,
    DiffSorp,
    Swe2d,
    Pde1d,
    Cfd2d,
    Cfd3d,
}

impl Scenario {
    /// シナリオ識別子を解析します。未知の名前は未実装エラーです。
    pub fn parse(name: &str) -> PinnResult<Self> {
        match name {
            "diff-react" => Ok(Self::DiffReact),
            "diff-sorp" => Ok(Self::DiffSorp),
            "swe2d" => Ok(Self::Swe2d),
            "pde1D" => Ok(Self::Pde1d),
            "CFD2D" => Ok(Self::Cfd2d),
            "CFD3D" => Ok(Self::Cfd3d),
            other => Err(PinnError::UnimplementedScenario {
                name: other.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DiffReact => "diff-react",
            Self::DiffSorp => "diff-sorp",
            Self::Swe2d => "swe2d",
            Self::Pde1d => "pde1D",
            Self::Cfd2d => "CFD2D",
            Self::Cfd3d => "CFD3D",
        }
    }
}

/// シナリオ構築への入力一式。
#[derive(Debug)]
pub struct BuildArgs<'a> {
    pub scenario: Scenario,
    pub filename: &'a str,
    pub root_path: &'a Path,
    pub val_batch_idx: i64,
    pub config: &'a TrainConfig,
    pub input_ch: usize,
    pub output_ch: usize,
    pub x_left: f32,
    pub x_right: f32,
    pub if_periodic_bc: bool,
    pub aux_params: &'a [f32],
    pub seed: u64,
}

/// 組み立て済みの学習対象。コンパイル前のモデルハンドルです。
pub struct ModelHandle<B: AutodiffBackend> {
    pub geomtime: GeomTime,
    pub residual: PdeResidual,
    pub constraints: Vec<Constraint<B>>,
    pub collocation: Tensor<B, 2>,
    pub network: Fnn<B>,
    /// 物理的に意味のある出力成分数（ネットワークの生出力より少ないことがある）
    pub n_components: usize,
}

/// シナリオ識別子で分岐してモデルハンドルとデータセットを構築します。
pub fn build_scenario<B: AutodiffBackend>(
    args: &BuildArgs<'_>,
    device: &B::Device,
) -> PinnResult<(ModelHandle<B>, SolutionDataset)> {
    tracing::info!("シナリオ {} を構築します", args.scenario.name());
    match args.scenario {
        Scenario::DiffSorp => setup_diffusion_sorption(args, device),
        Scenario::DiffReact => setup_diffusion_reaction(args, device),
        Scenario::Swe2d => setup_swe2d(args, device),
        Scenario::Pde1d => setup_pde1d(args, device),
        Scenario::Cfd2d => setup_cfd2d(args, device),
        Scenario::Cfd3d => setup_cfd3d(args, device),
    }
}

fn aux_param(args: &BuildArgs<'_>, index: usize, what: &str) -> PinnResult<f32> {
    args.aux_params.get(index).copied().ok_or_else(|| {
        PinnError::config(format!(
            "シナリオ {} には aux_params[{}] ({}) が必要です",
            args.scenario.name(),
            index,
            what
        ))
    })
}

fn require_input_dim(dataset: &SolutionDataset, expected: usize) -> PinnResult<()> {
    if dataset.input_dim() != expected {
        return Err(PinnError::dataset(format!(
            "入力次元 {} のデータセットが必要ですが {} が与えられました",
            expected,
            dataset.input_dim()
        )));
    }
    Ok(())
}

fn require_channels(args: &BuildArgs<'_>, input_ch: usize, output_ch: usize) -> PinnResult<()> {
    if args.input_ch != input_ch {
        return Err(PinnError::config(format!(
            "シナリオ {} の input_ch は {} ですが {} が指定されました",
            args.scenario.name(),
            input_ch,
            args.input_ch
        )));
    }
    if args.output_ch < output_ch {
        return Err(PinnError::config(format!(
            "シナリオ {} の output_ch には {} 以上が必要です（指定: {}）",
            args.scenario.name(),
            output_ch,
            args.output_ch
        )));
    }
    Ok(())
}

fn require_components(dataset: &SolutionDataset, needed: usize) -> PinnResult<()> {
    if dataset.n_components() < needed {
        return Err(PinnError::dataset(format!(
            "成分数 {} 以上のデータセットが必要ですが {} が与えられました",
            needed,
            dataset.n_components()
        )));
    }
    Ok(())
}

/// 拡散吸着シナリオ: 単位区間 × [0, 500]。
fn setup_diffusion_sorption<B: AutodiffBackend>(
    args: &BuildArgs<'_>,
    device: &B::Device,
) -> PinnResult<(ModelHandle<B>, SolutionDataset)> {
    let dataset = SolutionDataset::load(args.root_path, args.filename, -1)?;
    require_input_dim(&dataset, 2)?;
    let geomtime = GeomTime::new(
        SpatialDomain::Interval {
            left: 0.0,
            right: 1.0,
        },
        TimeDomain::new(0.0, 500.0),
    );
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut constraints = Vec::new();

    // 初期条件 u(0, x) = 0
    let ic_points = rows_to_tensor(&geomtime.sample_initial(NUM_INITIAL, &mut rng), 2, device);
    constraints.push(Constraint::Dirichlet {
        points: ic_points,
        values: Tensor::zeros([NUM_INITIAL, 1], device),
        component: 0,
    });
    // 流入端 u(t, 0) = 1
    let left = rows_to_tensor(&geomtime.sample_face(0, false, NUM_BOUNDARY, &mut rng), 2, device);
    constraints.push(Constraint::Dirichlet {
        points: left,
        values: Tensor::ones([NUM_BOUNDARY, 1], device),
        component: 0,
    });
    // 流出端 u - D u_x = 0
    let right = rows_to_tensor(&geomtime.sample_face(0, true, NUM_BOUNDARY, &mut rng), 2, device);
    constraints.push(Constraint::Robin {
        points: right,
        diffusivity: SORPTION_D,
        component: 0,
    });
    // 分割サンプルによる教師点
    let split = split_indices(dataset.len(), SPLIT_RATIO, SPLIT_SEED);
    let (inputs, targets) = constraint_points::<B>(&dataset, &split, device);
    constraints.push(Constraint::PointSet {
        inputs,
        targets: targets[0].clone(),
        component: 0,
    });

    let collocation = rows_to_tensor(&geomtime.sample_interior(NUM_DOMAIN, &mut rng), 2, device);
    let cfg = args.config;
    let network = FnnConfig::new(
        2,
        1,
        cfg.num_neurons,
        cfg.num_layers,
        cfg.activation,
        cfg.initialization,
    )
    .with_output_transform(Some(OutputTransform::Relu))
    .init(device);

    Ok((
        ModelHandle {
            geomtime,
            residual: PdeResidual::DiffusionSorption1d,
            constraints,
            collocation,
            network,
            n_components: 1,
        },
        dataset,
    ))
}

/// 反応拡散シナリオ: [-1, 1]² × [0, 5]。
fn setup_diffusion_reaction<B: AutodiffBackend>(
    args: &BuildArgs<'_>,
    device: &B::Device,
) -> PinnResult<(ModelHandle<B>, SolutionDataset)> {
    let dataset = SolutionDataset::load(args.root_path, args.filename, -1)?;
    require_input_dim(&dataset, 3)?;
    require_components(&dataset, 2)?;
    let geomtime = GeomTime::new(
        SpatialDomain::Rectangle {
            min: [-1.0, -1.0],
            max: [1.0, 1.0],
        },
        TimeDomain::new(0.0, 5.0),
    );
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut constraints = Vec::new();

    // 境界でゼロ勾配
    let boundary = geomtime.sample_boundary(NUM_BOUNDARY, &mut rng);
    constraints.push(Constraint::Neumann {
        points: rows_to_tensor(&boundary.points, 3, device),
        normals: rows_to_tensor(&boundary.normals, 2, device),
        component: 0,
    });
    // データセットの初期条件 (u, v)
    let (ic_inputs, ic_targets) = dataset.initial_condition();
    let ic_inputs = rows_to_tensor(&ic_inputs, 3, device);
    for component in 0..2 {
        constraints.push(Constraint::PointSet {
            inputs: ic_inputs.clone(),
            targets: column_to_tensor(&ic_targets[component], device),
            component,
        });
    }
    // 分割サンプルによる教師点 (u, v)
    let split = split_indices(dataset.len(), SPLIT_RATIO, SPLIT_SEED);
    let (inputs, targets) = constraint_points::<B>(&dataset, &split, device);
    for component in 0..2 {
        constraints.push(Constraint::PointSet {
            inputs: inputs.clone(),
            targets: targets[component].clone(),
            component,
        });
    }

    let collocation = rows_to_tensor(&geomtime.sample_interior(NUM_DOMAIN, &mut rng), 3, device);
    let cfg = args.config;
    let network = FnnConfig::new(
        3,
        2,
        cfg.num_neurons,
        cfg.num_layers,
        cfg.activation,
        cfg.initialization,
    )
    .init(device);

    Ok((
        ModelHandle {
            geomtime,
            residual: PdeResidual::DiffusionReaction2d,
            constraints,
            collocation,
            network,
            n_components: 2,
        },
        dataset,
    ))
}

/// 2次元浅水流シナリオ: [-2.5, 2.5]² × [0, 1]。
fn setup_swe2d<B: AutodiffBackend>(
    args: &BuildArgs<'_>,
    device: &B::Device,
) -> PinnResult<(ModelHandle<B>, SolutionDataset)> {
    let dataset = SolutionDataset::load(args.root_path, args.filename, -1)?;
    require_input_dim(&dataset, 3)?;
    let geomtime = GeomTime::new(
        SpatialDomain::Rectangle {
            min: [-2.5, -2.5],
            max: [2.5, 2.5],
        },
        TimeDomain::new(0.0, 1.0),
    );
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut constraints = Vec::new();

    let boundary = geomtime.sample_boundary(NUM_BOUNDARY, &mut rng);
    constraints.push(Constraint::Neumann {
        points: rows_to_tensor(&boundary.points, 3, device),
        normals: rows_to_tensor(&boundary.normals, 2, device),
        component: 0,
    });
    // 水深 h はデータセットの初期条件、速度成分は静止状態から
    let (ic_inputs, ic_targets) = dataset.initial_condition();
    constraints.push(Constraint::PointSet {
        inputs: rows_to_tensor(&ic_inputs, 3, device),
        targets: column_to_tensor(&ic_targets[0], device),
        component: 0,
    });
    let rest_points = rows_to_tensor(&geomtime.sample_initial(NUM_INITIAL, &mut rng), 3, device);
    for component in 1..3 {
        constraints.push(Constraint::Dirichlet {
            points: rest_points.clone(),
            values: Tensor::zeros([NUM_INITIAL, 1], device),
            component,
        });
    }
    let split = split_indices(dataset.len(), SPLIT_RATIO, SPLIT_SEED);
    let (inputs, targets) = constraint_points::<B>(&dataset, &split, device);
    constraints.push(Constraint::PointSet {
        inputs,
        targets: targets[0].clone(),
        component: 0,
    });

    let collocation = rows_to_tensor(&geomtime.sample_interior(NUM_DOMAIN, &mut rng), 3, device);
    let cfg = args.config;
    let network = FnnConfig::new(
        3,
        3,
        cfg.num_neurons,
        cfg.num_layers,
        cfg.activation,
        cfg.initialization,
    )
    .init(device);

    Ok((
        ModelHandle {
            geomtime,
            residual: PdeResidual::ShallowWater2d { gravity: 1.0 },
            constraints,
            collocation,
            network,
            // 水深のみデータがあるため、生出力3成分のうち1成分だけを評価する
            n_components: 1,
        },
        dataset,
    ))
}

/// 1次元PDEファミリ: 区間は呼び出し側指定、時間領域と残差はファイル名から。
fn setup_pde1d<B: AutodiffBackend>(
    args: &BuildArgs<'_>,
    device: &B::Device,
) -> PinnResult<(ModelHandle<B>, SolutionDataset)> {
    let parsed = ParsedFilename::parse(args.filename)?;
    let dataset = SolutionDataset::load(args.root_path, args.filename, args.val_batch_idx)?;
    require_input_dim(&dataset, 2)?;
    let n_components = parsed.n_components();
    require_components(&dataset, n_components)?;
    require_channels(args, 2, n_components)?;

    let geomtime = GeomTime::new(
        SpatialDomain::Interval {
            left: args.x_left,
            right: args.x_right,
        },
        TimeDomain::new(0.0, parsed.time_horizon()),
    );
    let residual = match parsed.family {
        Pde1dFamily::Advection => PdeResidual::Advection1d {
            speed: aux_param(args, 0, "移流速度")?,
        },
        Pde1dFamily::Burgers => PdeResidual::Burgers1d {
            viscosity: aux_param(args, 0, "粘性係数")?,
        },
        Pde1dFamily::ReactionDiffusion => PdeResidual::DiffusionReaction1d {
            diffusivity: aux_param(args, 0, "拡散係数")?,
            rate: aux_param(args, 1, "反応速度")?,
        },
        Pde1dFamily::CompressibleFlow => PdeResidual::CompressibleFlow1d {
            gamma: aux_param(args, 0, "比熱比")?,
        },
    };

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut constraints = Vec::new();

    if args.if_periodic_bc {
        // データセットの初期条件（成分ごと）
        let (ic_inputs, ic_targets) = dataset.initial_condition();
        let ic_inputs = rows_to_tensor(&ic_inputs, 2, device);
        for component in 0..n_components {
            constraints.push(Constraint::PointSet {
                inputs: ic_inputs.clone(),
                targets: column_to_tensor(&ic_targets[component], device),
                component,
            });
        }
        let (left, right) = geomtime.sample_periodic_pairs(NUM_BOUNDARY, &mut rng);
        let left = rows_to_tensor(&left, 2, device);
        let right = rows_to_tensor(&right, 2, device);
        for component in 0..n_components {
            constraints.push(Constraint::Periodic {
                left: left.clone(),
                right: right.clone(),
                component,
            });
        }
    } else {
        // 正弦波の初期条件と、データセットの境界トレース
        let rows = geomtime.sample_initial(NUM_INITIAL, &mut rng);
        let values: Vec<f32> = rows.chunks(2).map(|r| -(PI * r[1]).sin()).collect();
        constraints.push(Constraint::Dirichlet {
            points: rows_to_tensor(&rows, 2, device),
            values: column_to_tensor(&values, device),
            component: 0,
        });
        let trace = dataset.boundary_condition()?;
        constraints.push(Constraint::PointSet {
            inputs: rows_to_tensor(&trace.left_inputs, 2, device),
            targets: column_to_tensor(&trace.left_values, device),
            component: 0,
        });
        constraints.push(Constraint::PointSet {
            inputs: rows_to_tensor(&trace.right_inputs, 2, device),
            targets: column_to_tensor(&trace.right_values, device),
            component: 0,
        });
    }

    let collocation = rows_to_tensor(&geomtime.sample_interior(NUM_DOMAIN, &mut rng), 2, device);
    let cfg = args.config;
    let network = FnnConfig::new(
        args.input_ch,
        args.output_ch,
        cfg.num_neurons,
        cfg.num_layers,
        cfg.activation,
        cfg.initialization,
    )
    .init(device);

    Ok((
        ModelHandle {
            geomtime,
            residual,
            constraints,
            collocation,
            network,
            n_components,
        },
        dataset,
    ))
}

/// 2次元圧縮性流体: [-1, 1]² × [0, 1]。
fn setup_cfd2d<B: AutodiffBackend>(
    args: &BuildArgs<'_>,
    device: &B::Device,
) -> PinnResult<(ModelHandle<B>, SolutionDataset)> {
    let dataset = SolutionDataset::load(args.root_path, args.filename, args.val_batch_idx)?;
    require_input_dim(&dataset, 3)?;
    require_components(&dataset, 4)?;
    require_channels(args, 3, 4)?;
    let geomtime = GeomTime::new(
        SpatialDomain::Rectangle {
            min: [-1.0, -1.0],
            max: [1.0, 1.0],
        },
        TimeDomain::new(0.0, 1.0),
    );
    let gamma = aux_param(args, 0, "比熱比")?;
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut constraints = Vec::new();

    // 初期条件 (ρ, vx, vy, p)
    let (ic_inputs, ic_targets) = dataset.initial_condition();
    let ic_inputs = rows_to_tensor(&ic_inputs, 3, device);
    for component in 0..4 {
        constraints.push(Constraint::PointSet {
            inputs: ic_inputs.clone(),
            targets: column_to_tensor(&ic_targets[component], device),
            component,
        });
    }

    let collocation = rows_to_tensor(&geomtime.sample_interior(NUM_DOMAIN, &mut rng), 3, device);
    let cfg = args.config;
    let network = FnnConfig::new(
        args.input_ch,
        args.output_ch,
        cfg.num_neurons,
        cfg.num_layers,
        cfg.activation,
        cfg.initialization,
    )
    .init(device);

    Ok((
        ModelHandle {
            geomtime,
            residual: PdeResidual::CompressibleFlow2d { gamma },
            constraints,
            collocation,
            network,
            n_components: 4,
        },
        dataset,
    ))
}

/// 3次元圧縮性流体: 単位立方体 × [0, 1]。
fn setup_cfd3d<B: AutodiffBackend>(
    args: &BuildArgs<'_>,
    device: &B::Device,
) -> PinnResult<(ModelHandle<B>, SolutionDataset)> {
    let dataset = SolutionDataset::load(args.root_path, args.filename, args.val_batch_idx)?;
    require_input_dim(&dataset, 4)?;
    require_components(&dataset, 5)?;
    require_channels(args, 4, 5)?;
    let geomtime = GeomTime::new(
        SpatialDomain::Cuboid {
            min: [0.0, 0.0, 0.0],
            max: [1.0, 1.0, 1.0],
        },
        TimeDomain::new(0.0, 1.0),
    );
    let gamma = aux_param(args, 0, "比熱比")?;
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut constraints = Vec::new();

    // 初期条件 (ρ, vx, vy, vz, p)
    let (ic_inputs, ic_targets) = dataset.initial_condition();
    let ic_inputs = rows_to_tensor(&ic_inputs, 4, device);
    for component in 0..5 {
        constraints.push(Constraint::PointSet {
            inputs: ic_inputs.clone(),
            targets: column_to_tensor(&ic_targets[component], device),
            component,
        });
    }
    // 全成分の周期境界
    let (left, right) = geomtime.sample_periodic_pairs(NUM_BOUNDARY, &mut rng);
    let left = rows_to_tensor(&left, 4, device);
    let right = rows_to_tensor(&right, 4, device);
    for component in 0..5 {
        constraints.push(Constraint::Periodic {
            left: left.clone(),
            right: right.clone(),
            component,
        });
    }

    let collocation = rows_to_tensor(&geomtime.sample_interior(NUM_DOMAIN, &mut rng), 4, device);
    let cfg = args.config;
    let network = FnnConfig::new(
        args.input_ch,
        args.output_ch,
        cfg.num_neurons,
        cfg.num_layers,
        cfg.activation,
        cfg.initialization,
    )
    .init(device);

    Ok((
        ModelHandle {
            geomtime,
            residual: PdeResidual::CompressibleFlow3d { gamma },
            constraints,
            collocation,
            network,
            n_components: 5,
        },
        dataset,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::testutil::grid_file;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray<f32>>;

    fn write_fixture(name: &str, file: crate::dataset::SolutionFile) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("pinn-bench-scenario-fixtures");
        std::fs::create_dir_all(&dir).unwrap();
        file.save(&dir.join(name)).unwrap();
        dir
    }

    fn args<'a>(
        scenario: Scenario,
        filename: &'a str,
        root: &'a std::path::Path,
        config: &'a TrainConfig,
        input_ch: usize,
        output_ch: usize,
        aux: &'a [f32],
    ) -> BuildArgs<'a> {
        BuildArgs {
            scenario,
            filename,
            root_path: root,
            val_batch_idx: -1,
            config,
            input_ch,
            output_ch,
            x_left: 0.0,
            x_right: 1.0,
            if_periodic_bc: true,
            aux_params: aux,
            seed: 0,
        }
    }

    #[test]
    fn unknown_scenario_is_an_unimplemented_error() {
        assert!(matches!(
            Scenario::parse("kdv"),
            Err(PinnError::UnimplementedScenario { .. })
        ));
        assert_eq!(Scenario::parse("diff-react").unwrap(), Scenario::DiffReact);
        assert_eq!(Scenario::parse("CFD3D").unwrap(), Scenario::Cfd3d);
    }

    #[test]
    fn diff_sorp_selects_one_component_with_rectified_output() {
        let root = write_fixture("1D_diff-sorp_NA_NA.bin", grid_file(4, &[10], 1, 1));
        let config = TrainConfig {
            num_neurons: 8,
            num_layers: 2,
            ..TrainConfig::default()
        };
        let a = args(
            Scenario::DiffSorp,
            "1D_diff-sorp_NA_NA.bin",
            &root,
            &config,
            2,
            1,
            &[],
        );
        let device = Default::default();
        let (handle, dataset) = build_scenario::<TestBackend>(&a, &device).unwrap();
        assert_eq!(handle.n_components, 1);
        assert_eq!(handle.residual, PdeResidual::DiffusionSorption1d);
        // ゼロ初期条件 + 流入端 + 流出端 + 分割サンプル
        assert_eq!(handle.constraints.len(), 4);
        assert!(
            handle
                .constraints
                .iter()
                .any(|c| matches!(c, Constraint::Robin { .. }))
        );
        // 整流変換により濃度の予測は非負になる
        let out: Vec<f32> = handle
            .network
            .forward(handle.collocation.clone())
            .into_data()
            .to_vec()
            .unwrap();
        assert!(out.iter().all(|v| *v >= 0.0));
        // 分割サンプルは全サンプルの30%
        let expected = (dataset.len() as f64 * SPLIT_RATIO) as usize;
        assert!(handle.constraints.iter().any(|c| matches!(
            c,
            Constraint::PointSet { inputs, .. } if inputs.dims()[0] == expected
        )));
    }

    #[test]
    fn diff_react_selects_two_components() {
        let root = write_fixture("2D_diff-react_NA_NA.bin", grid_file(4, &[5, 5], 2, 1));
        let config = TrainConfig {
            num_neurons: 8,
            num_layers: 2,
            ..TrainConfig::default()
        };
        let a = args(
            Scenario::DiffReact,
            "2D_diff-react_NA_NA.bin",
            &root,
            &config,
            3,
            2,
            &[],
        );
        let device = Default::default();
        let (handle, dataset) = build_scenario::<TestBackend>(&a, &device).unwrap();
        assert_eq!(handle.n_components, 2);
        assert_eq!(dataset.n_components(), 2);
        // Neumann + IC×2 + 分割サンプル×2
        assert_eq!(handle.constraints.len(), 5);
        let out = handle.network.forward(handle.collocation.clone());
        assert_eq!(out.dims(), [NUM_DOMAIN, 2]);
    }

    #[test]
    fn swe2d_keeps_one_component_with_three_raw_outputs() {
        let root = write_fixture("radial_dam_break_0000.bin", grid_file(4, &[5, 5], 1, 1));
        let config = TrainConfig {
            num_neurons: 8,
            num_layers: 2,
            ..TrainConfig::default()
        };
        let a = args(
            Scenario::Swe2d,
            "radial_dam_break_0000.bin",
            &root,
            &config,
            3,
            3,
            &[],
        );
        let device = Default::default();
        let (handle, _) = build_scenario::<TestBackend>(&a, &device).unwrap();
        assert_eq!(handle.n_components, 1);
        let out = handle.network.forward(handle.collocation.clone());
        assert_eq!(out.dims(), [NUM_DOMAIN, 3]);
    }

    #[test]
    fn pde1d_advection_uses_periodic_constraints() {
        let root = write_fixture("1D_Advection_Sols_beta0.4.bin", grid_file(6, &[8], 1, 3));
        let config = TrainConfig {
            num_neurons: 8,
            num_layers: 2,
            ..TrainConfig::default()
        };
        let a = args(
            Scenario::Pde1d,
            "1D_Advection_Sols_beta0.4.bin",
            &root,
            &config,
            2,
            1,
            &[0.4],
        );
        let device = Default::default();
        let (handle, _) = build_scenario::<TestBackend>(&a, &device).unwrap();
        assert_eq!(handle.n_components, 1);
        assert_eq!(handle.residual, PdeResidual::Advection1d { speed: 0.4 });
        assert!(
            handle
                .constraints
                .iter()
                .any(|c| matches!(c, Constraint::Periodic { .. }))
        );
    }

    #[test]
    fn pde1d_without_periodic_bc_uses_sine_ic_and_boundary_traces() {
        let root = write_fixture("1D_Advection_Sols_beta0.2.bin", grid_file(6, &[8], 1, 1));
        let config = TrainConfig {
            num_neurons: 8,
            num_layers: 2,
            ..TrainConfig::default()
        };
        let mut a = args(
            Scenario::Pde1d,
            "1D_Advection_Sols_beta0.2.bin",
            &root,
            &config,
            2,
            1,
            &[0.2],
        );
        a.if_periodic_bc = false;
        let device = Default::default();
        let (handle, _) = build_scenario::<TestBackend>(&a, &device).unwrap();
        // 正弦波の Dirichlet + 左右の境界トレース
        assert_eq!(handle.constraints.len(), 3);
        assert!(
            handle
                .constraints
                .iter()
                .all(|c| !matches!(c, Constraint::Periodic { .. }))
        );
        assert!(
            handle
                .constraints
                .iter()
                .any(|c| matches!(c, Constraint::Dirichlet { .. }))
        );
    }

    #[test]
    fn pde1d_without_aux_params_is_a_config_error() {
        let root = write_fixture("1D_Burgers_Sols_Nu0.01.bin", grid_file(6, &[8], 1, 1));
        let config = TrainConfig::default();
        let a = args(
            Scenario::Pde1d,
            "1D_Burgers_Sols_Nu0.01.bin",
            &root,
            &config,
            2,
            1,
            &[],
        );
        let device = Default::default();
        assert!(matches!(
            build_scenario::<TestBackend>(&a, &device),
            Err(PinnError::Config { .. })
        ));
    }

    #[test]
    fn cfd_scenarios_select_four_and_five_components() {
        let config = TrainConfig {
            num_neurons: 8,
            num_layers: 2,
            ..TrainConfig::default()
        };
        let device: <TestBackend as burn::prelude::Backend>::Device = Default::default();

        let root = write_fixture("2D_CFD_Rand_periodic_Train.bin", grid_file(3, &[4, 4], 4, 2));
        let a = args(
            Scenario::Cfd2d,
            "2D_CFD_Rand_periodic_Train.bin",
            &root,
            &config,
            3,
            4,
            &[1.6667],
        );
        let (handle, _) = build_scenario::<TestBackend>(&a, &device).unwrap();
        assert_eq!(handle.n_components, 4);

        let root = write_fixture(
            "3D_CFD_Rand_periodic_Train.bin",
            grid_file(3, &[3, 3, 3], 5, 2),
        );
        let a = args(
            Scenario::Cfd3d,
            "3D_CFD_Rand_periodic_Train.bin",
            &root,
            &config,
            4,
            5,
            &[1.6667],
        );
        let (handle, _) = build_scenario::<TestBackend>(&a, &device).unwrap();
        assert_eq!(handle.n_components, 5);
        assert!(
            handle
                .constraints
                .iter()
                .any(|c| matches!(c, Constraint::Periodic { .. }))
        );
    }
}
