//! 物理損失（PDE残差）の計算。
//!
//! 各PDEファミリの残差（方程式の各項を移項した結果、0になるべき値）を
//! コロケーション点上で評価し、その二乗平均誤差を損失として返します。
//!
//! 一階微分は自動微分で求めます。二階微分はフレームワークが二重逆伝播を
//! 持たないため、自動微分した一階微分の中心差分で近似します。
//!
//! 入力列のレイアウトは `[t, x, (y, z)]` です。

use std::f32::consts::PI;

use burn::nn::loss::{MseLoss, Reduction};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::model::Fnn;

/// 中心差分の刻み幅。
const FD_STEP: f32 = 1e-3;

/// 拡散吸着系の物性定数。
pub(crate) const SORPTION_D: f32 = 5e-4;
const SORPTION_POROSITY: f32 = 0.29;
const SORPTION_RHO_S: f32 = 2880.0;
const SORPTION_K_F: f32 = 3.5e-4;
const SORPTION_N_F: f32 = 0.874;

/// FitzHugh-Nagumo 反応拡散系の定数。
const REACT2D_DU: f32 = 1e-3;
const REACT2D_DV: f32 = 5e-3;
const REACT2D_K: f32 = 5e-3;

/// シナリオに束縛されるPDE残差の閉じた集合。
#[derive(Debug, Clone, PartialEq)]
pub enum PdeResidual {
    Advection1d { speed: f32 },
    Burgers1d { viscosity: f32 },
    DiffusionReaction1d { diffusivity: f32, rate: f32 },
    DiffusionSorption1d,
    DiffusionReaction2d,
    ShallowWater2d { gravity: f32 },
    CompressibleFlow1d { gamma: f32 },
    CompressibleFlow2d { gamma: f32 },
    CompressibleFlow3d { gamma: f32 },
}

impl PdeResidual {
    /// コロケーション点上の物理損失を計算します。
    pub fn loss<B: AutodiffBackend>(
        &self,
        model: &Fnn<B>,
        coords: &Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        match self {
            PdeResidual::Advection1d { speed } => {
                let (_, du) = component_grads(model, coords, 0);
                let residual = col(&du, 0) + col(&du, 1).mul_scalar(*speed);
                residual_mse::<B>(vec![residual])
            }
            PdeResidual::Burgers1d { viscosity } => {
                let (u, du) = component_grads(model, coords, 0);
                let u_xx = second_derivative(model, coords, 0, 1);
                let residual =
                    col(&du, 0) + u * col(&du, 1) - u_xx.mul_scalar(viscosity / PI);
                residual_mse::<B>(vec![residual])
            }
            PdeResidual::DiffusionReaction1d { diffusivity, rate } => {
                let (u, du) = component_grads(model, coords, 0);
                let u_xx = second_derivative(model, coords, 0, 1);
                let reaction = u.clone().mul_scalar(*rate) * (u.ones_like() - u);
                let residual = col(&du, 0) - u_xx.mul_scalar(*diffusivity) - reaction;
                residual_mse::<B>(vec![residual])
            }
            PdeResidual::DiffusionSorption1d => {
                let (u, du) = component_grads(model, coords, 0);
                let u_xx = second_derivative(model, coords, 0, 1);
                // Freundlich 吸着等温線による遅延係数。濃度は下駄を履かせて正に保つ
                let retardation = u
                    .clamp_min(1e-6)
                    .powf_scalar(SORPTION_N_F - 1.0)
                    .mul_scalar(
                        (1.0 - SORPTION_POROSITY) / SORPTION_POROSITY
                            * SORPTION_RHO_S
                            * SORPTION_K_F
                            * SORPTION_N_F,
                    )
                    .add_scalar(1.0);
                let residual = col(&du, 0) - u_xx.mul_scalar(SORPTION_D) / retardation;
                residual_mse::<B>(vec![residual])
            }
            PdeResidual::DiffusionReaction2d => {
                let (u, du) = component_grads(model, coords, 0);
                let (v, dv) = component_grads(model, coords, 1);
                let u_lap = second_derivative(model, coords, 0, 1)
                    + second_derivative(model, coords, 0, 2);
                let v_lap = second_derivative(model, coords, 1, 1)
                    + second_derivative(model, coords, 1, 2);
                let u_cubed = u.clone() * u.clone() * u.clone();
                let r_u = col(&du, 0) - u_lap.mul_scalar(REACT2D_DU) - u.clone()
                    + u_cubed
                    + v.clone()
                    + u.ones_like().mul_scalar(REACT2D_K);
                let r_v = col(&dv, 0) - v_lap.mul_scalar(REACT2D_DV) - u + v;
                residual_mse::<B>(vec![r_u, r_v])
            }
            PdeResidual::ShallowWater2d { gravity } => {
                let (h, dh) = component_grads(model, coords, 0);
                let (u, du) = component_grads(model, coords, 1);
                let (v, dv) = component_grads(model, coords, 2);
                let continuity = col(&dh, 0)
                    + u.clone() * col(&dh, 1)
                    + h.clone() * col(&du, 1)
                    + v.clone() * col(&dh, 2)
                    + h * col(&dv, 2);
                let momentum_x = col(&du, 0)
                    + u.clone() * col(&du, 1)
                    + v.clone() * col(&du, 2)
                    + col(&dh, 1).mul_scalar(*gravity);
                let momentum_y = col(&dv, 0)
                    + u * col(&dv, 1)
                    + v * col(&dv, 2)
                    + col(&dh, 2).mul_scalar(*gravity);
                residual_mse::<B>(vec![continuity, momentum_x, momentum_y])
            }
            PdeResidual::CompressibleFlow1d { gamma } => {
                let (rho, drho) = component_grads(model, coords, 0);
                let (vx, dvx) = component_grads(model, coords, 1);
                let (p, dp) = component_grads(model, coords, 2);
                let continuity = col(&drho, 0)
                    + vx.clone() * col(&drho, 1)
                    + rho.clone() * col(&dvx, 1);
                let momentum =
                    rho * (col(&dvx, 0) + vx.clone() * col(&dvx, 1)) + col(&dp, 1);
                let pressure = col(&dp, 0)
                    + vx * col(&dp, 1)
                    + p.mul_scalar(*gamma) * col(&dvx, 1);
                residual_mse::<B>(vec![continuity, momentum, pressure])
            }
            PdeResidual::CompressibleFlow2d { gamma } => {
                let (rho, drho) = component_grads(model, coords, 0);
                let (vx, dvx) = component_grads(model, coords, 1);
                let (vy, dvy) = component_grads(model, coords, 2);
                let (p, dp) = component_grads(model, coords, 3);
                let divergence = col(&dvx, 1) + col(&dvy, 2);
                let continuity = col(&drho, 0)
                    + vx.clone() * col(&drho, 1)
                    + vy.clone() * col(&drho, 2)
                    + rho.clone() * divergence.clone();
                let momentum_x = rho.clone()
                    * (col(&dvx, 0) + vx.clone() * col(&dvx, 1) + vy.clone() * col(&dvx, 2))
                    + col(&dp, 1);
                let momentum_y = rho
                    * (col(&dvy, 0) + vx.clone() * col(&dvy, 1) + vy.clone() * col(&dvy, 2))
                    + col(&dp, 2);
                let pressure = col(&dp, 0)
                    + vx * col(&dp, 1)
                    + vy * col(&dp, 2)
                    + p.mul_scalar(*gamma) * divergence;
                residual_mse::<B>(vec![continuity, momentum_x, momentum_y, pressure])
            }
            PdeResidual::CompressibleFlow3d { gamma } => {
                let (rho, drho) = component_grads(model, coords, 0);
                let (vx, dvx) = component_grads(model, coords, 1);
                let (vy, dvy) = component_grads(model, coords, 2);
                let (vz, dvz) = component_grads(model, coords, 3);
                let (p, dp) = component_grads(model, coords, 4);
                let divergence = col(&dvx, 1) + col(&dvy, 2) + col(&dvz, 3);
                let advect = |d: &Tensor<B::InnerBackend, 2>| {
                    vx.clone() * col(d, 1) + vy.clone() * col(d, 2) + vz.clone() * col(d, 3)
                };
                let continuity = col(&drho, 0) + advect(&drho) + rho.clone() * divergence.clone();
                let momentum_x = rho.clone() * (col(&dvx, 0) + advect(&dvx)) + col(&dp, 1);
                let momentum_y = rho.clone() * (col(&dvy, 0) + advect(&dvy)) + col(&dp, 2);
                let momentum_z = rho * (col(&dvz, 0) + advect(&dvz)) + col(&dp, 3);
                let pressure =
                    col(&dp, 0) + advect(&dp) + p.mul_scalar(*gamma) * divergence;
                residual_mse::<B>(vec![
                    continuity, momentum_x, momentum_y, momentum_z, pressure,
                ])
            }
        }
    }

    /// 残差が参照する出力成分の数。
    pub fn n_equations(&self) -> usize {
        match self {
            PdeResidual::Advection1d { .. }
            | PdeResidual::Burgers1d { .. }
            | PdeResidual::DiffusionReaction1d { .. }
            | PdeResidual::DiffusionSorption1d => 1,
            PdeResidual::DiffusionReaction2d => 2,
            PdeResidual::ShallowWater2d { .. } | PdeResidual::CompressibleFlow1d { .. } => 3,
            PdeResidual::CompressibleFlow2d { .. } => 4,
            PdeResidual::CompressibleFlow3d { .. } => 5,
        }
    }
}

/// 指定成分の値と、入力座標に対する一階微分を返します。
///
/// 微分は内部バックエンドのテンソルとして返り、残差を組み立てたあとに
/// `from_inner` で自動微分の系譜へ持ち上げます。
pub(crate) fn component_grads<B: AutodiffBackend>(
    model: &Fnn<B>,
    coords: &Tensor<B, 2>,
    component: usize,
) -> (Tensor<B::InnerBackend, 2>, Tensor<B::InnerBackend, 2>) {
    let n = coords.dims()[0];
    let coords_grad = coords.clone().require_grad();
    let output = model.forward(coords_grad.clone());
    let u = output.slice([0..n, component..component + 1]);
    let grads = u.clone().sum().backward();
    let du = coords_grad.grad(&grads).unwrap();
    (u.inner(), du)
}

/// 一階微分の中心差分による二階微分の近似。
fn second_derivative<B: AutodiffBackend>(
    model: &Fnn<B>,
    coords: &Tensor<B, 2>,
    component: usize,
    dim: usize,
) -> Tensor<B::InnerBackend, 2> {
    let (_, plus) = component_grads(model, &shifted(coords, dim, FD_STEP), component);
    let (_, minus) = component_grads(model, &shifted(coords, dim, -FD_STEP), component);
    (col(&plus, dim) - col(&minus, dim)).div_scalar(2.0 * FD_STEP)
}

/// 座標を1軸だけ平行移動します。
fn shifted<B: AutodiffBackend>(coords: &Tensor<B, 2>, dim: usize, h: f32) -> Tensor<B, 2> {
    let [_, d] = coords.dims();
    let mut offset = vec![0.0_f32; d];
    offset[dim] = h;
    let offset = Tensor::<B, 1>::from_floats(offset.as_slice(), &coords.device()).unsqueeze::<2>();
    coords.clone() + offset
}

/// 微分テンソルから1列を取り出します。
pub(crate) fn col<Bk: Backend>(grads: &Tensor<Bk, 2>, dim: usize) -> Tensor<Bk, 2> {
    let n = grads.dims()[0];
    grads.clone().slice([0..n, dim..dim + 1])
}

/// 残差列を連結して持ち上げ、ゼロとの二乗平均誤差を返します。
pub(crate) fn residual_mse<B: AutodiffBackend>(
    columns: Vec<Tensor<B::InnerBackend, 2>>,
) -> Tensor<B, 1> {
    let residual_inner = Tensor::cat(columns, 1);
    let residual = Tensor::<B, 2>::from_inner(residual_inner);
    MseLoss::new().forward(
        residual.clone(),
        Tensor::zeros_like(&residual),
        Reduction::Mean,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Activation, Initialization};
    use crate::model::FnnConfig;
    use burn::backend::{Autodiff, NdArray};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    type TestBackend = Autodiff<NdArray<f32>>;

    fn sample_coords(n: usize, input_dim: usize) -> Tensor<TestBackend, 2> {
        use rand::Rng;
        let mut rng = StdRng::seed_from_u64(11);
        let rows: Vec<f32> = (0..n * input_dim)
            .map(|_| rng.random_range(0.05..0.95))
            .collect();
        Tensor::<TestBackend, 1>::from_floats(rows.as_slice(), &Default::default())
            .reshape([n, input_dim])
    }

    fn model(input_dim: usize, output_dim: usize) -> crate::model::Fnn<TestBackend> {
        FnnConfig::new(
            input_dim,
            output_dim,
            8,
            2,
            Activation::Tanh,
            Initialization::GlorotNormal,
        )
        .init(&Default::default())
    }

    #[test]
    fn every_residual_yields_a_finite_scalar() {
        let cases: Vec<(PdeResidual, usize, usize)> = vec![
            (PdeResidual::Advection1d { speed: 0.4 }, 2, 1),
            (PdeResidual::Burgers1d { viscosity: 0.01 }, 2, 1),
            (
                PdeResidual::DiffusionReaction1d {
                    diffusivity: 0.5,
                    rate: 1.0,
                },
                2,
                1,
            ),
            (PdeResidual::DiffusionSorption1d, 2, 1),
            (PdeResidual::DiffusionReaction2d, 3, 2),
            (PdeResidual::ShallowWater2d { gravity: 1.0 }, 3, 3),
            (PdeResidual::CompressibleFlow1d { gamma: 1.6667 }, 2, 3),
            (PdeResidual::CompressibleFlow2d { gamma: 1.6667 }, 3, 4),
            (PdeResidual::CompressibleFlow3d { gamma: 1.6667 }, 4, 5),
        ];
        for (residual, input_dim, output_dim) in cases {
            let model = model(input_dim, output_dim);
            let coords = sample_coords(16, input_dim);
            let loss: f32 = residual.loss(&model, &coords).into_scalar();
            assert!(loss.is_finite(), "{residual:?} の損失が有限ではありません");
            assert!(loss >= 0.0);
            assert_eq!(residual.n_equations(), output_dim);
        }
    }

    #[test]
    fn residual_loss_is_differentiable() {
        // 持ち上げた残差損失から逆伝播が走ること
        let model = model(2, 1);
        let coords = sample_coords(8, 2);
        let loss = PdeResidual::Advection1d { speed: 1.0 }.loss(&model, &coords);
        let _grads = loss.backward();
    }
}
