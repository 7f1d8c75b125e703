//! 境界・初期・データ制約。
//!
//! 各制約は構築時に点をサンプリング（またはデータセットから取得）済みで、
//! モデルを与えるとその時点での損失を返します。制約の並び順は意味を
//! 持ちませんが、損失重みの並びとは対応します。

use burn::nn::loss::{MseLoss, Reduction};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::model::Fnn;
use crate::pinn::{col, component_grads, residual_mse};

/// 点ごとの教師信号・境界条件の閉じた集合。
#[derive(Debug, Clone)]
pub enum Constraint<B: AutodiffBackend> {
    /// 点集合上の教師信号（初期条件データや分割サンプル）
    PointSet {
        inputs: Tensor<B, 2>,
        targets: Tensor<B, 2>,
        component: usize,
    },
    /// 境界値の固定
    Dirichlet {
        points: Tensor<B, 2>,
        values: Tensor<B, 2>,
        component: usize,
    },
    /// 法線方向微分をゼロに拘束
    Neumann {
        points: Tensor<B, 2>,
        normals: Tensor<B::InnerBackend, 2>,
        component: usize,
    },
    /// 対向する面で値が一致する周期境界
    Periodic {
        left: Tensor<B, 2>,
        right: Tensor<B, 2>,
        component: usize,
    },
    /// 右端の流出境界 u - D u_x = 0
    Robin {
        points: Tensor<B, 2>,
        diffusivity: f32,
        component: usize,
    },
}

impl<B: AutodiffBackend> Constraint<B> {
    /// この制約の損失を計算します。
    pub fn loss(&self, model: &Fnn<B>) -> Tensor<B, 1> {
        match self {
            Constraint::PointSet {
                inputs,
                targets,
                component,
            }
            | Constraint::Dirichlet {
                points: inputs,
                values: targets,
                component,
            } => {
                let n = inputs.dims()[0];
                let pred = model
                    .forward(inputs.clone())
                    .slice([0..n, *component..component + 1]);
                MseLoss::new().forward(pred, targets.clone(), Reduction::Mean)
            }
            Constraint::Neumann {
                points,
                normals,
                component,
            } => {
                let (_, du) = component_grads(model, points, *component);
                let n = points.dims()[0];
                let spatial_dim = normals.dims()[1];
                // 微分テンソルの空間列と法線の内積
                let spatial = du.slice([0..n, 1..1 + spatial_dim]);
                let normal_deriv = (spatial * normals.clone()).sum_dim(1);
                residual_mse::<B>(vec![normal_deriv])
            }
            Constraint::Periodic {
                left,
                right,
                component,
            } => {
                let n = left.dims()[0];
                let pred_left = model
                    .forward(left.clone())
                    .slice([0..n, *component..component + 1]);
                let pred_right = model
                    .forward(right.clone())
                    .slice([0..n, *component..component + 1]);
                MseLoss::new().forward(pred_left, pred_right, Reduction::Mean)
            }
            Constraint::Robin {
                points,
                diffusivity,
                component,
            } => {
                let (u, du) = component_grads(model, points, *component);
                let residual = u - col(&du, 1).mul_scalar(*diffusivity);
                residual_mse::<B>(vec![residual])
            }
        }
    }

    /// ログ表示用の種別名。
    pub fn label(&self) -> &'static str {
        match self {
            Constraint::PointSet { .. } => "point-set",
            Constraint::Dirichlet { .. } => "dirichlet",
            Constraint::Neumann { .. } => "neumann",
            Constraint::Periodic { .. } => "periodic",
            Constraint::Robin { .. } => "robin",
        }
    }
}
