//! # 物理情報ニューラルネットワーク (PINN) ベンチマークドライバ
//!
//! `burn` フレームワークを使用して、PDEベンチマークの参照解データセットに
//! 対する物理情報ニューラルネットワーク（PINN）の学習を構成・実行する
//! ためのコンポーネントを提供します。
//!
//! シナリオ（拡散反応・拡散吸着・2次元浅水流・1次元PDEファミリ・
//! 2/3次元圧縮性流体）ごとに時空間ドメインと制約集合を組み立て、
//! 残差損失とデータ損失の複合損失で学習し、保留したテストスライスで
//! 予測誤差を評価します。

pub mod cli;
pub mod config;
pub mod constraint;
pub mod dataset;
pub mod error;
pub mod filename;
pub mod geometry;
pub mod inference;
pub mod metrics;
pub mod model;
pub mod pinn;
pub mod run;
pub mod scenario;
pub mod split;
pub mod training;

/// モデルを保存する既定のファイル名
pub const MODEL_FILENAME: &str = "pinn_model.mpk";
