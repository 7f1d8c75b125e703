//! 学習設定。
//!
//! ネットワーク構造（幅・深さ・活性化・初期化）とオプティマイザ・損失重み・
//! 学習率減衰スケジュールをひとつの構造体にまとめます。JSONファイルから
//! `serde` で読み込めます。認識できない文字列値は読込時に設定エラーになります。

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PinnError, PinnResult};

/// 隠れ層の活性化関数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Tanh,
    Relu,
    Gelu,
    Sigmoid,
}

/// 重みの初期化方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Initialization {
    #[serde(rename = "Glorot normal")]
    GlorotNormal,
    #[serde(rename = "Glorot uniform")]
    GlorotUniform,
    #[serde(rename = "He normal")]
    HeNormal,
    #[serde(rename = "He uniform")]
    HeUniform,
}

/// オプティマイザの種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    Adam,
    Sgd,
}

/// 学習率の減衰スケジュール。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Decay {
    /// lr = base / (1 + rate * iter / steps)
    InverseTime { decay_steps: usize, decay_rate: f64 },
    /// lr = base * rate^(iter / steps)
    Step { decay_steps: usize, decay_rate: f64 },
}

impl Decay {
    /// 反復回数に応じた学習率を返します。
    pub fn apply(&self, base_lr: f64, iteration: usize) -> f64 {
        match self {
            Decay::InverseTime {
                decay_steps,
                decay_rate,
            } => {
                let steps = (*decay_steps).max(1);
                base_lr / (1.0 + decay_rate * iteration as f64 / steps as f64)
            }
            Decay::Step {
                decay_steps,
                decay_rate,
            } => {
                let steps = (*decay_steps).max(1);
                base_lr * decay_rate.powi((iteration / steps) as i32)
            }
        }
    }
}

/// シナリオ共通の学習設定。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TrainConfig {
    /// 隠れ層のユニット数
    pub num_neurons: usize,
    /// 隠れ層の数
    pub num_layers: usize,
    pub activation: Activation,
    pub initialization: Initialization,
    pub optimizer: OptimizerKind,
    /// 損失項ごとの重み。先頭が残差損失、以降は制約の構築順。
    pub loss_weights: Option<Vec<f32>>,
    pub decay: Option<Decay>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            num_neurons: 40,
            num_layers: 6,
            activation: Activation::Tanh,
            initialization: Initialization::GlorotNormal,
            optimizer: OptimizerKind::Adam,
            loss_weights: None,
            decay: None,
        }
    }
}

impl TrainConfig {
    /// JSONファイルから設定を読み込みます。
    pub fn load(path: &Path) -> PinnResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| PinnError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| PinnError::config(format!("{path:?}: {e}")))
    }

    /// 減衰スケジュールを適用した反復時点の学習率。
    pub fn learning_rate(&self, base_lr: f64, iteration: usize) -> f64 {
        match &self.decay {
            Some(decay) => decay.apply(base_lr, iteration),
            None => base_lr,
        }
    }

    /// 損失項数に対する重みベクトルを解決します。
    ///
    /// 未指定なら全項 1.0。長さが合わない場合は設定エラー。
    pub fn resolve_loss_weights(&self, n_terms: usize) -> PinnResult<Vec<f32>> {
        match &self.loss_weights {
            None => Ok(vec![1.0; n_terms]),
            Some(w) if w.len() == n_terms => Ok(w.clone()),
            Some(w) => Err(PinnError::config(format!(
                "loss_weights の長さ {} が損失項数 {} と一致しません",
                w.len(),
                n_terms
            ))),
        }
    }
}
