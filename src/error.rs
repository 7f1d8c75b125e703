//! クレート全体で使う統一エラー型。
//!
//! シナリオ名やデータセットファイル名の検証エラーは、学習を開始する前に
//! この型の明示的なバリアントとして報告されます。

use std::path::PathBuf;
use thiserror::Error;

/// クレート共通の結果型エイリアス。
pub type PinnResult<T> = Result<T, PinnError>;

/// 学習オーケストレーション全体の統一エラー型。
#[derive(Error, Debug)]
pub enum PinnError {
    /// 未対応のシナリオ名が指定された。
    #[error("未実装のシナリオです: {name}")]
    UnimplementedScenario { name: String },

    /// データセットファイル名が命名規則に従っていない。
    #[error("ファイル名の形式を解釈できません: {filename} ({reason})")]
    UnrecognizedFilename { filename: String, reason: String },

    /// 設定値の不備。
    #[error("設定エラー: {message}")]
    Config { message: String },

    /// データセットの内容が宣言された形状と一致しない等。
    #[error("データセットエラー: {message}")]
    Dataset { message: String },

    /// ファイル入出力の失敗。
    #[error("IOエラー: {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// データセットコンテナのエンコード/デコード失敗。
    #[error("シリアライズエラー: {message}")]
    Serde { message: String },

    /// 学習済みモデルの保存・読込失敗。
    #[error("チェックポイントエラー: {message}")]
    Checkpoint { message: String },
}

impl PinnError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn dataset(message: impl Into<String>) -> Self {
        Self::Dataset {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
