//! # 物理情報ニューラルネットワーク (PINN) ベンチマークドライバ
//!
//! `burn` フレームワークを使用して、PDEベンチマークのシナリオに対する
//! 物理情報ニューラルネットワーク（PINN）の学習と評価を実行します。
//!
//! `clap` クレートを利用して、コマンドラインから`train`（学習）と`infer`（推論）の
//! 機能を個別に実行できます。
//!
//! ## 使い方
//!
//! ### 学習
//! ```bash
//! cargo run --release -- train --scenario diff-react --filename 2D_diff-react_NA_NA.bin
//! ```
//!
//! ### 推論
//! ```bash
//! cargo run --release -- infer --filename 2D_diff-react_NA_NA.bin
//! ```

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use pinn_bench::cli::{Cli, Commands};
use pinn_bench::{cli, inference};

/// プログラムのエントリーポイント。
///
/// コマンドライン引数を解析し、`train`または`infer`の処理に振り分けます。
fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("ログの初期化に失敗しました。");
    }

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Train(args) => cli::train(args),
        Commands::Infer(args) => inference::run(args),
    };
    if let Err(e) = result {
        eprintln!("エラー: {e}");
        std::process::exit(1);
    }
}
