//! # bgrelay CLI
//!
//! リレーの運用確認用コマンド。
//!
//! - `health` — `/health` の確認
//! - `upload` — テスト画像（または指定ファイル）のアップロード
//! - `check-env` — 環境変数と `.env` の検証

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bgrelay-cli")]
#[command(about = "Operator tooling for the bgrelay background-removal relay", long_about = None)]
struct Cli {
    /// リレーのベースURL
    #[arg(long, global = true, default_value = "http://localhost:30000")]
    relay_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Check that the relay answers GET /health")]
    Health,
    #[command(about = "Upload an image (a generated 200x200 red PNG by default)")]
    Upload {
        /// アップロードするファイル。省略時はテスト画像を生成する
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
        /// 送信するファイル名。省略時はファイル名または test_image.png
        #[arg(long, value_name = "NAME")]
        filename: Option<String>,
        /// multipartではなくBase64 JSONで送る
        #[arg(long)]
        json: bool,
    },
    #[command(about = "List relay environment variables and validate them")]
    CheckEnv {
        /// 読み込む .env ファイル（省略時はカレントディレクトリから探す）
        #[arg(long, value_name = "PATH")]
        env_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Health => commands::health::run(&cli.relay_url).await,
        Commands::Upload {
            file,
            filename,
            json,
        } => {
            let options = commands::upload::UploadOptions {
                file,
                filename,
                json,
            };
            commands::upload::run(&cli.relay_url, options).await
        }
        Commands::CheckEnv { env_file } => commands::check_env::run(env_file.as_deref()),
    }
}
