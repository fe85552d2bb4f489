//! `check-env` サブコマンド
//!
//! `.env` を読み込んだうえで、リレーが参照する環境変数を一覧表示し、
//! 最後に `RelaySettings::from_env` で実際に解釈できるかを確かめる。

use std::path::Path;

use bgrelay_core::settings::{EnvVar, RelaySettings, ENV_VARS};

/// 伏せ字にする際に残す先頭文字数
const SECRET_VISIBLE_CHARS: usize = 10;

/// 表示する値の最大文字数
const DISPLAY_MAX_CHARS: usize = 50;

/// 1変数の状態
#[derive(Debug, Clone, PartialEq, Eq)]
enum VarState {
    /// 既定値と異なる値が設定されている
    Set(String),
    /// 既定値と同じ値、または未設定で既定値が使われる
    Default(String),
    /// 未設定かつ既定値なし（機能無効）
    Unset,
}

pub fn run(env_file: Option<&Path>) -> anyhow::Result<()> {
    match env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .map_err(|e| anyhow::anyhow!("cannot load {}: {e}", path.display()))?;
            println!("loaded {}", path.display());
        }
        None => match dotenvy::dotenv() {
            Ok(path) => println!("loaded {}", path.display()),
            Err(_) => println!("no .env file found; using the process environment"),
        },
    }

    let lookup = |key: &str| std::env::var(key).ok();
    let mut group = "";
    for var in ENV_VARS {
        if var.group != group {
            group = var.group;
            println!("\n[{group}]");
        }
        let line = match inspect(var, lookup) {
            VarState::Set(value) => format!("  set      {:<25} = {value}", var.name),
            VarState::Default(value) => format!("  default  {:<25} = {value}", var.name),
            VarState::Unset => format!("  unset    {:<25}", var.name),
        };
        println!("{line}");
    }

    println!();
    let settings = RelaySettings::from_env()?;
    println!("settings OK");
    println!("  listen address : {}", settings.listen_addr);
    println!(
        "  AI backend     : {} ({:?}, {}s timeout)",
        settings.ai_backend_url,
        settings.ai_backend_encoding,
        settings.ai_backend_timeout.as_secs()
    );
    println!(
        "  MinIO          : {} bucket={}",
        settings.minio.endpoint_url(),
        settings.minio.bucket_name
    );
    if let Some(public) = settings.minio.public_endpoint_url() {
        println!("  MinIO (public) : {public}");
    }
    Ok(())
}

fn inspect<F>(var: &EnvVar, lookup: F) -> VarState
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(var.name).filter(|v| !v.trim().is_empty());
    match (value, var.default) {
        (Some(value), Some(default)) if value == default => VarState::Default(display(var, &value)),
        (Some(value), _) => VarState::Set(display(var, &value)),
        (None, Some(default)) => VarState::Default(display(var, default)),
        (None, None) => VarState::Unset,
    }
}

fn display(var: &EnvVar, value: &str) -> String {
    if var.secret {
        mask_secret(value)
    } else {
        value.chars().take(DISPLAY_MAX_CHARS).collect()
    }
}

/// 先頭10文字だけ残して伏せる。
fn mask_secret(value: &str) -> String {
    if value.chars().count() > SECRET_VISIBLE_CHARS {
        let head: String = value.chars().take(SECRET_VISIBLE_CHARS).collect();
        format!("{head}...")
    } else {
        value.to_string()
    }
}
