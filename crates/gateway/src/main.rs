//! # bgrelay Gateway
//!
//! 背景除去リレー。クライアントから画像を受け取り、推論バックエンドへ中継し、
//! 処理済みPNGをMinIOに保存して署名付きURLを返す。
//!
//! ## API エンドポイント
//! - `GET /health` — 死活確認
//! - `POST /api/upload-image` — 画像アップロード（multipart または Base64 JSON）
//!
//! ## モジュール構成
//! - `config`: 共有状態
//! - `error`: エラー型と `RelayResponse` への変換
//! - `upload`: リクエストの検証とエクストラクタ
//! - `inference`: 推論バックエンドクライアント
//! - `storage`: オブジェクトストレージ
//! - `endpoints`: ハンドラ
//! - `router`: ルーターとミドルウェア

mod config;
mod endpoints;
mod error;
mod inference;
mod router;
mod storage;
mod upload;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use bgrelay_core::settings::{LogFormat, RelaySettings};
use bgrelay_core::PRESIGNED_URL_TTL_SECS;

use config::RelayState;
use storage::ObjectStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env はあれば読む（環境変数が優先）
    dotenvy::dotenv().ok();

    let settings = RelaySettings::from_env()?;
    init_tracing(settings.log_format);

    tracing::info!(
        ai_backend_url = %settings.ai_backend_url,
        encoding = ?settings.ai_backend_encoding,
        timeout_secs = settings.ai_backend_timeout.as_secs(),
        "推論バックエンドを設定"
    );
    let inference = inference::from_settings(&settings)?;

    let storage = connect_storage(&settings).await;

    let state = Arc::new(RelayState {
        inference,
        storage,
        presign_expiry_secs: PRESIGNED_URL_TTL_SECS,
    });

    let app = router::build_router(state, settings.max_upload_size, &settings.cors);

    tracing::info!("リレーを {} で起動します", settings.listen_addr);
    let listener = tokio::net::TcpListener::bind(&settings.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("リレーを停止しました");
    Ok(())
}

/// `RUST_LOG` があれば優先し、なければ info。
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

/// MinIOへ接続する。失敗してもリレーは起動し、アップロードは `storage unavailable` になる。
#[cfg(feature = "vendor-minio")]
async fn connect_storage(settings: &RelaySettings) -> Option<Box<dyn ObjectStore>> {
    tracing::info!(
        endpoint = %settings.minio.endpoint_url(),
        bucket = %settings.minio.bucket_name,
        "MinIOに接続中..."
    );
    match storage::MinioObjectStore::connect(&settings.minio).await {
        Ok(store) => {
            tracing::info!("MinIO接続完了");
            Some(Box::new(store))
        }
        Err(e) => {
            let detail = format!("{e:#}");
            tracing::error!(
                error = %detail,
                "MinIOの初期化に失敗。MinIOの起動状態と認証情報を確認してください"
            );
            None
        }
    }
}

#[cfg(not(feature = "vendor-minio"))]
async fn connect_storage(_settings: &RelaySettings) -> Option<Box<dyn ObjectStore>> {
    tracing::warn!("ストレージ実装が無効です（vendor-minio 未指定）");
    None
}

/// Ctrl+C または SIGTERM を待つ。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+Cハンドラの登録に失敗");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERMハンドラの登録に失敗");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINTを受信。停止します"),
        _ = terminate => tracing::info!("SIGTERMを受信。停止します"),
    }
}
