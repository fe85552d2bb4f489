//! テスト用の共通ヘルパー。
//!
//! - モック推論バックエンド（127.0.0.1のランダムポートで起動するaxumサーバー）
//! - メモリ上の `ObjectStore` 実装（署名付きURLで取得できる簡易サーバー付き）
//! - テスト用PNGの生成

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use base64::Engine;

use bgrelay_core::settings::CorsSettings;
use bgrelay_types::{BackendJsonRequest, BACKEND_FILENAME_FIELD, BACKEND_IMAGE_FIELD};

use crate::config::RelayState;
use crate::error::RelayError;
use crate::inference::{build_http_client, InferenceClient};
use crate::inference::{JsonInferenceClient, MultipartInferenceClient};
use crate::router::build_router;
use crate::storage::ObjectStore;

/// テスト用の署名付きURL有効期限
pub(crate) const TEST_PRESIGN_EXPIRY_SECS: u32 = 604_800;

/// テスト用のバケット名
pub(crate) const TEST_BUCKET: &str = "processed-images";

/// 1x1の赤いPNGを生成する。
pub(crate) fn red_pixel_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(1, 1, image::Rgb([255, 0, 0]));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// axumルーターをランダムポートで起動し、ベースURLを返す。
pub(crate) async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    format!("http://127.0.0.1:{port}")
}

/// 何も待ち受けていないURL（接続拒否になる）
pub(crate) async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/api/remove_bg")
}

// ---------------------------------------------------------------------------
// モック推論バックエンド
// ---------------------------------------------------------------------------

/// モック推論バックエンドの振る舞い
#[derive(Debug, Clone)]
pub(crate) enum BackendBehavior {
    /// multipartの `clothes_image` をそのまま返す
    Echo,
    /// 固定バイト列を200で返す
    Fixed(Vec<u8>),
    /// 指定ステータスでJSONのエラーボディを返す
    Status(u16),
    /// 指定時間待ってから1バイト返す
    Sleep(Duration),
    /// JSON契約: `clothes_image_base64` をそのまま `clothes_image_processed_base64` で返す
    JsonEcho,
}

/// 起動済みのモック推論バックエンド
pub(crate) struct MockBackend {
    /// `/api/remove_bg` の完全なURL
    pub url: String,
    /// 受信したリクエスト数
    pub hits: Arc<AtomicUsize>,
    /// multipartで受信した `clothes_filename`
    pub filenames: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    pub(crate) fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

pub(crate) async fn start_mock_backend(behavior: BackendBehavior) -> MockBackend {
    let hits = Arc::new(AtomicUsize::new(0));
    let filenames = Arc::new(Mutex::new(Vec::new()));

    let counter = hits.clone();
    let names = filenames.clone();
    let app = Router::new().route(
        "/api/remove_bg",
        axum::routing::post(move |request: Request| {
            let behavior = behavior.clone();
            let counter = counter.clone();
            let names = names.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                respond(behavior, request, names).await
            }
        }),
    );

    let base = serve(app).await;
    MockBackend {
        url: format!("{base}/api/remove_bg"),
        hits,
        filenames,
    }
}

async fn respond(
    behavior: BackendBehavior,
    request: Request,
    names: Arc<Mutex<Vec<String>>>,
) -> Response {
    match behavior {
        BackendBehavior::Echo => {
            let mut multipart = Multipart::from_request(request, &()).await.unwrap();
            let mut image = Vec::new();
            while let Some(field) = multipart.next_field().await.unwrap() {
                let name = field.name().map(str::to_owned);
                match name.as_deref() {
                    Some(BACKEND_IMAGE_FIELD) => image = field.bytes().await.unwrap().to_vec(),
                    Some(BACKEND_FILENAME_FIELD) => {
                        let text = field.text().await.unwrap();
                        names.lock().unwrap().push(text);
                    }
                    _ => {}
                }
            }
            (StatusCode::OK, [(CONTENT_TYPE, "image/png")], image).into_response()
        }
        BackendBehavior::Fixed(bytes) => (StatusCode::OK, bytes).into_response(),
        BackendBehavior::Status(code) => (
            StatusCode::from_u16(code).unwrap(),
            Json(serde_json::json!({ "detail": "mock inference failure" })),
        )
            .into_response(),
        BackendBehavior::Sleep(duration) => {
            tokio::time::sleep(duration).await;
            (StatusCode::OK, vec![1u8]).into_response()
        }
        BackendBehavior::JsonEcho => {
            let Json(body) = Json::<BackendJsonRequest>::from_request(request, &())
                .await
                .unwrap();
            Json(serde_json::json!({
                "data": { "clothes_image_processed_base64": body.clothes_image_base64 }
            }))
            .into_response()
        }
    }
}

/// multipart契約の推論クライアント
pub(crate) fn multipart_client(url: &str, timeout: Duration) -> Box<dyn InferenceClient> {
    Box::new(MultipartInferenceClient::new(
        build_http_client(timeout).unwrap(),
        url.to_string(),
    ))
}

/// JSON契約の推論クライアント
pub(crate) fn json_client(url: &str) -> Box<dyn InferenceClient> {
    Box::new(JsonInferenceClient::new(
        build_http_client(Duration::from_secs(5)).unwrap(),
        url.to_string(),
    ))
}

// ---------------------------------------------------------------------------
// モックオブジェクトストレージ
// ---------------------------------------------------------------------------

/// 保存済みオブジェクト
#[derive(Debug, Clone)]
pub(crate) struct MockObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// メモリ上の `ObjectStore`。クローンは同じ中身を共有する。
#[derive(Clone)]
pub(crate) struct MockObjectStore {
    pub objects: Arc<Mutex<HashMap<String, MockObject>>>,
    pub put_calls: Arc<AtomicUsize>,
    pub fail_put: bool,
    pub fail_presign: bool,
    /// 署名付きURLのベース
    pub base_url: String,
}

impl MockObjectStore {
    pub(crate) fn new() -> Self {
        Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
            put_calls: Arc::new(AtomicUsize::new(0)),
            fail_put: false,
            fail_presign: false,
            base_url: "http://storage.invalid".to_string(),
        }
    }

    /// 署名付きURLで実際に取得できるよう、オブジェクト配信サーバーも起動する。
    pub(crate) async fn serving() -> Self {
        let mut store = Self::new();
        let app = Router::new()
            .route("/{bucket}/{key}", axum::routing::get(get_object))
            .with_state(store.objects.clone());
        store.base_url = serve(app).await;
        store
    }

    pub(crate) fn put_count(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub(crate) fn object(&self, key: &str) -> Option<MockObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

async fn get_object(
    State(objects): State<Arc<Mutex<HashMap<String, MockObject>>>>,
    Path((_bucket, key)): Path<(String, String)>,
) -> Response {
    match objects.lock().unwrap().get(&key) {
        Some(object) => (
            StatusCode::OK,
            [(CONTENT_TYPE, object.content_type.clone())],
            object.data.clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[async_trait::async_trait]
impl ObjectStore for MockObjectStore {
    fn bucket_name(&self) -> &str {
        TEST_BUCKET
    }

    async fn put_object(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), RelayError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_put {
            return Err(RelayError::StorageFailure("mock put failure".to_string()));
        }
        self.objects.lock().unwrap().insert(
            key.to_string(),
            MockObject {
                data: data.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn presigned_get_object(
        &self,
        key: &str,
        expiry_secs: u32,
    ) -> Result<String, RelayError> {
        if self.fail_presign {
            return Err(RelayError::StorageFailure("mock presign failure".to_string()));
        }
        Ok(format!(
            "{}/{}/{}?X-Amz-Expires={}&X-Amz-Signature=mock",
            self.base_url, TEST_BUCKET, key, expiry_secs
        ))
    }
}

// ---------------------------------------------------------------------------
// リレー
// ---------------------------------------------------------------------------

/// テスト用のリレー状態
pub(crate) fn relay_state(
    inference: Box<dyn InferenceClient>,
    storage: Option<MockObjectStore>,
) -> RelayState {
    RelayState {
        inference,
        storage: storage.map(|s| Box::new(s) as Box<dyn ObjectStore>),
        presign_expiry_secs: TEST_PRESIGN_EXPIRY_SECS,
    }
}

/// リレーをランダムポートで起動し、ベースURLを返す。
pub(crate) async fn spawn_relay(state: RelayState, max_upload_size: usize) -> String {
    let cors = CorsSettings {
        allow_all_origins: true,
        allowed_origins: vec![],
    };
    serve(build_router(Arc::new(state), max_upload_size, &cors)).await
}

/// multipartでアップロードし、ステータスとJSONボディを返す。
pub(crate) async fn upload_multipart(
    relay: &str,
    image: Option<Vec<u8>>,
    filename: Option<&str>,
) -> (u16, serde_json::Value) {
    let mut form = reqwest::multipart::Form::new();
    if let Some(image) = image {
        let part = reqwest::multipart::Part::bytes(image)
            .file_name("upload.bin")
            .mime_str("image/png")
            .unwrap();
        form = form.part("image_data", part);
    }
    if let Some(filename) = filename {
        form = form.text("filename", filename.to_string());
    }

    let response = reqwest::Client::new()
        .post(format!("{relay}/api/upload-image"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

/// Base64 JSONでアップロードし、ステータスとJSONボディを返す。
pub(crate) async fn upload_json(relay: &str, body: serde_json::Value) -> (u16, serde_json::Value) {
    let response = reqwest::Client::new()
        .post(format!("{relay}/api/upload-image"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

/// Base64（STANDARD）エンコード
pub(crate) fn b64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
