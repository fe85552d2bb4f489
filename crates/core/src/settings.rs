//! # リレー設定
//!
//! 環境変数からの設定読み込み。`.env` の読み込みは呼び出し側（バイナリ）が行う。
//! `from_lookup` は任意の参照関数を受け取るため、テストでは環境変数に触れずに検証できる。

use std::str::FromStr;
use std::time::Duration;

/// 設定エラー
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// リレーが参照する環境変数の定義。`check-env` の一覧表示にも使う。
#[derive(Debug, Clone, Copy)]
pub struct EnvVar {
    pub name: &'static str,
    /// 未設定時の既定値（Noneは「未設定なら機能無効」）
    pub default: Option<&'static str>,
    /// 表示時に伏せ字にするか
    pub secret: bool,
    pub group: &'static str,
}

const fn env_var(
    group: &'static str,
    name: &'static str,
    default: Option<&'static str>,
    secret: bool,
) -> EnvVar {
    EnvVar {
        name,
        default,
        secret,
        group,
    }
}

/// リレーの環境変数一覧
pub const ENV_VARS: &[EnvVar] = &[
    env_var("server", "RELAY_LISTEN_ADDR", Some("0.0.0.0:30000"), false),
    env_var("server", "MAX_UPLOAD_SIZE", Some("10485760"), false),
    env_var("server", "CORS_ALLOW_ALL_ORIGINS", Some("true"), false),
    env_var("server", "CORS_ALLOWED_ORIGINS", None, false),
    env_var("server", "LOG_FORMAT", Some("text"), false),
    env_var("ai-backend", "AI_BACKEND_URL", Some("http://localhost:8002/api/remove_bg"), false),
    env_var("ai-backend", "AI_BACKEND_ENCODING", Some("multipart"), false),
    env_var("ai-backend", "AI_BACKEND_TIMEOUT_SECS", Some("60"), false),
    env_var("minio", "MINIO_ENDPOINT", Some("localhost:9000"), false),
    env_var("minio", "MINIO_PUBLIC_ENDPOINT", None, false),
    env_var("minio", "MINIO_ACCESS_KEY", Some("minioadmin"), false),
    env_var("minio", "MINIO_SECRET_KEY", Some("minioadmin"), true),
    env_var("minio", "MINIO_BUCKET_NAME", Some("processed-images"), false),
    env_var("minio", "MINIO_SECURE", Some("false"), false),
    env_var("minio", "MINIO_REGION", Some("us-east-1"), false),
];

/// 推論バックエンドとのワイヤ形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendEncoding {
    /// `clothes_image` + `clothes_filename` のmultipart、レスポンスは画像バイナリ
    Multipart,
    /// `{"clothes_image_base64"}`、レスポンスは `data.clothes_image_processed_base64`
    Json,
}

impl FromStr for BackendEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "multipart" => Ok(BackendEncoding::Multipart),
            "json" => Ok(BackendEncoding::Json),
            other => Err(format!("expected \"multipart\" or \"json\", got {other:?}")),
        }
    }
}

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected \"text\" or \"json\", got {other:?}")),
        }
    }
}

/// MinIO（S3互換ストレージ）の接続設定
#[derive(Clone)]
pub struct MinioSettings {
    /// `host:port` またはスキーム付きURL
    pub endpoint: String,
    /// 署名付きURLに使うクライアント向けエンドポイント
    pub public_endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    pub bucket_name: String,
    /// スキームなしのエンドポイントにhttpsを付けるか
    pub secure: bool,
    pub region: String,
}

impl MinioSettings {
    /// スキームを補完した内部用エンドポイントURL
    pub fn endpoint_url(&self) -> String {
        with_scheme(&self.endpoint, self.secure)
    }

    /// スキームを補完したクライアント向けエンドポイントURL
    pub fn public_endpoint_url(&self) -> Option<String> {
        self.public_endpoint
            .as_deref()
            .map(|ep| with_scheme(ep, self.secure))
    }
}

impl std::fmt::Debug for MinioSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinioSettings")
            .field("endpoint", &self.endpoint)
            .field("public_endpoint", &self.public_endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("bucket_name", &self.bucket_name)
            .field("secure", &self.secure)
            .field("region", &self.region)
            .finish()
    }
}

fn with_scheme(endpoint: &str, secure: bool) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else if secure {
        format!("https://{endpoint}")
    } else {
        format!("http://{endpoint}")
    }
}

/// CORS設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsSettings {
    /// 全オリジンを許可する（リクエストのOriginを反射し、認証情報も許可）
    pub allow_all_origins: bool,
    /// `allow_all_origins` が無効な場合に許可するオリジン
    pub allowed_origins: Vec<String>,
}

/// リレーサーバー全体の設定
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub listen_addr: String,
    pub ai_backend_url: String,
    pub ai_backend_encoding: BackendEncoding,
    pub ai_backend_timeout: Duration,
    pub minio: MinioSettings,
    /// リクエストボディの上限（バイト）
    pub max_upload_size: usize,
    pub cors: CorsSettings,
    pub log_format: LogFormat,
}

impl RelaySettings {
    /// プロセスの環境変数から読み込む。
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 参照関数から読み込む。空文字列は未設定として扱う。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| -> Option<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let get_or = |key: &'static str| -> String {
            get(key).unwrap_or_else(|| default_of(key).to_string())
        };

        let ai_backend_encoding = parse_with(
            "AI_BACKEND_ENCODING",
            get_or("AI_BACKEND_ENCODING"),
            BackendEncoding::from_str,
        )?;

        let timeout_secs: u64 = parse_with(
            "AI_BACKEND_TIMEOUT_SECS",
            get_or("AI_BACKEND_TIMEOUT_SECS"),
            |v| v.parse::<u64>().map_err(|e| e.to_string()),
        )?;
        if timeout_secs == 0 {
            return Err(SettingsError::Invalid {
                key: "AI_BACKEND_TIMEOUT_SECS",
                value: "0".into(),
                reason: "timeout must be greater than zero".into(),
            });
        }

        let max_upload_size: usize = parse_with(
            "MAX_UPLOAD_SIZE",
            get_or("MAX_UPLOAD_SIZE"),
            |v| v.parse::<usize>().map_err(|e| e.to_string()),
        )?;

        let secure = parse_with("MINIO_SECURE", get_or("MINIO_SECURE"), parse_bool)?;
        let allow_all_origins = parse_with(
            "CORS_ALLOW_ALL_ORIGINS",
            get_or("CORS_ALLOW_ALL_ORIGINS"),
            parse_bool,
        )?;
        let log_format = parse_with("LOG_FORMAT", get_or("LOG_FORMAT"), LogFormat::from_str)?;

        let allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            listen_addr: get_or("RELAY_LISTEN_ADDR"),
            ai_backend_url: get_or("AI_BACKEND_URL"),
            ai_backend_encoding,
            ai_backend_timeout: Duration::from_secs(timeout_secs),
            minio: MinioSettings {
                endpoint: get_or("MINIO_ENDPOINT"),
                public_endpoint: get("MINIO_PUBLIC_ENDPOINT"),
                access_key: get_or("MINIO_ACCESS_KEY"),
                secret_key: get_or("MINIO_SECRET_KEY"),
                bucket_name: get_or("MINIO_BUCKET_NAME"),
                secure,
                region: get_or("MINIO_REGION"),
            },
            max_upload_size,
            cors: CorsSettings {
                allow_all_origins,
                allowed_origins,
            },
            log_format,
        })
    }
}

/// `ENV_VARS` の既定値を引く。既定値のない変数は空文字列。
fn default_of(key: &str) -> &'static str {
    ENV_VARS
        .iter()
        .find(|v| v.name == key)
        .and_then(|v| v.default)
        .unwrap_or_default()
}

fn parse_with<T, P>(key: &'static str, value: String, parse: P) -> Result<T, SettingsError>
where
    P: FnOnce(&str) -> Result<T, String>,
{
    parse(&value).map_err(|reason| SettingsError::Invalid { key, value, reason })
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err("expected a boolean (true/false)".to_string()),
    }
}
