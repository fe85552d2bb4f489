//! `upload` サブコマンド
//!
//! ファイル指定がなければ200x200の赤いPNGを生成して送る。

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine;

use bgrelay_types::{RelayResponse, FILENAME_FIELD, IMAGE_FIELD};

use super::relay_endpoint;

/// 生成するテスト画像のファイル名
const DEFAULT_FILENAME: &str = "test_image.png";

/// テスト画像の一辺（ピクセル）
const TEST_IMAGE_SIZE: u32 = 200;

/// アップロード全体のタイムアウト。推論に時間がかかるため長めに取る。
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

pub struct UploadOptions {
    pub file: Option<PathBuf>,
    pub filename: Option<String>,
    pub json: bool,
}

/// 送信する画像
struct Payload {
    bytes: Vec<u8>,
    filename: String,
    mime_type: &'static str,
}

pub async fn run(relay_url: &str, options: UploadOptions) -> anyhow::Result<()> {
    let payload = load_payload(options.file.as_deref(), options.filename)?;
    let url = relay_endpoint(relay_url, "/api/upload-image");

    println!("POST {url}");
    println!("  filename: {}", payload.filename);
    println!("  size:     {} bytes", payload.bytes.len());
    println!(
        "  encoding: {}",
        if options.json { "json (base64)" } else { "multipart" }
    );

    let client = reqwest::Client::builder().timeout(UPLOAD_TIMEOUT).build()?;
    let request = if options.json {
        client.post(&url).json(&json_body(&payload))
    } else {
        let part = reqwest::multipart::Part::bytes(payload.bytes.clone())
            .file_name(payload.filename.clone())
            .mime_str(payload.mime_type)?;
        let form = reqwest::multipart::Form::new()
            .part(IMAGE_FIELD, part)
            .text(FILENAME_FIELD, payload.filename.clone());
        client.post(&url).multipart(form)
    };

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            anyhow::anyhow!("request to {url} timed out")
        } else {
            anyhow::anyhow!("cannot reach relay at {url}: {e}")
        }
    })?;

    let status = response.status();
    let text = response.text().await?;
    println!("HTTP {status}");

    match serde_json::from_str::<RelayResponse>(&text) {
        Ok(body) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
            if !body.success {
                anyhow::bail!("upload failed: {}", body.message);
            }
            Ok(())
        }
        Err(_) => anyhow::bail!("unexpected response body: {text}"),
    }
}

fn load_payload(file: Option<&Path>, filename: Option<String>) -> anyhow::Result<Payload> {
    match file {
        Some(path) => {
            let bytes = std::fs::read(path)
                .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
            let filename = filename.unwrap_or_else(|| {
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
            });
            Ok(Payload {
                mime_type: guess_mime_type(&filename),
                bytes,
                filename,
            })
        }
        None => Ok(Payload {
            bytes: red_square_png(TEST_IMAGE_SIZE)?,
            filename: filename.unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
            mime_type: "image/png",
        }),
    }
}

/// 単色（赤）の正方形PNGを生成する。
fn red_square_png(size: u32) -> anyhow::Result<Vec<u8>> {
    let img = image::RgbImage::from_pixel(size, size, image::Rgb([255, 0, 0]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)?;
    Ok(buf.into_inner())
}

fn guess_mime_type(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

fn json_body(payload: &Payload) -> serde_json::Value {
    let encoded = base64::engine::general_purpose::STANDARD.encode(&payload.bytes);
    serde_json::json!({
        IMAGE_FIELD: format!("data:{};base64,{encoded}", payload.mime_type),
        FILENAME_FIELD: payload.filename,
    })
}
