//! # リレーエンドポイント

pub mod health;
pub mod upload_image;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use health::handle_health;
pub use upload_image::handle_upload_image;
