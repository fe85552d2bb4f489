//! サブコマンドの実装

pub mod check_env;
pub mod health;
pub mod upload;

/// ベースURLとパスを連結する。
pub(crate) fn relay_endpoint(relay_url: &str, path: &str) -> String {
    format!("{}{}", relay_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_endpoint_trims_trailing_slash() {
        assert_eq!(
            relay_endpoint("http://localhost:30000/", "/health"),
            "http://localhost:30000/health"
        );
        assert_eq!(
            relay_endpoint("http://relay", "/api/upload-image"),
            "http://relay/api/upload-image"
        );
    }
}
