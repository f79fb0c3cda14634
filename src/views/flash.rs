//! One-shot messages carried to the next rendered page in a cookie.
//!
//! The cookie value is hex encoded JSON so message text never has to be
//! cookie-safe.

use actix_web::{cookie::Cookie, HttpRequest};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const FLASH_COOKIE: &str = "messages";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: Level,
    pub text: String,
}

impl FlashMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            text: text.into(),
        }
    }
}

pub fn encode(messages: &[FlashMessage]) -> Result<String, serde_json::Error> {
    serde_json::to_vec(messages).map(hex::encode)
}

pub fn decode(value: &str) -> Option<Vec<FlashMessage>> {
    let bytes = hex::decode(value).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// `None` when there is nothing to carry.
pub fn cookie(messages: &[FlashMessage]) -> Option<Cookie<'static>> {
    if messages.is_empty() {
        return None;
    }
    match encode(messages) {
        Ok(value) => Some(Cookie::build(FLASH_COOKIE, value).path("/").http_only(true).finish()),
        Err(err) => {
            warn!("Dropping flash messages that failed to encode: {}", err);
            None
        }
    }
}

pub fn removal() -> Cookie<'static> {
    let mut cookie = Cookie::build(FLASH_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// Messages the request carries. Malformed cookies read as empty.
pub fn take(req: &HttpRequest) -> Vec<FlashMessage> {
    req.cookie(FLASH_COOKIE)
        .and_then(|cookie| decode(cookie.value()))
        .unwrap_or_default()
}

pub fn present(req: &HttpRequest) -> bool {
    req.cookie(FLASH_COOKIE).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn survives_cookie_unsafe_text() {
        let messages = vec![FlashMessage::success("Your vote was updated to 'a; b, \"c\"'")];
        let cookie = cookie(&messages).unwrap();
        assert!(cookie
            .value()
            .chars()
            .all(|c| c.is_ascii_hexdigit()));

        let req = TestRequest::default().cookie(cookie).to_http_request();
        assert_eq!(take(&req), messages);
    }

    #[test]
    fn malformed_cookie_reads_empty() {
        let req = TestRequest::default()
            .cookie(Cookie::new(FLASH_COOKIE, "zz"))
            .to_http_request();
        assert!(present(&req));
        assert!(take(&req).is_empty());
    }

    #[test]
    fn nothing_to_carry() {
        assert!(cookie(&[]).is_none());
    }
}
