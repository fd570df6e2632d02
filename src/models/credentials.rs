use std::fmt;

use chrono::{DateTime, Duration, Utc};

/// 过期判断时预留的时间余量
const EXPIRY_SKEW_SECS: i64 = 60;

/// OAuth 凭证
///
/// 对文档构建器来说是一个不透明的能力对象：只被传递，不被检查或修改
#[derive(Clone)]
pub struct Credentials {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    token_type: String,
}

impl Credentials {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
        token_type: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at,
            token_type: token_type.into(),
        }
    }

    /// 直接使用现成的 access token（没有过期时间和 refresh token）
    pub fn from_access_token(access_token: impl Into<String>) -> Self {
        Self::new(access_token, None, None, "Bearer")
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// 在 `now` 时刻是否已过期（提前 60 秒视为过期）
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => now + Duration::seconds(EXPIRY_SKEW_SECS) >= at,
            None => false,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .finish()
    }
}
