//! OAuth 2.0 授权码流程
//!
//! 负责生成授权链接、用授权码换取令牌、刷新过期令牌

use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::config::Config;
use crate::error::{AppResult, AuthError};
use crate::models::Credentials;

/// 请求的权限范围：创建和编辑由本应用创建的文档
pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/documents",
    "https://www.googleapis.com/auth/drive.file",
];

/// 令牌端点的响应
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenResponse {
    pub fn into_credentials(self) -> Credentials {
        let expires_at = self
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        Credentials::new(
            self.access_token,
            self.refresh_token,
            expires_at,
            self.token_type,
        )
    }
}

/// OAuth 客户端
pub struct OAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    auth_uri: String,
    token_uri: String,
    redirect_uri: Url,
}

impl OAuthClient {
    /// 创建客户端
    ///
    /// client id / secret 缺失或回调地址不合法时返回错误
    pub fn new(config: &Config) -> AppResult<Self> {
        let (client_id, client_secret) = config.require_oauth_client()?;
        let redirect_uri =
            Url::parse(&config.oauth_redirect_uri).map_err(|source| AuthError::InvalidRedirectUri {
                uri: config.oauth_redirect_uri.clone(),
                source,
            })?;

        Ok(Self {
            http: reqwest::Client::new(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            auth_uri: config.oauth_auth_uri.clone(),
            token_uri: config.oauth_token_uri.clone(),
            redirect_uri,
        })
    }

    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// 生成授权链接
    ///
    /// # 参数
    /// - `state`: 随机值，回调时原样返回，用于校验
    pub fn authorization_url(&self, state: &str) -> Result<Url, AuthError> {
        let scope = SCOPES.join(" ");
        Url::parse_with_params(
            &self.auth_uri,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .map_err(|source| AuthError::InvalidRedirectUri {
            uri: self.auth_uri.clone(),
            source,
        })
    }

    /// 用授权码换取凭证
    pub async fn exchange_code(&self, code: &str) -> Result<Credentials, AuthError> {
        info!("🔑 正在用授权码换取令牌");
        let response = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .await?;
        Ok(response.into_credentials())
    }

    /// 刷新过期的凭证
    ///
    /// 令牌端点通常不会再次返回 refresh token，此时沿用旧的
    pub async fn refresh(&self, credentials: &Credentials) -> Result<Credentials, AuthError> {
        let refresh_token = credentials
            .refresh_token()
            .ok_or(AuthError::NoRefreshToken)?;

        info!("🔄 凭证已过期，正在刷新");
        let mut response = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .await?;

        if response.refresh_token.is_none() {
            response.refresh_token = Some(refresh_token.to_string());
        }
        Ok(response.into_credentials())
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        debug!("POST {}", self.token_uri);
        let response = self
            .http
            .post(&self.token_uri)
            .form(form)
            .send()
            .await
            .map_err(AuthError::RequestFailed)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenRejected {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(AuthError::RequestFailed)
    }
}
