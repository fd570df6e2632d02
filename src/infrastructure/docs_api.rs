//! Google Docs API - 基础设施层
//!
//! 只暴露"创建文档"和"批量更新"两个能力，不认识 Memo 和段落

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::config::Config;
use crate::error::DocsError;
use crate::models::{Credentials, DocRequest};

/// 远程文档 API
#[async_trait]
pub trait DocsApi: Send + Sync {
    /// 创建空白文档，返回 documentId
    async fn create_document(
        &self,
        credentials: &Credentials,
        title: &str,
    ) -> Result<String, DocsError>;

    /// 按顺序一次性提交所有编辑操作
    async fn batch_update(
        &self,
        credentials: &Credentials,
        document_id: &str,
        requests: &[DocRequest],
    ) -> Result<(), DocsError>;
}

/// 基于 reqwest 的 Google Docs v1 客户端
pub struct GoogleDocsApi {
    http: reqwest::Client,
    base_url: String,
}

impl GoogleDocsApi {
    pub fn new(config: &Config) -> Self {
        Self::with_base_url(&config.docs_api_base_url)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// 发送带 Bearer token 的 POST 请求，返回 JSON 响应体
    async fn post_json(
        &self,
        credentials: &Credentials,
        endpoint: &str,
        body: &JsonValue,
    ) -> Result<JsonValue, DocsError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(credentials.access_token())
            .json(body)
            .send()
            .await
            .map_err(|source| DocsError::RequestFailed {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocsError::BadResponse {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<JsonValue>()
            .await
            .map_err(|source| DocsError::RequestFailed {
                endpoint: endpoint.to_string(),
                source,
            })
    }
}

#[async_trait]
impl DocsApi for GoogleDocsApi {
    async fn create_document(
        &self,
        credentials: &Credentials,
        title: &str,
    ) -> Result<String, DocsError> {
        let response = self
            .post_json(credentials, "documents", &json!({ "title": title }))
            .await?;

        response
            .get("documentId")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or(DocsError::MissingDocumentId)
    }

    async fn batch_update(
        &self,
        credentials: &Credentials,
        document_id: &str,
        requests: &[DocRequest],
    ) -> Result<(), DocsError> {
        let endpoint = format!("documents/{}:batchUpdate", document_id);
        self.post_json(credentials, &endpoint, &json!({ "requests": requests }))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let api = GoogleDocsApi::with_base_url("https://docs.googleapis.com/v1/");
        assert_eq!(api.base_url, "https://docs.googleapis.com/v1");
    }

    #[test]
    fn test_batch_body_uses_wire_shape() {
        let requests = vec![DocRequest::InsertText {
            index: 1,
            text: "X\n".to_string(),
        }];
        let body = json!({ "requests": requests });
        assert_eq!(body["requests"][0]["insertText"]["location"]["index"], 1);
    }

    /// 真实创建文档（需要 GOOGLE_ACCESS_TOKEN）
    #[tokio::test]
    #[ignore]
    async fn test_create_document_live() {
        let token = std::env::var("GOOGLE_ACCESS_TOKEN").expect("GOOGLE_ACCESS_TOKEN");
        let api = GoogleDocsApi::with_base_url("https://docs.googleapis.com/v1");
        let id = api
            .create_document(&Credentials::from_access_token(token), "IC Memo - Live Test")
            .await
            .unwrap();
        assert!(!id.is_empty());
    }
}
