//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **服务初始化**：先创建模型客户端，配置错误在任何网络请求之前暴露
//! 2. **会话凭证**：按优先级获取凭证，构建文档前检查是否过期
//! 3. **文件加载**：从磁盘读取文件，读取失败的跳过
//! 4. **委托流程**：交给 `MemoFlow` 完成一次生成
//! 5. **结果输出**：可选写出 JSON

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::json;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, FileError};
use crate::infrastructure::{wait_for_code, GoogleDocsApi, OAuthClient};
use crate::models::{Credentials, UploadedFile};
use crate::services::{CostSummary, CostTracker, DocumentBuilder, ExtractionService, PriceTable};
use crate::utils::logging;
use crate::workflow::{DocumentOutcome, MemoFlow, MemoReport};

/// `generate` 子命令的参数
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub paths: Vec<PathBuf>,
    /// 已经拿到的授权码
    pub auth_code: Option<String>,
    /// 只生成本地预览，不创建远程文档
    pub dry_run: bool,
    /// 提取结果的 JSON 输出路径
    pub json_out: Option<PathBuf>,
}

/// 应用主结构
pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// 生成一份 IC Memo
    pub async fn generate(&self, options: &GenerateOptions) -> AppResult<MemoReport> {
        let extractor = ExtractionService::new(&self.config)?;

        let credentials = if options.dry_run {
            None
        } else {
            Some(self.acquire_credentials(options.auth_code.as_deref()).await?)
        };

        let (files, unreadable) = load_files(&options.paths).await;
        logging::log_startup(&self.config, files.len());

        let credentials = match credentials {
            Some(c) => Some(self.ensure_fresh(c).await?),
            None => None,
        };

        let api = GoogleDocsApi::new(&self.config);
        let flow = MemoFlow::new(&extractor, DocumentBuilder::new(&api), options.dry_run);
        let mut tracker = CostTracker::new(PriceTable::from_config(&self.config));

        let mut report = flow.run(&files, credentials.as_ref(), &mut tracker).await;
        report.rejected.splice(0..0, unreadable);

        if let Some(path) = &options.json_out {
            write_report_json(path, &report).await?;
            info!("💾 结果已写入: {}", path.display());
        }

        Ok(report)
    }

    /// 单次模型调用
    ///
    /// # 返回
    /// (响应文本, 运行统计)
    pub async fn ask(&self, prompt: &str) -> AppResult<(String, CostSummary)> {
        let service = ExtractionService::new(&self.config)?;
        let mut tracker = CostTracker::new(PriceTable::from_config(&self.config));

        tracker.start_timer();
        let result = service.generate(prompt, &mut tracker).await;
        tracker.stop_timer();

        Ok((result?, tracker.summary()))
    }

    /// 获取会话凭证
    ///
    /// 优先级：配置中的 access token → 命令行授权码 → 交互式授权
    async fn acquire_credentials(&self, auth_code: Option<&str>) -> AppResult<Credentials> {
        if let Some(token) = self
            .config
            .google_access_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
        {
            info!("🔑 使用配置中的 access token");
            return Ok(Credentials::from_access_token(token));
        }

        let oauth = OAuthClient::new(&self.config)?;
        let code = match auth_code {
            Some(code) => code.to_string(),
            None => interactive_login(&oauth).await?,
        };
        Ok(oauth.exchange_code(&code).await?)
    }

    /// 过期的凭证用 refresh token 刷新，未过期的原样返回
    ///
    /// 配置中的 access token 没有过期时间，不会被刷新
    async fn ensure_fresh(&self, credentials: Credentials) -> AppResult<Credentials> {
        if !credentials.is_expired(Utc::now()) {
            return Ok(credentials);
        }
        let oauth = OAuthClient::new(&self.config)?;
        Ok(oauth.refresh(&credentials).await?)
    }
}

/// 打印授权链接并等待浏览器回调
async fn interactive_login(oauth: &OAuthClient) -> AppResult<String> {
    let state = uuid::Uuid::new_v4().to_string();
    let url = oauth.authorization_url(&state)?;

    println!("Please login with Google to continue:");
    println!("{}", url);

    Ok(wait_for_code(oauth.redirect_uri(), &state).await?)
}

/// 读取所有文件，读取失败的记录下来，不中断
async fn load_files(paths: &[PathBuf]) -> (Vec<UploadedFile>, Vec<FileError>) {
    let mut files = Vec::with_capacity(paths.len());
    let mut unreadable = Vec::new();

    for path in paths {
        match UploadedFile::from_path(path).await {
            Ok(file) => files.push(file),
            Err(e) => {
                error!("❌ {}", e);
                unreadable.push(e);
            }
        }
    }

    if files.is_empty() {
        warn!("⚠️ 没有读取到任何文件");
    }
    (files, unreadable)
}

async fn write_report_json(path: &Path, report: &MemoReport) -> AppResult<()> {
    let document_url = match &report.document {
        DocumentOutcome::Created { url } => Some(url.as_str()),
        _ => None,
    };
    let body = json!({
        "memo": report.memo,
        "document_url": document_url,
        "summary": report.summary,
    });

    let text = serde_json::to_string_pretty(&body)
        .map_err(|e| AppError::Other(format!("序列化结果失败: {}", e)))?;
    tokio::fs::write(path, text)
        .await
        .map_err(|e| AppError::Other(format!("写入 {} 失败: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractedMemo, MemoField};
    use chrono::Duration;

    fn offline_config() -> Config {
        Config {
            llm_api_key: "test-key".to_string(),
            google_access_token: Some("token".to_string()),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_network() {
        let app = App::new(Config::default());
        let options = GenerateOptions {
            paths: vec![PathBuf::from("deck.pdf")],
            ..Default::default()
        };

        let err = app.generate(&options).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_configured_token_wins() {
        let app = App::new(offline_config());
        let creds = app.acquire_credentials(Some("ignored")).await.unwrap();
        assert_eq!(creds.access_token(), "token");
    }

    #[tokio::test]
    async fn test_missing_oauth_client_is_config_error() {
        let app = App::new(Config {
            google_access_token: None,
            ..offline_config()
        });
        let err = app.acquire_credentials(Some("code")).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_load_files_skips_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("notes.txt");
        std::fs::write(&good, "hello").unwrap();
        let missing = dir.path().join("missing.txt");

        let (files, unreadable) = load_files(&[good, missing]).await;

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "notes.txt");
        assert_eq!(unreadable.len(), 1);
    }

    #[tokio::test]
    async fn test_fresh_credentials_are_not_refreshed() {
        // 没有 OAuth client 配置，说明没有走刷新
        let app = App::new(Config::default());
        let creds = Credentials::new("a", None, Some(Utc::now() + Duration::hours(1)), "Bearer");

        let kept = app.ensure_fresh(creds).await.unwrap();
        assert_eq!(kept.access_token(), "a");
    }

    #[tokio::test]
    async fn test_configured_token_is_never_expired() {
        let app = App::new(Config::default());
        let kept = app
            .ensure_fresh(Credentials::from_access_token("token"))
            .await
            .unwrap();
        assert_eq!(kept.access_token(), "token");
    }

    #[tokio::test]
    async fn test_expired_credentials_without_refresh_token() {
        let app = App::new(Config {
            google_client_id: "id".to_string(),
            google_client_secret: "secret".to_string(),
            ..Config::default()
        });
        let creds = Credentials::new("a", None, Some(Utc::now() - Duration::hours(1)), "Bearer");

        let err = app.ensure_fresh(creds).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Auth(crate::error::AuthError::NoRefreshToken)
        ));
    }

    fn report_with(memo: ExtractedMemo, document: DocumentOutcome) -> MemoReport {
        let mut tracker = CostTracker::default();
        tracker.add_tokens(300, 60);
        MemoReport {
            rejected: Vec::new(),
            processed: vec!["notes.md".to_string()],
            memo,
            document,
            summary: tracker.summary(),
        }
    }

    #[tokio::test]
    async fn test_report_json_has_memo_url_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.json");
        let mut memo = ExtractedMemo::default();
        memo.set(MemoField::CompanyName, "Acme");
        let report = report_with(
            memo,
            DocumentOutcome::Created {
                url: "https://docs.google.com/document/d/abc/edit".to_string(),
            },
        );

        write_report_json(&path, &report).await.unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(json["memo"]["company_name"], "Acme");
        assert_eq!(json["document_url"], "https://docs.google.com/document/d/abc/edit");
        assert_eq!(json["summary"]["input_tokens"], 300);
        assert_eq!(json["summary"]["output_tokens"], 60);
    }

    #[tokio::test]
    async fn test_report_json_for_degraded_memo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.json");
        let report = report_with(
            ExtractedMemo::degraded("timeout"),
            DocumentOutcome::Failed(crate::error::DocsError::MissingCredentials),
        );

        write_report_json(&path, &report).await.unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        let memo = json["memo"].as_object().unwrap();
        assert_eq!(memo["company_name"], "Error extracting");
        assert_eq!(memo["business_description"], "Error: timeout");
        assert_eq!(memo["fundraising_history"], "Error");
        assert!(!memo.contains_key("cost"));
        assert!(!memo.contains_key("fmv"));
        assert_eq!(memo.len(), 3);
        assert!(json["document_url"].is_null());
    }
}
