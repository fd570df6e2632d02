use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;

use crate::error::{AppResult, ConfigError};

/// 程序配置
///
/// 加载顺序：默认值 → TOML 配置文件 → 环境变量（含 `.env`）
#[derive(Clone, Debug)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 每百万输入 token 的价格（美元）
    pub input_price_per_million: f64,
    /// 每百万输出 token 的价格（美元）
    pub output_price_per_million: f64,
    // --- Google OAuth 配置 ---
    pub google_client_id: String,
    pub google_client_secret: String,
    pub oauth_redirect_uri: String,
    pub oauth_auth_uri: String,
    pub oauth_token_uri: String,
    /// 现成的 access token，设置后跳过 OAuth 流程
    pub google_access_token: Option<String>,
    // --- Docs API 配置 ---
    pub docs_api_base_url: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.5-flash".to_string(),
            input_price_per_million: 0.30,
            output_price_per_million: 2.50,
            google_client_id: String::new(),
            google_client_secret: String::new(),
            oauth_redirect_uri: "http://localhost:8501".to_string(),
            oauth_auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
            oauth_token_uri: "https://oauth2.googleapis.com/token".to_string(),
            google_access_token: None,
            docs_api_base_url: "https://docs.googleapis.com/v1".to_string(),
            verbose_logging: false,
        }
    }
}

/// TOML 配置文件的结构，所有字段可选
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    llm_api_key: Option<String>,
    llm_api_base_url: Option<String>,
    llm_model_name: Option<String>,
    input_price_per_million: Option<f64>,
    output_price_per_million: Option<f64>,
    google_client_id: Option<String>,
    google_client_secret: Option<String>,
    oauth_redirect_uri: Option<String>,
    oauth_auth_uri: Option<String>,
    oauth_token_uri: Option<String>,
    google_access_token: Option<String>,
    docs_api_base_url: Option<String>,
    verbose_logging: Option<bool>,
}

impl Config {
    /// 未指定配置文件时，在当前目录查找的文件名
    pub const DEFAULT_FILE: &'static str = "ic_memo.toml";

    /// 加载完整配置
    ///
    /// 显式指定的配置文件必须存在；未指定时默认文件可有可无
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        match path {
            Some(path) => config.merge_file(path)?,
            None => {
                let default_path = Path::new(Self::DEFAULT_FILE);
                if default_path.exists() {
                    config.merge_file(default_path)?;
                }
            }
        }
        config.apply_env(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    /// 只使用默认值和环境变量
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// 合并 TOML 配置文件
    pub fn merge_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let path_str = path.display().to_string();
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
                path: path_str.clone(),
                source,
            })?;
        let file: ConfigFile =
            toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
                path: path_str.clone(),
                source,
            })?;

        debug!("已加载配置文件: {}", path_str);

        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = file.$field { self.$field = v; })*
            };
        }
        merge!(
            llm_api_key,
            llm_api_base_url,
            llm_model_name,
            input_price_per_million,
            output_price_per_million,
            google_client_id,
            google_client_secret,
            oauth_redirect_uri,
            oauth_auth_uri,
            oauth_token_uri,
            docs_api_base_url,
            verbose_logging,
        );
        if file.google_access_token.is_some() {
            self.google_access_token = file.google_access_token;
        }

        Ok(())
    }

    /// 用环境变量覆盖配置
    ///
    /// `lookup` 返回变量值；测试时可以传入固定的映射
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GOOGLE_API_KEY").or_else(|| lookup("LLM_API_KEY")) {
            self.llm_api_key = v;
        }
        if let Some(v) = lookup("LLM_API_BASE_URL") {
            self.llm_api_base_url = v;
        }
        if let Some(v) = lookup("LLM_MODEL_NAME") {
            self.llm_model_name = v;
        }
        if let Some(v) = parse_env(&lookup, "INPUT_PRICE_PER_MILLION")? {
            self.input_price_per_million = v;
        }
        if let Some(v) = parse_env(&lookup, "OUTPUT_PRICE_PER_MILLION")? {
            self.output_price_per_million = v;
        }
        if let Some(v) = lookup("GOOGLE_CLIENT_ID") {
            self.google_client_id = v;
        }
        if let Some(v) = lookup("GOOGLE_CLIENT_SECRET") {
            self.google_client_secret = v;
        }
        if let Some(v) = lookup("OAUTH_REDIRECT_URI") {
            self.oauth_redirect_uri = v;
        }
        if let Some(v) = lookup("OAUTH_AUTH_URI") {
            self.oauth_auth_uri = v;
        }
        if let Some(v) = lookup("OAUTH_TOKEN_URI") {
            self.oauth_token_uri = v;
        }
        if let Some(v) = lookup("GOOGLE_ACCESS_TOKEN") {
            self.google_access_token = Some(v).filter(|t| !t.trim().is_empty());
        }
        if let Some(v) = lookup("DOCS_API_BASE_URL") {
            self.docs_api_base_url = v;
        }
        if let Some(v) = parse_env(&lookup, "VERBOSE_LOGGING")? {
            self.verbose_logging = v;
        }
        Ok(())
    }

    /// 模型 API key，缺失时返回配置错误
    pub fn require_llm_api_key(&self) -> Result<&str, ConfigError> {
        require(&self.llm_api_key, "GOOGLE_API_KEY")
    }

    /// OAuth 客户端 (client_id, client_secret)
    pub fn require_oauth_client(&self) -> Result<(&str, &str), ConfigError> {
        Ok((
            require(&self.google_client_id, "GOOGLE_CLIENT_ID")?,
            require(&self.google_client_secret, "GOOGLE_CLIENT_SECRET")?,
        ))
    }
}

fn require<'a>(value: &'a str, var_name: &str) -> Result<&'a str, ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::Missing {
            var_name: var_name.to_string(),
        })
    } else {
        Ok(value)
    }
}

fn parse_env<T, F>(lookup: &F, var_name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var_name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            }),
    }
}
