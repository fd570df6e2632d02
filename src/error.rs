use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 文件处理错误
    #[error(transparent)]
    File(#[from] FileError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 文档 API 错误
    #[error(transparent)]
    Docs(#[from] DocsError),
    /// 授权错误
    #[error("授权错误: {0}")]
    Auth(#[from] AuthError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误
    #[error("错误: {0}")]
    Other(String),
}

/// 单个文件的处理错误
///
/// 显示文本统一以 `[Error` 开头，便于在日志和界面中识别
#[derive(Debug, Error)]
pub enum FileError {
    /// 不支持的文件类型
    #[error("[Error: unsupported file type '{extension}' ({name})]")]
    Unsupported { name: String, extension: String },
    /// PDF 解析失败
    #[error("[Error reading PDF {name}: {detail}]")]
    Pdf { name: String, detail: String },
    /// 表格解析失败（xlsx / xls / csv）
    #[error("[Error reading spreadsheet {name}: {detail}]")]
    Spreadsheet { name: String, detail: String },
    /// 文本不是合法的 UTF-8
    #[error("[Error decoding text {name}: {source}]")]
    Text {
        name: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
    /// 图片解码失败
    #[error("[Error decoding image {name}: {source}]")]
    Image {
        name: String,
        #[source]
        source: image::ImageError,
    },
    /// 读取文件失败
    #[error("[Error reading file {path}: {source}]")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    /// 出错文件的名称（或路径）
    pub fn file_name(&self) -> &str {
        match self {
            FileError::Unsupported { name, .. }
            | FileError::Pdf { name, .. }
            | FileError::Spreadsheet { name, .. }
            | FileError::Text { name, .. }
            | FileError::Image { name, .. } => name,
            FileError::Read { path, .. } => path,
        }
    }
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 构建请求失败
    #[error("构建 LLM 请求失败: {0}")]
    RequestBuild(#[source] async_openai::error::OpenAIError),
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: async_openai::error::OpenAIError,
    },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 返回内容不是合法 JSON
    #[error("无法解析LLM返回的JSON: {source}")]
    JsonParseFailed {
        #[source]
        source: serde_json::Error,
    },
    /// 返回的 JSON 不是对象
    #[error("LLM返回的JSON不是对象 (实际类型: {found})")]
    NotAnObject { found: String },
    /// 图片编码失败
    #[error("图片 {name} 编码失败: {source}")]
    ImageEncode {
        name: String,
        #[source]
        source: image::ImageError,
    },
}

/// 远程文档 API 错误
///
/// 除缺少凭证外，显示文本统一以 `Error creating doc:` 开头
#[derive(Debug, Error)]
pub enum DocsError {
    /// 未提供凭证
    #[error("Error: No credentials provided. Please login.")]
    MissingCredentials,
    /// 网络请求失败
    #[error("Error creating doc: request to {endpoint} failed: {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// API 返回错误响应
    #[error("Error creating doc: {endpoint} returned HTTP {status}: {body}")]
    BadResponse {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// 创建文档的响应中没有 documentId
    #[error("Error creating doc: response did not contain a documentId")]
    MissingDocumentId,
}

/// OAuth 授权错误
#[derive(Debug, Error)]
pub enum AuthError {
    /// 回调地址不合法
    #[error("回调地址不合法 ({uri}): {source}")]
    InvalidRedirectUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },
    /// 令牌请求失败
    #[error("令牌请求失败: {0}")]
    RequestFailed(#[source] reqwest::Error),
    /// 授权服务器拒绝了令牌请求
    #[error("令牌请求被拒绝 (HTTP {status}): {body}")]
    TokenRejected { status: u16, body: String },
    /// 用户拒绝授权，或回调中带有错误
    #[error("授权被拒绝: {reason}")]
    Denied { reason: String },
    /// 回调中缺少授权码
    #[error("回调中缺少授权码")]
    MissingCode,
    /// state 参数不一致
    #[error("回调 state 参数不匹配")]
    StateMismatch,
    /// 凭证中没有 refresh token
    #[error("凭证已过期且没有 refresh token，请重新登录")]
    NoRefreshToken,
    /// 无法监听本地回调端口
    #[error("无法监听回调地址 {addr}: {source}")]
    Listener {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// 回调服务提前退出
    #[error("回调服务在收到授权码前退出")]
    CallbackClosed,
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 缺少必需的配置项
    #[error("缺少必需的配置项 {var_name}")]
    Missing { var_name: String },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
