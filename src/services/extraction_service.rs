//! 提取服务 - 业务能力层
//!
//! 只负责"从文件记录中提取 Memo 字段"，不关心文件从哪里来、结果写到哪里
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 调用兼容 OpenAI API 的服务（默认 Gemini 的兼容端点）
//! - 通过 `response_format` 的 JSON schema 约束输出
//! - 图片以 base64 PNG data URL 的形式内联

use std::io::Cursor;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrl, ResponseFormat,
        ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ConfigError, LlmError};
use crate::models::{ExtractedMemo, FilePayload, FileRecord, MemoField};
use crate::services::cost_tracker::CostTracker;

const SYSTEM_INSTRUCTION: &str = "You are an expert VC analyst assistant. Extract information for an IC Memo based on the following files.";

const EXTRACTION_PROMPT: &str = r#"Based on the provided documents, extract the following information.
If information is missing, explicitly state "Unknown".

Output must be in valid JSON format with the following keys:
{fields}

Ensure the tone is professional and objective.

Example Output:
{
    "company_name": "Acme Corp",
    "business_description": "Acme Corp is a logistics platform...",
    "cost": "$100,000",
    "fmv": "$500,000",
    "equity_percent": "5.2%",
    "valuation_basis": "Series A",
    "total_raised": "$12.5M",
    "sosv_initial_investment_year": "2021",
    "fundraising_history": "Date | Funds | Category | Type & Series | Amt Raised\n2021-01 | Fund I | Seed | Equity Seed | $2M\n..."
}"#;

/// 模型返回的 token 用量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// 一次模型调用的结果：正文 + 可选的用量信息
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub content: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// 提取能力
///
/// 流程层只依赖这个 trait，测试时可替换为固定结果
#[async_trait]
pub trait MemoExtractor: Send + Sync {
    /// 提取 Memo；失败时返回降级结果，不返回错误
    async fn extract_all(&self, records: &[FileRecord], tracker: &mut CostTracker)
        -> ExtractedMemo;
}

/// 提取服务
pub struct ExtractionService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl ExtractionService {
    /// 创建提取服务
    ///
    /// 缺少 API key 时直接返回配置错误，不会发出任何请求
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let api_key = config.require_llm_api_key()?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&config.llm_api_base_url);

        Ok(Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
        })
    }

    /// 提取 Memo，出错时返回错误
    pub async fn try_extract(
        &self,
        records: &[FileRecord],
        tracker: &mut CostTracker,
    ) -> Result<ExtractedMemo, LlmError> {
        let request = self.build_extraction_request(records)?;
        let reply = self.send(request).await?;
        interpret_reply(reply, tracker, &self.model_name)
    }

    /// 单次通用调用，同样记录 token 用量
    ///
    /// # 参数
    /// - `prompt`: 用户消息
    /// - `tracker`: 成本统计器
    ///
    /// # 返回
    /// 去掉首尾空白的响应文本
    pub async fn generate(
        &self,
        prompt: &str,
        tracker: &mut CostTracker,
    ) -> Result<String, LlmError> {
        debug!("调用 LLM API，模型: {}", self.model_name);

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(LlmError::RequestBuild)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .build()
            .map_err(LlmError::RequestBuild)?;

        let reply = self.send(request).await?;
        record_usage(&reply, tracker);

        reply
            .content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })
    }

    /// 构建提取请求
    ///
    /// 消息结构：
    /// 1. system：分析师角色说明
    /// 2. user：每张图片（前面带 `[Image: 文件名]` 标签）、所有文本拼接、提取提示词
    pub fn build_extraction_request(
        &self,
        records: &[FileRecord],
    ) -> Result<CreateChatCompletionRequest, LlmError> {
        let mut parts: Vec<ChatCompletionRequestUserMessageContentPart> = Vec::new();
        let mut text_context = String::new();
        let mut image_count = 0;

        for record in records {
            match &record.payload {
                FilePayload::Text(content) => {
                    text_context.push('\n');
                    text_context.push_str(content);
                    text_context.push('\n');
                }
                FilePayload::Image(image) => {
                    parts.push(text_part(format!("\n[Image: {}]\n", record.name)));
                    let url = image_data_url(image).map_err(|source| LlmError::ImageEncode {
                        name: record.name.clone(),
                        source,
                    })?;
                    parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                        ChatCompletionRequestMessageContentPartImage {
                            image_url: ImageUrl {
                                url,
                                detail: Some(ImageDetail::Auto),
                            },
                        },
                    ));
                    image_count += 1;
                }
            }
        }

        parts.push(text_part(text_context));
        parts.push(text_part(extraction_prompt()));

        debug!(
            "提取请求: {} 个文件, {} 张图片, {} 个内容块",
            records.len(),
            image_count,
            parts.len()
        );

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_INSTRUCTION)
            .build()
            .map_err(LlmError::RequestBuild)?;

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(parts))
            .build()
            .map_err(LlmError::RequestBuild)?;

        CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: Some("Structured fields for an Investment Committee memo".into()),
                    name: "ic_memo".into(),
                    schema: Some(memo_schema()),
                    strict: Some(true),
                },
            })
            .build()
            .map_err(LlmError::RequestBuild)
    }

    async fn send(&self, request: CreateChatCompletionRequest) -> Result<ModelReply, LlmError> {
        let response = self.client.chat().create(request).await.map_err(|source| {
            warn!("LLM API 调用失败: {}", source);
            LlmError::ApiCallFailed {
                model: self.model_name.clone(),
                source,
            }
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone());
        let usage = response.usage.as_ref().map(|u| TokenUsage {
            prompt_tokens: u64::from(u.prompt_tokens),
            completion_tokens: u64::from(u.completion_tokens),
        });

        Ok(ModelReply { content, usage })
    }
}

#[async_trait]
impl MemoExtractor for ExtractionService {
    async fn extract_all(
        &self,
        records: &[FileRecord],
        tracker: &mut CostTracker,
    ) -> ExtractedMemo {
        match self.try_extract(records, tracker).await {
            Ok(memo) => {
                info!("✓ 提取完成 (模型: {})", self.model_name);
                memo
            }
            Err(e) => {
                warn!("⚠️ 提取失败，使用降级结果: {}", e);
                ExtractedMemo::degraded(e)
            }
        }
    }
}

/// 解析模型回复
///
/// 用量信息在解析之前记录，保证每次调用恰好记一次，即使 JSON 不合法
pub fn interpret_reply(
    reply: ModelReply,
    tracker: &mut CostTracker,
    model_name: &str,
) -> Result<ExtractedMemo, LlmError> {
    record_usage(&reply, tracker);

    let content = reply
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| LlmError::EmptyContent {
            model: model_name.to_string(),
        })?;

    ExtractedMemo::from_json_str(&content)
}

fn record_usage(reply: &ModelReply, tracker: &mut CostTracker) {
    if let Some(usage) = reply.usage {
        debug!(
            "token 用量: 输入 {}, 输出 {}",
            usage.prompt_tokens, usage.completion_tokens
        );
        tracker.add_tokens(usage.prompt_tokens, usage.completion_tokens);
    }
}

/// 九个字段全部必填的 JSON schema
pub fn memo_schema() -> Value {
    let properties: Map<String, Value> = MemoField::ALL
        .iter()
        .map(|field| {
            (
                field.key().to_string(),
                json!({ "type": "string", "description": field.description() }),
            )
        })
        .collect();
    let required: Vec<&str> = MemoField::ALL.iter().map(|f| f.key()).collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn extraction_prompt() -> String {
    let fields = MemoField::ALL
        .iter()
        .map(|f| format!("- {}: {}", f.key(), f.description()))
        .collect::<Vec<_>>()
        .join("\n");
    EXTRACTION_PROMPT.replacen("{fields}", &fields, 1)
}

fn text_part(text: String) -> ChatCompletionRequestUserMessageContentPart {
    ChatCompletionRequestUserMessageContentPart::Text(ChatCompletionRequestMessageContentPartText {
        text,
    })
}

fn image_data_url(image: &DynamicImage) -> Result<String, image::ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(buffer.into_inner())
    ))
}
