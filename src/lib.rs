//! # IC Memo
//!
//! 从上传的投资资料中提取关键字段，生成投资委员会（IC）备忘录 Google 文档
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 外部 API 的薄封装，只暴露能力
//! - `DocsApi` / `GoogleDocsApi` - 创建文档与批量更新
//! - `OAuthClient` - 授权链接、换取令牌、刷新令牌
//! - `callback` - 本地回调服务，接收授权码
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `file_extractor` - 按扩展名分派读取器，输出 `FileRecord`
//! - `ExtractionService` - 一次结构化提取调用
//! - `DocumentBuilder` - 倒序插入生成 12 个文档操作
//! - `CostTracker` - token 用量、耗时与成本估算
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次生成"的完整处理流程
//! - `MemoFlow` - 流程编排（文件 → 提取 → 文档 → 统计）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 配置、会话凭证、文件加载与结果输出
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{DocsApi, GoogleDocsApi, OAuthClient};
pub use models::{Credentials, DocRequest, ExtractedMemo, FileRecord, UploadedFile};
pub use orchestrator::{App, GenerateOptions};
pub use services::{CostTracker, DocumentBuilder, ExtractionService, MemoExtractor};
pub use workflow::{DocumentOutcome, MemoFlow, MemoReport};
