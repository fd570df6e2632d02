//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次运行的资源准备和结果输出，是整个系统的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App (配置、凭证、文件加载)
//!     ↓
//! workflow::MemoFlow (处理一次生成)
//!     ↓
//! services (能力层：文件提取 / 模型提取 / 文档构建 / 成本统计)
//!     ↓
//! infrastructure (基础设施：Docs API / OAuth / 回调服务)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层创建 HTTP 客户端和模型客户端
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **无业务逻辑**：只做调度和输出，不做具体业务判断

pub mod app;

// 重新导出主要类型
pub use app::{App, GenerateOptions};
