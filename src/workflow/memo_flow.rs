//! Memo 生成流程 - 流程层
//!
//! 核心职责：定义"一次生成"的完整处理流程
//!
//! 流程顺序：
//! 1. 处理上传文件（失败的记录并跳过）
//! 2. 一次模型调用提取字段
//! 3. 创建文档（dry-run 时只生成本地预览）
//! 4. 汇总成本

use tracing::{error, info, warn};

use crate::error::{DocsError, FileError};
use crate::models::{Credentials, ExtractedMemo, MemoField, UploadedFile};
use crate::services::document_builder::{build_requests, render_preview};
use crate::services::{process_all, CostSummary, CostTracker, DocumentBuilder, MemoExtractor};
use crate::utils::logging;

/// 文档阶段的结果
#[derive(Debug)]
pub enum DocumentOutcome {
    /// 文档已创建
    Created { url: String },
    /// dry-run：本地渲染的文档文本
    Preview { text: String },
    /// 创建失败
    Failed(DocsError),
}

impl DocumentOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, DocumentOutcome::Failed(_))
    }
}

/// 一次运行的报告
#[derive(Debug)]
pub struct MemoReport {
    /// 被拒绝的文件
    pub rejected: Vec<FileError>,
    /// 成功处理的文件名
    pub processed: Vec<String>,
    pub memo: ExtractedMemo,
    pub document: DocumentOutcome,
    pub summary: CostSummary,
}

/// Memo 生成流程
///
/// - 决定执行顺序，每一步等待上一步完成
/// - 不持有任何网络资源，只依赖业务能力（services）
pub struct MemoFlow<'a> {
    extractor: &'a dyn MemoExtractor,
    builder: DocumentBuilder<'a>,
    dry_run: bool,
}

impl<'a> MemoFlow<'a> {
    pub fn new(extractor: &'a dyn MemoExtractor, builder: DocumentBuilder<'a>, dry_run: bool) -> Self {
        Self {
            extractor,
            builder,
            dry_run,
        }
    }

    /// 执行一次完整生成
    ///
    /// # 参数
    /// - `files`: 上传的文件
    /// - `credentials`: 会话凭证（dry-run 时不使用）
    /// - `tracker`: 成本统计器，计时从这里开始
    pub async fn run(
        &self,
        files: &[UploadedFile],
        credentials: Option<&Credentials>,
        tracker: &mut CostTracker,
    ) -> MemoReport {
        tracker.start_timer();

        // ========== 步骤 1: 处理文件 ==========
        info!("📂 处理 {} 个文件...", files.len());
        let batch = process_all(files);
        if batch.records.is_empty() {
            warn!("⚠️ 没有可用的文件内容，仍将调用模型");
        }
        let processed = batch.records.iter().map(|r| r.name.clone()).collect();

        // ========== 步骤 2: 提取字段 ==========
        info!("🤖 正在提取 Memo 字段...");
        let memo = self.extractor.extract_all(&batch.records, tracker).await;
        if memo.is_degraded() {
            error!("❌ 字段提取失败: {}", memo.value(MemoField::BusinessDescription));
        }
        logging::log_memo_preview(&memo);

        // ========== 步骤 3: 构建文档 ==========
        let document = if self.dry_run {
            info!("🧪 dry-run：只生成本地预览");
            DocumentOutcome::Preview {
                text: render_preview(&build_requests(&memo)),
            }
        } else {
            match self.builder.create_memo(credentials, &memo).await {
                Ok(url) => {
                    info!("✅ 文档已创建: {}", url);
                    DocumentOutcome::Created { url }
                }
                Err(e) => {
                    error!("❌ {}", e);
                    DocumentOutcome::Failed(e)
                }
            }
        };

        tracker.stop_timer();

        MemoReport {
            rejected: batch.rejected,
            processed,
            memo,
            document,
            summary: tracker.summary(),
        }
    }
}
