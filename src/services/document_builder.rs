//! 文档构建服务 - 业务能力层
//!
//! 把 [`ExtractedMemo`] 转换为一批有序的插入 / 样式操作，并提交到远程文档
//!
//! ## 倒序插入
//!
//! 所有插入都发生在文档起始位置（下标 1）。每次插入都会把之前插入的内容往下推，
//! 所以按目标顺序的**倒序**生成段落，最终文档从上到下就是：
//!
//! ```text
//! COMPANY NAME
//! INVESTMENT SNAPSHOT
//! BUSINESS DESCRIPTION
//! FUNDRAISING HISTORY
//! ```

use tracing::{debug, info, warn};

use crate::error::DocsError;
use crate::infrastructure::DocsApi;
use crate::models::{Credentials, DocRequest, ExtractedMemo, Section};

/// 文档正文的起始下标
pub const START_INDEX: u32 = 1;
pub const HEADER_FONT_PT: u32 = 14;
pub const BODY_FONT_PT: u32 = 11;

/// Docs API 的下标按 UTF-16 code unit 计
fn utf16_len(text: &str) -> u32 {
    text.encode_utf16().count() as u32
}

/// 单个段落的三个操作：插入文本、标题样式、正文样式
pub fn section_requests(section: &Section) -> [DocRequest; 3] {
    let full_text = section.full_text();
    let header_len = utf16_len(section.header);
    let full_len = utf16_len(&full_text);

    [
        DocRequest::InsertText {
            index: START_INDEX,
            text: full_text,
        },
        DocRequest::SetTextStyle {
            start_index: START_INDEX,
            end_index: START_INDEX + header_len,
            bold: true,
            font_size_pt: HEADER_FONT_PT,
        },
        DocRequest::SetTextStyle {
            // +1 跳过标题后的换行
            start_index: START_INDEX + header_len + 1,
            end_index: START_INDEX + full_len,
            bold: false,
            font_size_pt: BODY_FONT_PT,
        },
    ]
}

/// 生成完整的 12 个操作（4 个段落，倒序）
pub fn build_requests(memo: &ExtractedMemo) -> Vec<DocRequest> {
    Section::from_memo(memo)
        .iter()
        .rev()
        .flat_map(section_requests)
        .collect()
}

/// 文档标题；没有公司名时使用 `Draft`
pub fn document_title(memo: &ExtractedMemo) -> String {
    let name = memo
        .company_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or("Draft");
    format!("IC Memo - {}", name)
}

pub fn document_url(document_id: &str) -> String {
    format!("https://docs.google.com/document/d/{}/edit", document_id)
}

/// 在内存中的空白文档上依次应用操作，返回最终文本
///
/// 只模拟文本插入，样式操作不改变文本
pub fn render_preview(requests: &[DocRequest]) -> String {
    let mut body: Vec<u16> = Vec::new();

    for request in requests {
        if let DocRequest::InsertText { index, text } = request {
            let at = (index.saturating_sub(START_INDEX) as usize).min(body.len());
            body.splice(at..at, text.encode_utf16());
        }
    }

    String::from_utf16_lossy(&body)
}

/// 文档构建器
///
/// 职责：
/// - 生成操作列表
/// - 创建文档并一次性提交所有操作
/// - 只把凭证转交给 API，不检查其内容
pub struct DocumentBuilder<'a> {
    api: &'a dyn DocsApi,
}

impl<'a> DocumentBuilder<'a> {
    pub fn new(api: &'a dyn DocsApi) -> Self {
        Self { api }
    }

    /// 创建 Memo 文档
    ///
    /// # 参数
    /// - `credentials`: 会话凭证；为 None 时直接返回错误，不发出任何请求
    /// - `memo`: 提取结果
    ///
    /// # 返回
    /// 成功时返回文档 URL
    pub async fn create_memo(
        &self,
        credentials: Option<&Credentials>,
        memo: &ExtractedMemo,
    ) -> Result<String, DocsError> {
        let credentials = credentials.ok_or(DocsError::MissingCredentials)?;

        let title = document_title(memo);
        let requests = build_requests(memo);

        info!("📝 正在创建文档: {}", title);
        let document_id = self
            .api
            .create_document(credentials, &title)
            .await
            .map_err(|e| {
                warn!("创建文档失败: {}", e);
                e
            })?;

        debug!("文档已创建: {}，提交 {} 个操作", document_id, requests.len());
        self.api
            .batch_update(credentials, &document_id, &requests)
            .await
            .map_err(|e| {
                warn!("批量更新失败: {}", e);
                e
            })?;

        Ok(document_url(&document_id))
    }
}
