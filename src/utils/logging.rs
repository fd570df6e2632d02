/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::ExtractedMemo;
use crate::services::CostSummary;

/// 预览中单个字段显示的最大字符数
const PREVIEW_MAX_CHARS: usize = 120;

/// 初始化日志
///
/// 优先使用 RUST_LOG；未设置时默认 `info`，`verbose` 为 true 时为 `debug`
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 重复初始化（例如测试中）时忽略错误
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `config`: 当前配置
/// - `file_count`: 待处理文件数
pub fn log_startup(config: &Config, file_count: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 IC Memo 生成器启动");
    info!(
        "启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("🤖 模型: {}", config.llm_model_name);
    info!("📂 文件数: {}", file_count);
    info!("{}", "=".repeat(60));
}

/// 记录提取结果的 JSON 预览
pub fn log_memo_preview(memo: &ExtractedMemo) {
    info!("\n{}", "─".repeat(60));
    info!("📋 提取结果预览");
    match serde_json::to_value(memo) {
        Ok(serde_json::Value::Object(map)) => {
            for (key, value) in map {
                let text = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
                info!("  {}: {}", key, truncate_text(&text, PREVIEW_MAX_CHARS));
            }
        }
        _ => info!("  (空)"),
    }
    info!("{}", "─".repeat(60));
}

/// 格式化运行统计：时长保留 2 位小数，成本保留 4 位小数
pub fn format_run_summary(summary: &CostSummary) -> String {
    format!(
        "Runtime: {:.2}s | Tokens: {} in / {} out | Est. Cost: ${:.4}",
        summary.duration_seconds,
        summary.input_tokens,
        summary.output_tokens,
        summary.cost_estimate_usd
    )
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("投资委员会备忘录", 4), "投资委员...");
    }

    #[test]
    fn test_run_summary_format() {
        let summary = CostSummary {
            input_tokens: 300,
            output_tokens: 60,
            cost_estimate_usd: 0.00024,
            duration_seconds: 1.23456,
        };
        assert_eq!(
            format_run_summary(&summary),
            "Runtime: 1.23s | Tokens: 300 in / 60 out | Est. Cost: $0.0002"
        );
    }
}
