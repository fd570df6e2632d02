//! IC Memo 提取结果

use std::fmt::Display;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LlmError;

/// 字段缺失或为空时的显示值
pub const UNKNOWN: &str = "Unknown";

/// 提取失败时写入 company_name 的值
pub const EXTRACTION_FAILED: &str = "Error extracting";

/// Memo 的九个固定字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoField {
    CompanyName,
    BusinessDescription,
    Cost,
    Fmv,
    EquityPercent,
    ValuationBasis,
    TotalRaised,
    SosvInitialInvestmentYear,
    FundraisingHistory,
}

impl MemoField {
    pub const ALL: [MemoField; 9] = [
        MemoField::CompanyName,
        MemoField::BusinessDescription,
        MemoField::Cost,
        MemoField::Fmv,
        MemoField::EquityPercent,
        MemoField::ValuationBasis,
        MemoField::TotalRaised,
        MemoField::SosvInitialInvestmentYear,
        MemoField::FundraisingHistory,
    ];

    /// JSON 中的键名
    pub fn key(self) -> &'static str {
        match self {
            MemoField::CompanyName => "company_name",
            MemoField::BusinessDescription => "business_description",
            MemoField::Cost => "cost",
            MemoField::Fmv => "fmv",
            MemoField::EquityPercent => "equity_percent",
            MemoField::ValuationBasis => "valuation_basis",
            MemoField::TotalRaised => "total_raised",
            MemoField::SosvInitialInvestmentYear => "sosv_initial_investment_year",
            MemoField::FundraisingHistory => "fundraising_history",
        }
    }

    /// 写入提示词和 JSON schema 的字段说明
    pub fn description(self) -> &'static str {
        match self {
            MemoField::CompanyName => "The name of the company.",
            MemoField::BusinessDescription => {
                "A concise, neutral VC-style business description (1-2 sentences)."
            }
            MemoField::Cost => "Total cost of investment.",
            MemoField::Fmv => "Current Fair Market Value (FMV).",
            MemoField::EquityPercent => "Current equity percentage held.",
            MemoField::ValuationBasis => {
                "The basis for current valuation (e.g., Last Round, Note conversion)."
            }
            MemoField::TotalRaised => "Total amount raised by the company to date.",
            MemoField::SosvInitialInvestmentYear => {
                "The year (YYYY) of SOSV's initial investment."
            }
            MemoField::FundraisingHistory => {
                "A text table with columns: Date | Funds | Category | Type & Series | Amt Raised."
            }
        }
    }
}

/// 模型提取出的 Memo
///
/// 每个字段都是可选的；通过 [`ExtractedMemo::value`] 读取时，
/// 缺失或空白的字段一律显示为 `Unknown`。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedMemo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fmv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equity_percent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valuation_basis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_raised: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sosv_initial_investment_year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fundraising_history: Option<String>,
}

impl ExtractedMemo {
    /// 提取失败时的降级结果
    ///
    /// 只填写 company_name / business_description / fundraising_history，其余字段缺失
    pub fn degraded(detail: impl Display) -> Self {
        Self {
            company_name: Some(EXTRACTION_FAILED.to_string()),
            business_description: Some(format!("Error: {}", detail)),
            fundraising_history: Some("Error".to_string()),
            ..Default::default()
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.company_name.as_deref() == Some(EXTRACTION_FAILED)
    }

    /// 原始值，缺失时为 None
    pub fn get(&self, field: MemoField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// 显示值，缺失或空白时为 `Unknown`
    pub fn value(&self, field: MemoField) -> &str {
        match self.get(field) {
            Some(v) if !v.trim().is_empty() => v,
            _ => UNKNOWN,
        }
    }

    pub fn set(&mut self, field: MemoField, value: impl Into<String>) {
        *self.slot_mut(field) = Some(value.into());
    }

    /// 解析模型返回的文本
    ///
    /// 允许外层包着 Markdown 代码块（```json ... ```）
    pub fn from_json_str(text: &str) -> Result<Self, LlmError> {
        let body = strip_code_fence(text);
        let value: Value =
            serde_json::from_str(body).map_err(|source| LlmError::JsonParseFailed { source })?;
        Self::from_json_value(value)
    }

    /// 从 JSON 对象构建
    ///
    /// 字符串原样保留，数字和布尔值转为字符串，null 视为缺失，未知键忽略
    pub fn from_json_value(value: Value) -> Result<Self, LlmError> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(LlmError::NotAnObject {
                    found: json_type_name(&other).to_string(),
                })
            }
        };

        let mut memo = Self::default();
        for field in MemoField::ALL {
            match map.get(field.key()) {
                None | Some(Value::Null) => {}
                Some(Value::String(s)) => memo.set(field, s.clone()),
                Some(other) => memo.set(field, other.to_string()),
            }
        }
        Ok(memo)
    }

    fn slot(&self, field: MemoField) -> &Option<String> {
        match field {
            MemoField::CompanyName => &self.company_name,
            MemoField::BusinessDescription => &self.business_description,
            MemoField::Cost => &self.cost,
            MemoField::Fmv => &self.fmv,
            MemoField::EquityPercent => &self.equity_percent,
            MemoField::ValuationBasis => &self.valuation_basis,
            MemoField::TotalRaised => &self.total_raised,
            MemoField::SosvInitialInvestmentYear => &self.sosv_initial_investment_year,
            MemoField::FundraisingHistory => &self.fundraising_history,
        }
    }

    fn slot_mut(&mut self, field: MemoField) -> &mut Option<String> {
        match field {
            MemoField::CompanyName => &mut self.company_name,
            MemoField::BusinessDescription => &mut self.business_description,
            MemoField::Cost => &mut self.cost,
            MemoField::Fmv => &mut self.fmv,
            MemoField::EquityPercent => &mut self.equity_percent,
            MemoField::ValuationBasis => &mut self.valuation_basis,
            MemoField::TotalRaised => &mut self.total_raised,
            MemoField::SosvInitialInvestmentYear => &mut self.sosv_initial_investment_year,
            MemoField::FundraisingHistory => &mut self.fundraising_history,
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)^\s*```(?:json|JSON)?\s*(.*?)\s*```\s*$").expect("fence regex is valid")
    });

    match fence.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_and_empty_fields_read_as_unknown() {
        let mut memo = ExtractedMemo::default();
        memo.set(MemoField::Cost, "   ");

        assert_eq!(memo.value(MemoField::CompanyName), UNKNOWN);
        assert_eq!(memo.value(MemoField::Cost), UNKNOWN);
        assert_eq!(memo.get(MemoField::Cost), Some("   "));
    }

    #[test]
    fn test_parse_full_object() {
        let memo = ExtractedMemo::from_json_str(
            r#"{"company_name": "Acme Corp", "fmv": "$500,000", "equity_percent": "5.2%"}"#,
        )
        .unwrap();

        assert_eq!(memo.value(MemoField::CompanyName), "Acme Corp");
        assert_eq!(memo.value(MemoField::Fmv), "$500,000");
        assert_eq!(memo.value(MemoField::EquityPercent), "5.2%");
        assert_eq!(memo.value(MemoField::TotalRaised), UNKNOWN);
    }

    #[test]
    fn test_parse_coerces_scalars_and_skips_null() {
        let memo = ExtractedMemo::from_json_str(
            r#"{"sosv_initial_investment_year": 2021, "cost": null, "extra": "ignored"}"#,
        )
        .unwrap();

        assert_eq!(memo.get(MemoField::SosvInitialInvestmentYear), Some("2021"));
        assert_eq!(memo.get(MemoField::Cost), None);
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = "```json\n{\"company_name\": \"Fenced\"}\n```";
        let memo = ExtractedMemo::from_json_str(text).unwrap();
        assert_eq!(memo.value(MemoField::CompanyName), "Fenced");
    }

    #[test]
    fn test_parse_malformed_json() {
        let err = ExtractedMemo::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, LlmError::JsonParseFailed { .. }));
    }

    #[test]
    fn test_parse_non_object() {
        let err = ExtractedMemo::from_json_str("[1, 2]").unwrap_err();
        assert!(matches!(err, LlmError::NotAnObject { ref found } if found == "array"));
    }

    #[test]
    fn test_degraded_memo_shape() {
        let memo = ExtractedMemo::degraded("boom");

        assert!(memo.is_degraded());
        assert_eq!(memo.value(MemoField::CompanyName), "Error extracting");
        assert_eq!(memo.value(MemoField::BusinessDescription), "Error: boom");
        assert_eq!(memo.value(MemoField::FundraisingHistory), "Error");
        assert_eq!(memo.get(MemoField::Cost), None);
        assert_eq!(memo.value(MemoField::Cost), UNKNOWN);
    }

    #[test]
    fn test_serialize_skips_absent_keys() {
        let memo = ExtractedMemo::degraded("x");
        let json = serde_json::to_value(&memo).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 3);
    }
}
