use crate::models::memo::{ExtractedMemo, MemoField};

pub const COMPANY_NAME: &str = "COMPANY NAME";
pub const INVESTMENT_SNAPSHOT: &str = "INVESTMENT SNAPSHOT";
pub const BUSINESS_DESCRIPTION: &str = "BUSINESS DESCRIPTION";
pub const FUNDRAISING_HISTORY: &str = "FUNDRAISING HISTORY";

/// INVESTMENT SNAPSHOT 中的六项指标，按显示顺序排列
pub const SNAPSHOT_METRICS: [(&str, MemoField); 6] = [
    ("Cost", MemoField::Cost),
    ("FMV", MemoField::Fmv),
    ("Equity %", MemoField::EquityPercent),
    ("Valuation Basis", MemoField::ValuationBasis),
    ("Total $ Raised", MemoField::TotalRaised),
    ("SOSV Initial Investment Year", MemoField::SosvInitialInvestmentYear),
];

/// 文档中的一个段落：大写标题 + 正文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub header: &'static str,
    pub body: String,
}

impl Section {
    pub fn new(header: &'static str, body: impl Into<String>) -> Self {
        Self {
            header,
            body: body.into(),
        }
    }

    /// 插入文档的完整文本：`{HEADER}\n{BODY}\n\n`
    pub fn full_text(&self) -> String {
        format!("{}\n{}\n\n", self.header, self.body)
    }

    /// 按文档从上到下的顺序生成四个段落
    ///
    /// 不论字段是否缺失，四个段落总是全部生成
    pub fn from_memo(memo: &ExtractedMemo) -> [Section; 4] {
        [
            Section::new(COMPANY_NAME, memo.value(MemoField::CompanyName)),
            Section::new(INVESTMENT_SNAPSHOT, investment_snapshot(memo)),
            Section::new(BUSINESS_DESCRIPTION, memo.value(MemoField::BusinessDescription)),
            Section::new(FUNDRAISING_HISTORY, memo.value(MemoField::FundraisingHistory)),
        ]
    }
}

/// 生成六行 `Label: value` 指标块
pub fn investment_snapshot(memo: &ExtractedMemo) -> String {
    SNAPSHOT_METRICS
        .iter()
        .map(|(label, field)| format!("{}: {}", label, memo.value(*field)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_with_one_metric_set() {
        let mut memo = ExtractedMemo::default();
        memo.set(MemoField::CompanyName, "Acme");
        memo.set(MemoField::BusinessDescription, "Makes widgets.");
        memo.set(MemoField::Fmv, "$2M");

        let snapshot = investment_snapshot(&memo);
        let lines: Vec<&str> = snapshot.lines().collect();

        assert_eq!(
            lines,
            vec![
                "Cost: Unknown",
                "FMV: $2M",
                "Equity %: Unknown",
                "Valuation Basis: Unknown",
                "Total $ Raised: Unknown",
                "SOSV Initial Investment Year: Unknown",
            ]
        );
    }

    #[test]
    fn test_sections_in_document_order() {
        let sections = Section::from_memo(&ExtractedMemo::default());
        let headers: Vec<_> = sections.iter().map(|s| s.header).collect();

        assert_eq!(
            headers,
            vec![COMPANY_NAME, INVESTMENT_SNAPSHOT, BUSINESS_DESCRIPTION, FUNDRAISING_HISTORY]
        );
        assert_eq!(sections[0].body, "Unknown");
    }

    #[test]
    fn test_full_text_layout() {
        let section = Section::new(COMPANY_NAME, "Acme");
        assert_eq!(section.full_text(), "COMPANY NAME\nAcme\n\n");
    }
}
