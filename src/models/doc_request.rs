use serde::{Serialize, Serializer};
use serde_json::{json, Value};

/// 远程文档的单个编辑操作
///
/// 下标以 UTF-16 code unit 计，与 Docs API 一致
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocRequest {
    /// 在指定下标处插入文本
    InsertText { index: u32, text: String },
    /// 设置 `[start_index, end_index)` 区间的粗体和字号
    SetTextStyle {
        start_index: u32,
        end_index: u32,
        bold: bool,
        font_size_pt: u32,
    },
}

impl DocRequest {
    /// 转换为 `documents.batchUpdate` 请求体中的单个元素
    pub fn to_api_json(&self) -> Value {
        match self {
            DocRequest::InsertText { index, text } => json!({
                "insertText": {
                    "location": { "index": index },
                    "text": text,
                }
            }),
            DocRequest::SetTextStyle {
                start_index,
                end_index,
                bold,
                font_size_pt,
            } => json!({
                "updateTextStyle": {
                    "range": {
                        "startIndex": start_index,
                        "endIndex": end_index,
                    },
                    "textStyle": {
                        "bold": bold,
                        "fontSize": { "magnitude": font_size_pt, "unit": "PT" },
                    },
                    "fields": "bold,fontSize",
                }
            }),
        }
    }
}

impl Serialize for DocRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_api_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_text_wire_shape() {
        let request = DocRequest::InsertText {
            index: 1,
            text: "COMPANY NAME\nAcme\n\n".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"insertText": {"location": {"index": 1}, "text": "COMPANY NAME\nAcme\n\n"}})
        );
    }

    #[test]
    fn test_update_text_style_wire_shape() {
        let request = DocRequest::SetTextStyle {
            start_index: 1,
            end_index: 13,
            bold: true,
            font_size_pt: 14,
        };

        let value = request.to_api_json();
        let style = &value["updateTextStyle"];
        assert_eq!(style["range"]["startIndex"], 1);
        assert_eq!(style["range"]["endIndex"], 13);
        assert_eq!(style["textStyle"]["bold"], true);
        assert_eq!(style["textStyle"]["fontSize"]["magnitude"], 14);
        assert_eq!(style["textStyle"]["fontSize"]["unit"], "PT");
        assert_eq!(style["fields"], "bold,fontSize");
    }
}
