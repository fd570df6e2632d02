//! 文件分类与提取 - 业务能力层
//!
//! 按扩展名分派到对应的读取器，统一输出 [`FileRecord`]
//!
//! ## 支持的格式
//! - `pdf`：pdf-extract 逐页提取文本
//! - `xlsx` / `xls`：calamine 读取所有工作表
//! - `csv`：csv crate 读取表头和记录
//! - `txt` / `md`：按 UTF-8 解码
//! - `png` / `jpg` / `jpeg`：image crate 解码为图片

use std::io::Cursor;
use std::panic::AssertUnwindSafe;

use calamine::{open_workbook_auto_from_rs, Reader};
use tracing::{debug, error, info};

use crate::error::FileError;
use crate::models::{FileRecord, UploadedFile};

/// 允许上传的扩展名
pub const SUPPORTED_EXTENSIONS: [&str; 9] =
    ["pdf", "xlsx", "xls", "csv", "txt", "md", "png", "jpg", "jpeg"];

/// 表格单元格之间的分隔符
const CELL_SEPARATOR: &str = " | ";

/// 按扩展名识别出的文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Workbook,
    Csv,
    PlainText,
    Image,
}

impl FileType {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "pdf" => Some(FileType::Pdf),
            "xlsx" | "xls" => Some(FileType::Workbook),
            "csv" => Some(FileType::Csv),
            "txt" | "md" => Some(FileType::PlainText),
            "png" | "jpg" | "jpeg" => Some(FileType::Image),
            _ => None,
        }
    }
}

/// 一批文件的处理结果
#[derive(Debug, Default)]
pub struct ProcessedBatch {
    /// 成功的记录，保持输入顺序
    pub records: Vec<FileRecord>,
    /// 失败的文件
    pub rejected: Vec<FileError>,
}

/// 处理单个上传文件
pub fn process_uploaded_file(file: &UploadedFile) -> Result<FileRecord, FileError> {
    let extension = file.extension();
    let file_type = FileType::from_extension(&extension).ok_or_else(|| FileError::Unsupported {
        name: file.name.clone(),
        extension: extension.clone(),
    })?;

    debug!("处理文件 {} (类型: {:?})", file.name, file_type);

    match file_type {
        FileType::Pdf => read_pdf(&file.name, &file.bytes).map(|t| FileRecord::text(&file.name, &t)),
        FileType::Workbook => {
            read_workbook(&file.name, &file.bytes).map(|t| FileRecord::text(&file.name, &t))
        }
        FileType::Csv => read_csv(&file.name, &file.bytes).map(|t| FileRecord::text(&file.name, &t)),
        FileType::PlainText => {
            read_text(&file.name, &file.bytes).map(|t| FileRecord::text(&file.name, &t))
        }
        FileType::Image => image::load_from_memory(&file.bytes)
            .map(|img| FileRecord::image(&file.name, img))
            .map_err(|source| FileError::Image {
                name: file.name.clone(),
                source,
            }),
    }
}

/// 处理一批文件：单个文件失败只记录，不中断整批
pub fn process_all(files: &[UploadedFile]) -> ProcessedBatch {
    let mut batch = ProcessedBatch::default();

    for file in files {
        match process_uploaded_file(file) {
            Ok(record) => {
                info!("✓ 已处理文件: {} ({:?})", file.name, record.kind());
                batch.records.push(record);
            }
            Err(e) => {
                error!("❌ {}", e);
                batch.rejected.push(e);
            }
        }
    }

    batch
}

/// 逐页提取 PDF 文本，每页之后追加换行
///
/// pdf-extract 在遇到损坏的字体时可能 panic，这里转换为普通错误
fn read_pdf(name: &str, bytes: &[u8]) -> Result<String, FileError> {
    let pages = std::panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| FileError::Pdf {
        name: name.to_string(),
        detail: "PDF parser panicked, the file likely contains malformed fonts".to_string(),
    })?
    .map_err(|e| FileError::Pdf {
        name: name.to_string(),
        detail: e.to_string(),
    })?;

    let mut text = String::new();
    for page in &pages {
        text.push_str(page);
        text.push('\n');
    }

    debug!("PDF {} 提取完成: {} 页, {} 字符", name, pages.len(), text.len());
    Ok(text)
}

/// 读取 xlsx / xls 的所有工作表
fn read_workbook(name: &str, bytes: &[u8]) -> Result<String, FileError> {
    let spreadsheet_err = |detail: String| FileError::Spreadsheet {
        name: name.to_string(),
        detail,
    };

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| spreadsheet_err(e.to_string()))?;

    let mut text = String::new();
    for sheet_name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| spreadsheet_err(format!("sheet '{}': {}", sheet_name, e)))?;

        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();

        text.push_str(&format!("=== Sheet: {} ===\n", sheet_name));
        text.push_str(&render_table(&rows));
    }

    Ok(text)
}

/// 读取 CSV：表头 + 所有记录
fn read_csv(name: &str, bytes: &[u8]) -> Result<String, FileError> {
    let spreadsheet_err = |e: csv::Error| FileError::Spreadsheet {
        name: name.to_string(),
        detail: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);

    let mut rows = vec![reader
        .headers()
        .map_err(spreadsheet_err)?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>()];

    for record in reader.records() {
        let record = record.map_err(spreadsheet_err)?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(render_table(&rows))
}

fn read_text(name: &str, bytes: &[u8]) -> Result<String, FileError> {
    String::from_utf8(bytes.to_vec()).map_err(|source| FileError::Text {
        name: name.to_string(),
        source,
    })
}

/// 第一行为列名，其余为数据行；跳过完全为空的行
fn render_table(rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    for row in rows {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        out.push_str(&row.join(CELL_SEPARATOR));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileKind;
    use image::{DynamicImage, ImageFormat};

    fn png_bytes() -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(2, 2)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_every_supported_extension_has_a_reader() {
        for ext in SUPPORTED_EXTENSIONS {
            assert!(FileType::from_extension(ext).is_some(), "{}", ext);
        }
        assert!(FileType::from_extension("docx").is_none());
    }

    #[test]
    fn test_text_file() {
        let file = UploadedFile::new("notes.md", "# Acme\nSeed round");
        let record = process_uploaded_file(&file).unwrap();

        assert_eq!(record.kind(), FileKind::Text);
        assert_eq!(
            record.as_text(),
            Some("--- File: notes.md ---\n# Acme\nSeed round\n")
        );
    }

    #[test]
    fn test_invalid_utf8_is_error() {
        let file = UploadedFile::new("broken.txt", vec![0xffu8, 0xfe, 0x00]);
        let err = process_uploaded_file(&file).unwrap_err();
        assert!(matches!(err, FileError::Text { .. }));
        assert!(err.to_string().starts_with("[Error"));
    }

    #[test]
    fn test_csv_dump() {
        let file = UploadedFile::new("rounds.CSV", "Date,Round,Amount\n2021-01,Seed,$2M\n2022-06,A,$10M\n");
        let record = process_uploaded_file(&file).unwrap();
        let text = record.as_text().unwrap();

        assert!(text.contains("Date | Round | Amount\n"));
        assert!(text.contains("2021-01 | Seed | $2M\n"));
        assert!(text.contains("2022-06 | A | $10M\n"));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = UploadedFile::new("memo.docx", vec![1u8, 2, 3]);
        let err = process_uploaded_file(&file).unwrap_err();

        assert!(matches!(err, FileError::Unsupported { ref extension, .. } if extension == "docx"));
        assert!(err.to_string().starts_with("[Error"));
        assert!(err.to_string().contains("docx"));
    }

    #[test]
    fn test_image_is_decoded() {
        let file = UploadedFile::new("chart.PNG", png_bytes());
        let record = process_uploaded_file(&file).unwrap();
        assert_eq!(record.kind(), FileKind::Image);
        assert_eq!(record.name, "chart.PNG");
    }

    #[test]
    fn test_corrupt_image_is_error() {
        let file = UploadedFile::new("chart.jpg", vec![0u8, 1, 2, 3]);
        assert!(matches!(process_uploaded_file(&file), Err(FileError::Image { .. })));
    }

    #[test]
    fn test_corrupt_pdf_is_error() {
        let file = UploadedFile::new("deck.pdf", b"not a pdf at all".to_vec());
        let err = process_uploaded_file(&file).unwrap_err();
        assert!(matches!(err, FileError::Pdf { .. }));
        assert!(err.to_string().starts_with("[Error reading PDF"));
    }

    #[test]
    fn test_corrupt_workbook_is_error() {
        let file = UploadedFile::new("financials.xlsx", b"garbage".to_vec());
        assert!(matches!(
            process_uploaded_file(&file),
            Err(FileError::Spreadsheet { .. })
        ));
    }

    #[test]
    fn test_batch_keeps_going_after_failures() {
        let files = vec![
            UploadedFile::new("a.txt", "first"),
            UploadedFile::new("b.docx", vec![0u8]),
            UploadedFile::new("c.png", png_bytes()),
            UploadedFile::new("d.txt", vec![0xffu8]),
            UploadedFile::new("e.md", "last"),
        ];

        let batch = process_all(&files);
        let names: Vec<_> = batch.records.iter().map(|r| r.name.as_str()).collect();

        assert_eq!(names, vec!["a.txt", "c.png", "e.md"]);
        assert_eq!(batch.rejected.len(), 2);
        assert_eq!(batch.rejected[0].file_name(), "b.docx");
        assert_eq!(batch.rejected[1].file_name(), "d.txt");
    }

    #[test]
    fn test_render_table_skips_blank_rows() {
        let rows = vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["".to_string(), " ".to_string()],
            vec!["1".to_string(), "".to_string()],
        ];
        assert_eq!(render_table(&rows), "a | b\n1 | \n");
    }
}
