use std::path::Path;

use crate::error::FileError;

/// 上传的文件
///
/// 只暴露文件名和原始字节，不关心文件来自哪里
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// 从磁盘读取文件，文件名取路径的最后一段
    pub async fn from_path(path: &Path) -> Result<Self, FileError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| FileError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self { name, bytes })
    }

    /// 小写的扩展名：文件名最后一个 `.` 之后的部分
    ///
    /// 没有 `.` 时返回整个文件名的小写形式
    pub fn extension(&self) -> String {
        self.name
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }
}
