use image::DynamicImage;

/// 记录类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Image,
}

/// 记录内容
#[derive(Debug, Clone)]
pub enum FilePayload {
    /// 已加上文件头的文本
    Text(String),
    /// 解码后的图片
    Image(DynamicImage),
}

/// 从单个上传文件中提取出的统一记录
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub name: String,
    pub payload: FilePayload,
}

impl FileRecord {
    /// 创建文本记录，内容前加上 `--- File: {name} ---` 文件头
    pub fn text(name: impl Into<String>, content: &str) -> Self {
        let name = name.into();
        let payload = FilePayload::Text(format!("--- File: {} ---\n{}\n", name, content));
        Self { name, payload }
    }

    /// 创建图片记录
    pub fn image(name: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            name: name.into(),
            payload: FilePayload::Image(image),
        }
    }

    pub fn kind(&self) -> FileKind {
        match self.payload {
            FilePayload::Text(_) => FileKind::Text,
            FilePayload::Image(_) => FileKind::Image,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.payload {
            FilePayload::Text(text) => Some(text),
            FilePayload::Image(_) => None,
        }
    }
}
