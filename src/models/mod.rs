pub mod credentials;
pub mod doc_request;
pub mod file_record;
pub mod memo;
pub mod section;
pub mod uploaded_file;

pub use credentials::Credentials;
pub use doc_request::DocRequest;
pub use file_record::{FileKind, FilePayload, FileRecord};
pub use memo::{ExtractedMemo, MemoField, EXTRACTION_FAILED, UNKNOWN};
pub use section::Section;
pub use uploaded_file::UploadedFile;
