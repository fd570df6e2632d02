pub mod cost_tracker;
pub mod document_builder;
pub mod extraction_service;
pub mod file_extractor;

pub use cost_tracker::{CostSummary, CostTracker, PriceTable};
pub use document_builder::DocumentBuilder;
pub use extraction_service::{ExtractionService, MemoExtractor};
pub use file_extractor::{process_all, process_uploaded_file, ProcessedBatch};
