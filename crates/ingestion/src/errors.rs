//! Ingestion error types

use papergraph_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Please upload a PDF file: {file_name}")]
    NotPdf { file_name: String },

    #[error("PDF parse error for {file_name}: {message}")]
    PdfParseError { file_name: String, message: String },

    #[error("No text content extracted from {file_name}")]
    NoText { file_name: String },
}

impl From<IngestionError> for AppError {
    fn from(e: IngestionError) -> Self {
        match e {
            IngestionError::NotPdf { .. } => AppError::validation("file", e.to_string()),
            IngestionError::PdfParseError { .. } | IngestionError::NoText { .. } => {
                AppError::InvalidFormat { message: e.to_string() }
            }
        }
    }
}
