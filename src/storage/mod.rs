//! Persistence of the attendance document.
//!
//! The whole [entities::AppState] lives in a single JSON file. It is read once at startup and
//! rewritten in full after every change, see [document_storage::JsonDocumentStorage].

pub mod document_storage;
pub mod entities;
