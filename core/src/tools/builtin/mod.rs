//! Built-in tools

pub mod search_docs;
pub mod search_web;
pub mod write_file;

pub use search_docs::SearchLocalDocsTool;
pub use search_web::SearchWebTool;
pub use write_file::WriteFileTool;
