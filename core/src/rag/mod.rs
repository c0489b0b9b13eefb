//! Knowledge retrieval: chunking, the persisted vector index, query-time
//! retrieval and the offline ingestion step

pub mod chunk;
pub mod index;
pub mod ingest;
pub mod retriever;

pub use index::{IndexedChunk, RetrievedChunk, VectorIndex};
pub use ingest::{ingest_docs, IngestStats};
pub use retriever::Retriever;
