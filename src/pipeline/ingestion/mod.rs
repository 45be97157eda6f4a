// Pipeline ingestion: batched reading of the line-delimited registry feed

pub mod reader;

pub use reader::BatchReader;
