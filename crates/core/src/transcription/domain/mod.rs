pub mod backend;
pub mod chunk_result;
pub mod retry;
