pub mod assemblyai;
pub mod backend_factory;
mod http;
pub mod openai;
