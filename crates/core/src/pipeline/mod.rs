pub mod infrastructure;
pub mod orchestrator;
pub mod pipeline_error;
pub mod progress_sink;
pub mod transcribe_job_use_case;
