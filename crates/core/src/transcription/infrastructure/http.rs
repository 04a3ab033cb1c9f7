use reqwest::StatusCode;

use crate::transcription::domain::backend::BackendError;

/// Maps a non-success HTTP status to the error taxonomy the retry layer
/// understands. 429 and 5xx are transient, everything else is fatal.
pub(crate) fn classify_status(
    backend: &'static str,
    status: StatusCode,
    body: String,
) -> BackendError {
    let message = if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    };
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            BackendError::Auth { backend, message }
        }
        StatusCode::TOO_MANY_REQUESTS => BackendError::RateLimited { backend, message },
        StatusCode::BAD_REQUEST
        | StatusCode::NOT_FOUND
        | StatusCode::PAYLOAD_TOO_LARGE
        | StatusCode::UNPROCESSABLE_ENTITY => BackendError::InvalidArgument { backend, message },
        s if s.is_server_error() => BackendError::Unavailable { backend, message },
        _ => BackendError::Unexpected { backend, message },
    }
}

/// Maps a transport-level reqwest failure. Timeouts and connection
/// problems are worth retrying, anything else is not.
pub(crate) fn classify_transport(backend: &'static str, error: reqwest::Error) -> BackendError {
    let message = error.to_string();
    if error.is_timeout() {
        BackendError::Timeout { backend, message }
    } else if error.is_connect() {
        BackendError::Unavailable { backend, message }
    } else {
        BackendError::Unexpected { backend, message }
    }
}
