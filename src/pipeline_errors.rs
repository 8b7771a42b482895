//! # Pipeline Error Types Module
//!
//! Error taxonomy for the label pipeline and the remote services it talks to.
//! Nothing in the pipeline retries; callers decide what to do with each kind.

/// Failure kinds surfaced by image decoding, OCR and remote analysis calls
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Unreadable or undecodable image/file, aborts the run
    Io(String),
    /// OCR engine initialization or recognition failure
    Engine(String),
    /// Non-success response (or transport failure) from a remote service
    Upstream {
        service: String,
        status: Option<u16>,
        body: String,
    },
    /// A bounded external call ran past its deadline
    Timeout { service: String, seconds: u64 },
    /// Empty token list, malformed date, degenerate window
    InvalidInput(String),
}

impl PipelineError {
    /// Upstream status code, when the remote service answered at all
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            PipelineError::Upstream { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PipelineError::Timeout { .. })
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Io(msg) => write!(f, "[IO] Image could not be read: {}", msg),
            PipelineError::Engine(msg) => write!(f, "[OCR_ENGINE] Text recognition failed: {}", msg),
            PipelineError::Upstream {
                service,
                status: Some(status),
                body,
            } => write!(f, "[UPSTREAM] {} returned {}: {}", service, status, body),
            PipelineError::Upstream {
                service,
                status: None,
                body,
            } => write!(f, "[UPSTREAM] {} unreachable: {}", service, body),
            PipelineError::Timeout { service, seconds } => {
                write!(f, "[TIMEOUT] {} did not answer within {} seconds", service, seconds)
            }
            PipelineError::InvalidInput(msg) => write!(f, "[INVALID_INPUT] {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}

impl From<image::ImageError> for PipelineError {
    fn from(err: image::ImageError) -> Self {
        PipelineError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_is_preserved() {
        let err = PipelineError::Upstream {
            service: "ailabtools".to_string(),
            status: Some(429),
            body: "quota".to_string(),
        };
        assert_eq!(err.upstream_status(), Some(429));
        assert!(err.to_string().contains("429"));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_timeout_is_distinct_from_upstream() {
        let err = PipelineError::Timeout {
            service: "ailabtools".to_string(),
            seconds: 60,
        };
        assert!(err.is_timeout());
        assert_eq!(err.upstream_status(), None);
        assert_eq!(
            err.to_string(),
            "[TIMEOUT] ailabtools did not answer within 60 seconds"
        );
    }
}
