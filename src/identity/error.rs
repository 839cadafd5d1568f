use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the identity service.
///
/// `Display` is the human-readable message handed back to callers, who
/// decide per page whether to redirect, render the error or deny access.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid identity service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("identity service unavailable")]
    Network(#[from] reqwest::Error),
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    #[error("unexpected identity service response: {0}")]
    InvalidResponse(String),
    #[error("no active session")]
    MissingSession,
}

impl IdentityError {
    /// The provider answered and refused the request (bad credentials,
    /// expired or invalid token or code).
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { status, .. } if status.is_client_error())
    }

    /// HTTP status to surface for this failure.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        if self.is_rejection() || matches!(self, Self::MissingSession) {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_client_errors_map_to_unauthorized() {
        let err = IdentityError::Rejected {
            status: StatusCode::BAD_REQUEST,
            message: "Invalid login credentials".to_string(),
        };
        assert!(err.is_rejection());
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[test]
    fn provider_server_errors_map_to_internal() {
        let err = IdentityError::Rejected {
            status: StatusCode::BAD_GATEWAY,
            message: "upstream down".to_string(),
        };
        assert!(!err.is_rejection());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_session_is_unauthorized() {
        assert_eq!(
            IdentityError::MissingSession.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            IdentityError::InvalidResponse("no user".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
