use thiserror::Error;

/// Request-terminal failures. Each maps to one HTTP status and renders as
/// `{"error": <message>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Server error: {0}")]
    ServerError(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::MethodNotAllowed => 405,
            ApiError::ServerError(_) => 500,
        }
    }
}

/// Remote and internal failures surface as a server error carrying only the
/// message chain.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::ServerError(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn status_codes() {
        assert_eq!(ApiError::bad_request("x").status_code(), 400);
        assert_eq!(ApiError::not_found("x").status_code(), 404);
        assert_eq!(ApiError::MethodNotAllowed.status_code(), 405);
        assert_eq!(ApiError::ServerError("x".into()).status_code(), 500);
    }

    #[test]
    fn anyhow_becomes_server_error_with_chain() {
        let err: anyhow::Result<()> = Err(anyhow::anyhow!("connection reset"))
            .context("CRM request crm.item.get failed");
        let api: ApiError = err.unwrap_err().into();
        assert_eq!(
            api.to_string(),
            "Server error: CRM request crm.item.get failed: connection reset"
        );
    }
}
