//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use hireloop_core::domain::DomainError;
use hireloop_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;
use serde_json::json;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const THROTTLED: i32 = 4003;
    pub const INVALID_STATE: i32 = 4004;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
    pub const SYSTEM_ERROR: i32 = 5002;
}

fn plain(code: i32, msg: impl Into<String>) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(code, msg.into(), None::<()>)
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    match err {
        AppError::Validation(msg) => plain(code::VALIDATION_ERROR, msg),
        AppError::Serialization(e) => plain(code::VALIDATION_ERROR, e.to_string()),
        AppError::NotFound(msg) => plain(code::NOT_FOUND, msg),
        AppError::Conflict(msg) => plain(code::CONFLICT, msg),
        AppError::InvalidState(msg) => plain(code::INVALID_STATE, msg),
        AppError::RateLimited { retry_after_ms } => ErrorObjectOwned::owned(
            code::THROTTLED,
            format!("Rate limit exceeded, retry after {}ms", retry_after_ms),
            Some(json!({ "retry_after_ms": retry_after_ms })),
        ),
        AppError::Domain(e) => {
            let code = match &e {
                DomainError::InvalidStateTransition { .. } => code::INVALID_STATE,
                DomainError::ValidationError(_) => code::VALIDATION_ERROR,
            };
            plain(code, e.to_string())
        }
        AppError::Database(msg) => plain(code::DB_ERROR, msg),
        AppError::Provider(e) => plain(code::SYSTEM_ERROR, e.to_string()),
        AppError::Internal(msg) => plain(code::INTERNAL_ERROR, msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hireloop_core::port::ProviderError;

    #[test]
    fn test_client_errors_map_to_4xxx() {
        assert_eq!(
            to_rpc_error(AppError::Validation("bad".into())).code(),
            code::VALIDATION_ERROR
        );
        assert_eq!(
            to_rpc_error(AppError::not_found("Interview", "iv-1")).code(),
            code::NOT_FOUND
        );
        assert_eq!(
            to_rpc_error(AppError::Conflict("taken".into())).code(),
            code::CONFLICT
        );
        assert_eq!(
            to_rpc_error(AppError::InvalidState("cancelled".into())).code(),
            code::INVALID_STATE
        );
    }

    #[test]
    fn test_domain_transition_is_invalid_state() {
        let err = AppError::Domain(DomainError::InvalidStateTransition {
            from: "COMPLETED".into(),
            to: "CANCELLED".into(),
        });
        assert_eq!(to_rpc_error(err).code(), code::INVALID_STATE);
    }

    #[test]
    fn test_rate_limited_carries_retry_after() {
        let err = to_rpc_error(AppError::RateLimited {
            retry_after_ms: 1500,
        });
        assert_eq!(err.code(), code::THROTTLED);

        let data: serde_json::Value =
            serde_json::from_str(err.data().unwrap().get()).unwrap();
        assert_eq!(data["retry_after_ms"], 1500);
    }

    #[test]
    fn test_server_side_errors_map_to_5xxx() {
        assert_eq!(
            to_rpc_error(AppError::Database("locked".into())).code(),
            code::DB_ERROR
        );
        assert_eq!(
            to_rpc_error(AppError::Internal("poisoned".into())).code(),
            code::INTERNAL_ERROR
        );
        assert_eq!(
            to_rpc_error(AppError::Provider(ProviderError::Transport("down".into()))).code(),
            code::SYSTEM_ERROR
        );
    }
}
