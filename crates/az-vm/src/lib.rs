//! Classic Azure VM provisioning: configuration builders, deployment
//! assembly, and orchestration of the asynchronous management operations
//! that realize them.

pub mod assemble;
pub mod azure;
pub mod cert;
pub mod collaborators;
pub mod config;
pub mod orchestrator;
pub mod types;

use std::path::PathBuf;

use asm_api::{Operation, OperationStatus, RequestId};

pub use orchestrator::Orchestrator;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("management api error: {0}")]
    Transport(#[from] asm_api::Error),

    #[error("operation {request_id} failed: {code}: {message}")]
    OperationFailed {
        request_id: RequestId,
        code: String,
        message: String,
    },

    #[error("unknown {kind}: {name}")]
    Resolution { kind: &'static str, name: String },

    #[error("the VM provisioning config must be set before attaching extensions")]
    ProvisioningConfigMissing,

    #[error(
        "docker certificates not found in {}; generate them first (https://docs.docker.com/articles/https/)",
        .0.display()
    )]
    DockerCertsMissing(PathBuf),

    #[error("certificate {path} is invalid, expected a .pem certificate")]
    InvalidCertificateExtension { path: String },

    #[error("malformed certificate: {0}")]
    MalformedCertificate(String),

    #[error("invalid OS kind {0:?}, valid values are 'Linux' and 'Windows'")]
    InvalidOsKind(String),

    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    #[error("invalid endpoint port: {0}")]
    InvalidPort(u16),

    #[error("endpoint port {0} is already in use")]
    DuplicatePort(u16),

    #[error("storage service {0} has no blob endpoint")]
    MissingBlobEndpoint(String),

    #[error("home directory could not be determined")]
    HomeDirUnavailable,

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Turn a terminal operation into `Ok` or [`Error::OperationFailed`].
pub(crate) fn check_operation(request_id: &RequestId, operation: Operation) -> Result<()> {
    if operation.status() == OperationStatus::Succeeded {
        return Ok(());
    }

    let (code, message) = match operation.error {
        Some(e) => (e.code, e.message),
        None => (operation.status.clone(), String::new()),
    };
    Err(Error::OperationFailed {
        request_id: request_id.clone(),
        code,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use asm_api::OperationError;

    fn operation(status: &str, error: Option<OperationError>) -> Operation {
        Operation {
            id: "req-1".into(),
            status: status.into(),
            http_status_code: None,
            error,
        }
    }

    #[test]
    fn test_succeeded_operation_is_ok() {
        let id = RequestId("req-1".into());
        assert!(check_operation(&id, operation("Succeeded", None)).is_ok());
    }

    #[test]
    fn test_unrecognised_status_fails_with_status_as_code() {
        let id = RequestId("req-1".into());
        match check_operation(&id, operation("Whatever", None)) {
            Err(Error::OperationFailed {
                request_id,
                code,
                message,
            }) => {
                assert_eq!(request_id, id);
                assert_eq!(code, "Whatever");
                assert_eq!(message, "");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_failed_operation_uses_reported_error() {
        let id = RequestId("req-1".into());
        let err = check_operation(
            &id,
            operation(
                "Failed",
                Some(OperationError {
                    code: "ConflictError".into(),
                    message: "in use".into(),
                }),
            ),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::OperationFailed { code, message, .. } if code == "ConflictError" && message == "in use"
        ));
    }
}
