//! Unified error type for playerbridge.

use playerbridge_bus::BusError;
use playerbridge_protocol::ProtocolError;
use playerbridge_store::StoreError;
use playerbridge_task::TaskError;

use crate::config::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `playerbridge` facade, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// An argument was rejected before any state changed or any I/O ran.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The offline store failed (database, codec).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Publishing a command failed (saturated or closed transport).
    #[error(transparent)]
    Bus(#[from] BusError),

    /// Scheduled work never produced a result.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// Loading or validating configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The operation exists in the API but is not supported.
    #[error("{0} is not implemented")]
    Unimplemented(&'static str),
}

/// Schema violations found by record validation are caller mistakes.
impl From<ProtocolError> for DirectoryError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidMessage(msg) => Self::InvalidArgument(msg),
            other => Self::Store(StoreError::Codec(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_store_error() {
        let err = StoreError::Unavailable("players".into());
        let directory_err: DirectoryError = err.into();
        assert!(matches!(directory_err, DirectoryError::Store(_)));
        assert!(directory_err.to_string().contains("players"));
    }

    #[test]
    fn test_from_bus_error() {
        let err = BusError::Saturated("bridge_player_api_channel".into());
        let directory_err: DirectoryError = err.into();
        assert!(matches!(directory_err, DirectoryError::Bus(_)));
    }

    #[test]
    fn test_from_task_error() {
        let directory_err: DirectoryError = TaskError::Aborted.into();
        assert!(matches!(
            directory_err,
            DirectoryError::Task(TaskError::Aborted)
        ));
    }

    #[test]
    fn test_from_invalid_message_is_invalid_argument() {
        let err = ProtocolError::InvalidMessage("nil unique id".into());
        let directory_err: DirectoryError = err.into();
        assert!(matches!(
            directory_err,
            DirectoryError::InvalidArgument(msg) if msg == "nil unique id"
        ));
    }

    #[test]
    fn test_unimplemented_display_names_operation() {
        let err = DirectoryError::Unimplemented("request_registered_players_async");
        assert_eq!(
            err.to_string(),
            "request_registered_players_async is not implemented"
        );
    }
}
