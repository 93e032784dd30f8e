use thiserror::Error;

/// Errors raised while replaying a service's script.
///
/// Every variant maps to a handler-level 500; `Multi` aggregates the
/// failures of however many `Concurrent` branches failed without discarding
/// any of them.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A `Request` command named a service with no entry in the local
    /// service-type lookup table (should be unreachable after validation,
    /// but the engine re-checks rather than trusting the caller).
    #[error("request targets undefined service \"{name}\"")]
    UndefinedService { name: String },

    /// A downstream call completed but returned a failing status.
    #[error("downstream service \"{service}\" returned status {status}")]
    Downstream { service: String, status: u16 },

    /// The downstream call itself failed (connection refused, timeout,
    /// malformed response, ...).
    #[error("network error calling downstream: {0}")]
    Network(#[from] reqwest::Error),

    /// A `Concurrent` child task panicked instead of returning normally.
    #[error("concurrent branch task panicked: {0}")]
    TaskPanicked(String),

    /// One or more `Concurrent` branches failed; every member is kept.
    #[error("{}", join_messages(.0))]
    Multi(Vec<EngineError>),
}

fn join_messages(errors: &[EngineError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

impl EngineError {
    /// Flattens a batch of fallible branch results into a single error, or
    /// `Ok(())` if every branch succeeded. Never drops a failure: a single
    /// failure is returned as-is, multiple failures become `Multi`.
    pub fn aggregate(results: Vec<Result<(), EngineError>>) -> Result<(), EngineError> {
        let mut errors: Vec<EngineError> = results.into_iter().filter_map(Result::err).collect();
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(EngineError::Multi(errors)),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_is_ok_when_every_branch_succeeds() {
        assert!(EngineError::aggregate(vec![Ok(()), Ok(())]).is_ok());
    }

    #[test]
    fn aggregate_returns_the_single_error_unwrapped() {
        let err = EngineError::aggregate(vec![
            Ok(()),
            Err(EngineError::UndefinedService { name: "ghost".into() }),
        ])
        .unwrap_err();
        assert!(matches!(err, EngineError::UndefinedService { .. }));
    }

    #[test]
    fn aggregate_wraps_multiple_errors_and_keeps_every_message() {
        let err = EngineError::aggregate(vec![
            Err(EngineError::Downstream { service: "a".into(), status: 500 }),
            Err(EngineError::UndefinedService { name: "b".into() }),
        ])
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains('a'));
        assert!(message.contains('b'));
        assert!(matches!(err, EngineError::Multi(ref v) if v.len() == 2));
    }
}
