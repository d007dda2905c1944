use serde::Serialize;
use std::fmt;

use crate::database::Role;

/// Outcome of a best-effort read.
///
/// `Degraded` means the subsystem failed; callers that only need data use
/// [`Retrieval::into_value`], which turns it into an empty value.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval<T> {
    Fresh(T),
    Degraded { cause: String },
}

impl<T> Retrieval<T> {
    pub fn degraded(cause: impl fmt::Display) -> Self {
        Self::Degraded {
            cause: cause.to_string(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn cause(&self) -> Option<&str> {
        match self {
            Self::Fresh(_) => None,
            Self::Degraded { cause } => Some(cause),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Retrieval<U> {
        match self {
            Self::Fresh(value) => Retrieval::Fresh(f(value)),
            Self::Degraded { cause } => Retrieval::Degraded { cause },
        }
    }
}

impl<T: Default> Retrieval<T> {
    pub fn into_value(self) -> T {
        match self {
            Self::Fresh(value) => value,
            Self::Degraded { .. } => T::default(),
        }
    }
}

/// Transcript line as shown to API callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub message: String,
}

/// What happened to a `record_turn` write. Never an error for the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Stored { id: String },
    AlreadyPresent { id: String },
    Failed { cause: String },
}

impl RecordOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_defaults_to_empty() {
        let r: Retrieval<Vec<String>> = Retrieval::degraded("store offline");
        assert!(r.is_degraded());
        assert_eq!(r.cause(), Some("store offline"));
        assert!(r.into_value().is_empty());
    }

    #[test]
    fn test_map_keeps_cause() {
        let r: Retrieval<Vec<u8>> = Retrieval::degraded("boom");
        let mapped = r.map(|v| v.len());
        assert_eq!(mapped, Retrieval::Degraded { cause: "boom".into() });

        let fresh = Retrieval::Fresh(vec![1, 2]).map(|v| v.len());
        assert_eq!(fresh.into_value(), 2);
    }
}
