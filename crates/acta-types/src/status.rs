use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Lifecycle status of a tally sheet.
///
/// Stored as its integer code so that the encoding matches the other
/// writers of the ledger. The set is closed: decoding any other code fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActaStatus {
    /// Seeded, no scanned image yet.
    Created,
    /// Scanned image registered.
    Registered,
    /// Vote counts recorded.
    ResultsRecorded,
    /// Invalidated; terminal.
    Voided,
}

impl ActaStatus {
    pub const ALL: [ActaStatus; 4] = [
        ActaStatus::Created,
        ActaStatus::Registered,
        ActaStatus::ResultsRecorded,
        ActaStatus::Voided,
    ];

    /// Integer code used on the wire.
    pub const fn code(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Registered => 1,
            Self::ResultsRecorded => 2,
            Self::Voided => 3,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, TypeError> {
        match code {
            0 => Ok(Self::Created),
            1 => Ok(Self::Registered),
            2 => Ok(Self::ResultsRecorded),
            3 => Ok(Self::Voided),
            other => Err(TypeError::UnknownStatus(other)),
        }
    }

    /// Only `ResultsRecorded` may carry non-zero vote fields.
    pub const fn carries_results(self) -> bool {
        matches!(self, Self::ResultsRecorded)
    }

    /// Resolve the status reached by applying `op` to an existing acta.
    ///
    /// `Create` never applies to an existing acta; it is checked against
    /// key absence by the ledger instead.
    pub fn next(self, op: Operation) -> Result<ActaStatus, TransitionError> {
        use ActaStatus::*;

        let reject = |reason: &'static str| TransitionError {
            current: self,
            attempted: op,
            reason,
        };

        match (self, op) {
            (_, Operation::Create) => Err(reject("already created")),

            (Created, Operation::RegisterImage) => Ok(Registered),
            (Registered | ResultsRecorded, Operation::RegisterImage) => {
                Err(reject("already registered"))
            }
            (Voided, Operation::RegisterImage) => Err(reject("already voided")),

            (Registered, Operation::RegisterResults) => Ok(ResultsRecorded),
            (Created, Operation::RegisterResults) => Err(reject("not yet registered")),
            (ResultsRecorded, Operation::RegisterResults) => {
                Err(reject("results already recorded"))
            }
            (Voided, Operation::RegisterResults) => Err(reject("already voided")),

            (Registered | ResultsRecorded, Operation::Void) => Ok(Voided),
            (Created, Operation::Void) => Err(reject("not yet registered")),
            (Voided, Operation::Void) => Err(reject("already voided")),
        }
    }
}

impl fmt::Display for ActaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Registered => "registered",
            Self::ResultsRecorded => "results-recorded",
            Self::Voided => "voided",
        };
        f.write_str(name)
    }
}

impl Serialize for ActaStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for ActaStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        Self::from_code(code).map_err(serde::de::Error::custom)
    }
}

/// Mutating operations of the tally-sheet lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    RegisterImage,
    RegisterResults,
    Void,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::RegisterImage => "register-image",
            Self::RegisterResults => "register-results",
            Self::Void => "void",
        };
        f.write_str(name)
    }
}

/// A rejected lifecycle transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionError {
    pub current: ActaStatus,
    pub attempted: Operation,
    pub reason: &'static str,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot {} an acta in status {}: {}",
            self.attempted, self.current, self.reason
        )
    }
}

impl std::error::Error for TransitionError {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn happy_path() {
        let s = ActaStatus::Created;
        let s = s.next(Operation::RegisterImage).unwrap();
        assert_eq!(s, ActaStatus::Registered);
        let s = s.next(Operation::RegisterResults).unwrap();
        assert_eq!(s, ActaStatus::ResultsRecorded);
        let s = s.next(Operation::Void).unwrap();
        assert_eq!(s, ActaStatus::Voided);
    }

    #[test]
    fn register_image_twice_is_rejected() {
        let err = ActaStatus::Registered
            .next(Operation::RegisterImage)
            .unwrap_err();
        assert_eq!(err.reason, "already registered");
        assert_eq!(err.current, ActaStatus::Registered);
        assert_eq!(err.attempted, Operation::RegisterImage);
    }

    #[test]
    fn void_requires_registration() {
        let err = ActaStatus::Created.next(Operation::Void).unwrap_err();
        assert_eq!(err.reason, "not yet registered");
        let err = ActaStatus::Voided.next(Operation::Void).unwrap_err();
        assert_eq!(err.reason, "already voided");
    }

    #[test]
    fn results_only_from_registered() {
        for status in ActaStatus::ALL {
            let outcome = status.next(Operation::RegisterResults);
            assert_eq!(outcome.is_ok(), status == ActaStatus::Registered, "{status}");
        }
    }

    #[test]
    fn codes_roundtrip() {
        for status in ActaStatus::ALL {
            assert_eq!(ActaStatus::from_code(status.code()).unwrap(), status);
        }
        assert_eq!(ActaStatus::from_code(4), Err(TypeError::UnknownStatus(4)));
    }

    #[test]
    fn serializes_as_integer() {
        assert_eq!(serde_json::to_string(&ActaStatus::Voided).unwrap(), "3");
        let parsed: ActaStatus = serde_json::from_str("2").unwrap();
        assert_eq!(parsed, ActaStatus::ResultsRecorded);
        assert!(serde_json::from_str::<ActaStatus>("9").is_err());
    }

    #[test]
    fn transition_error_message() {
        let err = ActaStatus::Voided
            .next(Operation::RegisterResults)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot register-results an acta in status voided: already voided"
        );
    }

    fn operation() -> impl Strategy<Value = Operation> {
        prop_oneof![
            Just(Operation::Create),
            Just(Operation::RegisterImage),
            Just(Operation::RegisterResults),
            Just(Operation::Void),
        ]
    }

    proptest! {
        #[test]
        fn lifecycle_never_returns_to_created(ops in proptest::collection::vec(operation(), 0..32)) {
            let mut status = ActaStatus::Created;
            let mut left_created = false;
            for op in ops {
                if let Ok(next) = status.next(op) {
                    status = next;
                    left_created = true;
                }
                if left_created {
                    prop_assert_ne!(status, ActaStatus::Created);
                }
            }
        }

        #[test]
        fn voided_is_terminal(ops in proptest::collection::vec(operation(), 0..16)) {
            for op in ops {
                prop_assert!(ActaStatus::Voided.next(op).is_err());
            }
        }
    }
}
