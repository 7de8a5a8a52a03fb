use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Flat status of a staging record, as stored and filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagingStatus {
    Pending,
    Approved,
    Rejected,
    Pushed,
}

impl StagingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StagingStatus::Pending => "pending",
            StagingStatus::Approved => "approved",
            StagingStatus::Rejected => "rejected",
            StagingStatus::Pushed => "pushed",
        }
    }
}

impl fmt::Display for StagingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StagingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StagingStatus::Pending),
            "approved" => Ok(StagingStatus::Approved),
            "rejected" => Ok(StagingStatus::Rejected),
            "pushed" => Ok(StagingStatus::Pushed),
            other => Err(format!("unknown staging status: {}", other)),
        }
    }
}

/// Something a caller tried to do to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Recalculate,
    EditModifier,
    RefreshPrice,
    Approve,
    Reject,
    Push,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            Action::Recalculate => "recalculate",
            Action::EditModifier => "edit the margin of",
            Action::RefreshPrice => "refresh the live price of",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Push => "push",
        };
        f.write_str(action)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Cannot {action} a {from} record")]
pub struct TransitionError {
    pub from: StagingStatus,
    pub action: Action,
}

/// Approval lifecycle of a staged price.
///
/// Timestamps live inside the states that own them, so an approved record
/// always has an approval time and a rejected one never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Lifecycle {
    Pending,
    Approved {
        approved_at: DateTime<Utc>,
    },
    Rejected,
    Pushed {
        approved_at: DateTime<Utc>,
        pushed_at: DateTime<Utc>,
    },
}

impl Lifecycle {
    /// Rebuild a lifecycle from its stored columns.
    pub fn from_parts(
        status: StagingStatus,
        approved_at: Option<DateTime<Utc>>,
        pushed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, String> {
        match (status, approved_at, pushed_at) {
            (StagingStatus::Pending, _, _) => Ok(Lifecycle::Pending),
            (StagingStatus::Rejected, _, _) => Ok(Lifecycle::Rejected),
            (StagingStatus::Approved, Some(approved_at), _) => Ok(Lifecycle::Approved { approved_at }),
            (StagingStatus::Pushed, Some(approved_at), Some(pushed_at)) => {
                Ok(Lifecycle::Pushed { approved_at, pushed_at })
            }
            (status, _, _) => Err(format!("{} record is missing its timestamps", status)),
        }
    }

    pub fn status(&self) -> StagingStatus {
        match self {
            Lifecycle::Pending => StagingStatus::Pending,
            Lifecycle::Approved { .. } => StagingStatus::Approved,
            Lifecycle::Rejected => StagingStatus::Rejected,
            Lifecycle::Pushed { .. } => StagingStatus::Pushed,
        }
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Lifecycle::Approved { approved_at } | Lifecycle::Pushed { approved_at, .. } => Some(*approved_at),
            _ => None,
        }
    }

    pub fn pushed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Lifecycle::Pushed { pushed_at, .. } => Some(*pushed_at),
            _ => None,
        }
    }

    pub fn is_pushed(&self) -> bool {
        matches!(self, Lifecycle::Pushed { .. })
    }

    /// Any state -> Pending. Pushed records need `force`.
    pub fn recalculate(self, force: bool) -> Result<Self, TransitionError> {
        match self {
            Lifecycle::Pushed { .. } if !force => Err(self.refuse(Action::Recalculate)),
            _ => Ok(Lifecycle::Pending),
        }
    }

    /// Pending | Rejected -> Approved
    pub fn approve(self, at: DateTime<Utc>) -> Result<Self, TransitionError> {
        match self {
            Lifecycle::Pending | Lifecycle::Rejected => Ok(Lifecycle::Approved { approved_at: at }),
            _ => Err(self.refuse(Action::Approve)),
        }
    }

    /// Pending | Approved -> Rejected
    pub fn reject(self) -> Result<Self, TransitionError> {
        match self {
            Lifecycle::Pending | Lifecycle::Approved { .. } => Ok(Lifecycle::Rejected),
            _ => Err(self.refuse(Action::Reject)),
        }
    }

    /// Approved -> Pushed. Only call once the marketplace confirmed the update.
    pub fn push(self, at: DateTime<Utc>) -> Result<Self, TransitionError> {
        match self {
            Lifecycle::Approved { approved_at } => Ok(Lifecycle::Pushed {
                approved_at,
                pushed_at: at,
            }),
            _ => Err(self.refuse(Action::Push)),
        }
    }

    /// In-place edits keep the state but are refused once pushed.
    pub fn ensure_mutable(self, action: Action) -> Result<(), TransitionError> {
        if self.is_pushed() {
            return Err(self.refuse(action));
        }
        Ok(())
    }

    fn refuse(self, action: Action) -> TransitionError {
        TransitionError {
            from: self.status(),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let now = Utc::now();
        let approved = Lifecycle::Pending.approve(now).unwrap();
        assert_eq!(approved.approved_at(), Some(now));

        let pushed = approved.push(now).unwrap();
        assert_eq!(pushed.status(), StagingStatus::Pushed);
        assert_eq!(pushed.pushed_at(), Some(now));
        assert_eq!(pushed.approved_at(), Some(now));
    }

    #[test]
    fn test_reject_clears_approval() {
        let approved = Lifecycle::Pending.approve(Utc::now()).unwrap();
        let rejected = approved.reject().unwrap();

        assert_eq!(rejected, Lifecycle::Rejected);
        assert_eq!(rejected.approved_at(), None);

        // Rejected records can be approved again
        assert!(rejected.approve(Utc::now()).is_ok());
    }

    #[test]
    fn test_invalid_transitions() {
        let now = Utc::now();
        let pushed = Lifecycle::Approved { approved_at: now }.push(now).unwrap();

        assert_eq!(
            Lifecycle::Pending.push(now),
            Err(TransitionError { from: StagingStatus::Pending, action: Action::Push })
        );
        assert!(Lifecycle::Rejected.push(now).is_err());
        assert!(Lifecycle::Rejected.reject().is_err());
        assert!(Lifecycle::Approved { approved_at: now }.approve(now).is_err());
        assert!(pushed.approve(now).is_err());
        assert!(pushed.reject().is_err());
        assert!(pushed.push(now).is_err());
        assert!(pushed.ensure_mutable(Action::EditModifier).is_err());
    }

    #[test]
    fn test_recalculate_needs_force_when_pushed() {
        let now = Utc::now();
        let pushed = Lifecycle::Pushed { approved_at: now, pushed_at: now };

        assert!(pushed.recalculate(false).is_err());
        assert_eq!(pushed.recalculate(true), Ok(Lifecycle::Pending));
        assert_eq!(Lifecycle::Approved { approved_at: now }.recalculate(false), Ok(Lifecycle::Pending));
        assert_eq!(Lifecycle::Rejected.recalculate(false), Ok(Lifecycle::Pending));
    }

    #[test]
    fn test_from_parts() {
        let now = Utc::now();
        assert_eq!(
            Lifecycle::from_parts(StagingStatus::Approved, Some(now), None),
            Ok(Lifecycle::Approved { approved_at: now })
        );
        assert!(Lifecycle::from_parts(StagingStatus::Pushed, Some(now), None).is_err());
        assert_eq!("pushed".parse::<StagingStatus>(), Ok(StagingStatus::Pushed));
        assert!("live".parse::<StagingStatus>().is_err());
    }
}
