use std::fmt;

use crate::models::card::CardStatus;

/// The administrative operations that can move a card between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOp {
    ReportLost,
    Deactivate,
    Recover,
    Expire,
    Reissue,
}

impl LifecycleOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleOp::ReportLost => "report_lost",
            LifecycleOp::Deactivate => "deactivate",
            LifecycleOp::Recover => "recover",
            LifecycleOp::Expire => "expire",
            LifecycleOp::Reissue => "reissue",
        }
    }
}

impl fmt::Display for LifecycleOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot {op} a card that is {from}")]
pub struct TransitionError {
    pub from: CardStatus,
    pub op: LifecycleOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    To(CardStatus),
    /// The operation is already satisfied; succeed without touching the
    /// record (reporting an already-lost card lost).
    Unchanged,
}

/// The card status state machine.
///
/// ```text
/// active -> lost          (report_lost)
/// active -> deactivated   (deactivate)
/// lost -> deactivated     (deactivate)
/// lost -> active          (recover)
/// deactivated -> active   (recover)
/// * -> expired            (expire)   [except expired; terminal]
/// * -> active             (reissue)  [any state, token rotates]
/// ```
///
/// Anything else is an illegal transition and leaves the card untouched.
pub fn apply(from: CardStatus, op: LifecycleOp) -> Result<Transition, TransitionError> {
    let next = match (from, op) {
        (CardStatus::Lost, LifecycleOp::ReportLost) => return Ok(Transition::Unchanged),
        (CardStatus::Active, LifecycleOp::ReportLost) => CardStatus::Lost,
        (CardStatus::Active | CardStatus::Lost, LifecycleOp::Deactivate) => CardStatus::Deactivated,
        (CardStatus::Lost | CardStatus::Deactivated, LifecycleOp::Recover) => CardStatus::Active,
        (CardStatus::Expired, LifecycleOp::Expire) => return Err(TransitionError { from, op }),
        (_, LifecycleOp::Expire) => CardStatus::Expired,
        (_, LifecycleOp::Reissue) => CardStatus::Active,
        _ => return Err(TransitionError { from, op }),
    };
    Ok(Transition::To(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::{CardStatus::*, LifecycleOp::*};

    #[test]
    fn test_legal_edges() {
        assert_eq!(apply(Active, ReportLost), Ok(Transition::To(Lost)));
        assert_eq!(apply(Active, Deactivate), Ok(Transition::To(Deactivated)));
        assert_eq!(apply(Lost, Deactivate), Ok(Transition::To(Deactivated)));
        assert_eq!(apply(Lost, Recover), Ok(Transition::To(Active)));
        assert_eq!(apply(Deactivated, Recover), Ok(Transition::To(Active)));
    }

    #[test]
    fn test_report_lost_is_idempotent_from_lost() {
        assert_eq!(apply(Lost, ReportLost), Ok(Transition::Unchanged));
    }

    #[test]
    fn test_report_lost_guarded_elsewhere() {
        assert_eq!(
            apply(Deactivated, ReportLost),
            Err(TransitionError {
                from: Deactivated,
                op: ReportLost
            })
        );
        assert_eq!(
            apply(Expired, ReportLost),
            Err(TransitionError {
                from: Expired,
                op: ReportLost
            })
        );
    }

    #[test]
    fn test_expire_from_any_non_expired_state() {
        for from in [Active, Lost, Deactivated] {
            assert_eq!(apply(from, Expire), Ok(Transition::To(Expired)));
        }
    }

    #[test]
    fn test_expired_is_terminal() {
        for op in [ReportLost, Deactivate, Recover, Expire] {
            assert_eq!(apply(Expired, op), Err(TransitionError { from: Expired, op }));
        }
    }

    #[test]
    fn test_reissue_allowed_from_every_state() {
        for from in [Active, Lost, Deactivated, Expired] {
            assert_eq!(apply(from, Reissue), Ok(Transition::To(Active)));
        }
    }

    #[test]
    fn test_illegal_edges_rejected() {
        assert!(apply(Active, Recover).is_err());
        assert!(apply(Deactivated, Deactivate).is_err());
        assert!(apply(Expired, Recover).is_err());
        assert!(apply(Expired, Deactivate).is_err());
    }
}
