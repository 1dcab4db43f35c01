use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

/// Who is making the request, resolved once at the boundary.
///
/// Authentication itself lives outside this service; the fronting proxy
/// is expected to authenticate the session and stamp the `x-caller`
/// header (`admin`, `security`, or `student:<card-id>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Admin,
    Security,
    Student { card_id: Uuid },
}

impl Caller {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "admin" => Some(Caller::Admin),
            "security" => Some(Caller::Security),
            _ => raw
                .strip_prefix("student:")
                .and_then(|id| Uuid::parse_str(id).ok())
                .map(|card_id| Caller::Student { card_id }),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Caller::Admin)
    }

    /// Admin and security staff may verify scans and read all audit logs.
    pub fn is_staff(&self) -> bool {
        matches!(self, Caller::Admin | Caller::Security)
    }

    /// Lifecycle requests a holder may make against their own card.
    pub fn can_manage(&self, card_id: Uuid) -> bool {
        match self {
            Caller::Admin => true,
            Caller::Security => false,
            Caller::Student { card_id: own } => *own == card_id,
        }
    }

    /// Read access to one card and its audit trail.
    pub fn can_view(&self, card_id: Uuid) -> bool {
        self.is_staff() || self.can_manage(card_id)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("x-caller")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        Caller::parse(raw)
            .ok_or_else(|| AppError::Validation(format!("unrecognized caller role: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roles() {
        assert_eq!(Caller::parse("admin"), Some(Caller::Admin));
        assert_eq!(Caller::parse("security"), Some(Caller::Security));

        let id = Uuid::new_v4();
        assert_eq!(
            Caller::parse(&format!("student:{id}")),
            Some(Caller::Student { card_id: id })
        );

        assert_eq!(Caller::parse("student:not-a-uuid"), None);
        assert_eq!(Caller::parse("root"), None);
    }

    #[test]
    fn test_permissions() {
        let id = Uuid::new_v4();
        let other = Uuid::new_v4();
        let student = Caller::Student { card_id: id };

        assert!(Caller::Admin.can_manage(id));
        assert!(!Caller::Security.can_manage(id));
        assert!(student.can_manage(id));
        assert!(!student.can_manage(other));

        assert!(Caller::Security.can_view(id));
        assert!(student.can_view(id));
        assert!(!student.can_view(other));
        assert!(!student.is_staff());
    }
}
