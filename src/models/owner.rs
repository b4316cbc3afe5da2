use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Column representation of the owner variant on `test_sessions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "owner_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OwnerType {
    Participant,
    PublicUser,
}

impl OwnerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::PublicUser => "public_user",
        }
    }
}

/// Who is taking the test: a company-managed participant or a self-service
/// public user. Closed union; ban propagation and assignment linkage dispatch
/// on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum SessionOwner {
    Participant(Uuid),
    PublicUser(Uuid),
}

impl SessionOwner {
    pub fn from_parts(owner_type: OwnerType, owner_id: Uuid) -> Self {
        match owner_type {
            OwnerType::Participant => Self::Participant(owner_id),
            OwnerType::PublicUser => Self::PublicUser(owner_id),
        }
    }

    pub fn into_parts(self) -> (OwnerType, Uuid) {
        match self {
            Self::Participant(id) => (OwnerType::Participant, id),
            Self::PublicUser(id) => (OwnerType::PublicUser, id),
        }
    }

    /// The participant behind this owner, if any. Only participants carry a
    /// permanent cross-session ban flag.
    pub fn participant_id(&self) -> Option<Uuid> {
        match self {
            Self::Participant(id) => Some(*id),
            Self::PublicUser(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_round_trip() {
        let id = Uuid::new_v4();
        let owner = SessionOwner::Participant(id);
        let (kind, raw) = owner.into_parts();
        assert_eq!(SessionOwner::from_parts(kind, raw), owner);
    }

    #[test]
    fn only_participants_expose_a_participant_id() {
        let id = Uuid::new_v4();
        assert_eq!(SessionOwner::Participant(id).participant_id(), Some(id));
        assert_eq!(SessionOwner::PublicUser(id).participant_id(), None);
    }
}
