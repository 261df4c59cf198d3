use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::claims::Identity,
    error::{AppError, AppResult},
};

/// A resource whose mutation is restricted to one user.
pub trait Owned {
    /// Noun used in client messages, e.g. "property".
    const KIND: &'static str;

    fn id(&self) -> Uuid;
    fn owner_id(&self) -> Uuid;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Update,
    Delete,
}

impl Mutation {
    fn verb(self) -> &'static str {
        match self {
            Mutation::Update => "update",
            Mutation::Delete => "delete",
        }
    }
}

fn capitalized(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn not_found<R: Owned>() -> AppError {
    AppError::NotFound(format!("{} not found", capitalized(R::KIND)))
}

/// Path ids that are not UUIDs cannot name any stored resource.
pub fn parse_id<R: Owned>(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| not_found::<R>())
}

/// Passes the loaded resource through if `identity` owns it.
///
/// Owner ids and identities are both canonical UUIDs (claims are normalized
/// when the token is verified), so a plain equality check is enough.
pub fn authorize<R: Owned>(
    resource: Option<R>,
    identity: &Identity,
    mutation: Mutation,
) -> AppResult<R> {
    let resource = resource.ok_or_else(not_found::<R>)?;
    if resource.owner_id() != identity.user_id {
        warn!(
            user_id = %identity.user_id,
            resource_id = %resource.id(),
            kind = R::KIND,
            action = mutation.verb(),
            "ownership check failed"
        );
        return Err(AppError::Forbidden(format!(
            "Not authorized to {} this {}",
            mutation.verb(),
            R::KIND
        )));
    }
    Ok(resource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::Role;

    #[derive(Debug)]
    struct Note {
        id: Uuid,
        owner: Uuid,
    }

    impl Owned for Note {
        const KIND: &'static str = "note";
        fn id(&self) -> Uuid {
            self.id
        }
        fn owner_id(&self) -> Uuid {
            self.owner
        }
    }

    fn identity(id: Uuid) -> Identity {
        Identity {
            user_id: id,
            email: "o@example.com".into(),
            role: Role::Admin,
        }
    }

    #[test]
    fn owner_passes() {
        let owner = Uuid::new_v4();
        let note = Note { id: Uuid::new_v4(), owner };
        assert!(authorize(Some(note), &identity(owner), Mutation::Update).is_ok());
    }

    #[test]
    fn stranger_is_forbidden_even_as_admin() {
        let note = Note { id: Uuid::new_v4(), owner: Uuid::new_v4() };
        let err = authorize(Some(note), &identity(Uuid::new_v4()), Mutation::Delete).unwrap_err();
        let AppError::Forbidden(msg) = err else {
            panic!("expected forbidden");
        };
        assert_eq!(msg, "Not authorized to delete this note");
    }

    #[test]
    fn missing_is_not_found() {
        let err = authorize::<Note>(None, &identity(Uuid::new_v4()), Mutation::Update).unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Note not found"));
    }

    #[test]
    fn malformed_ids_are_not_found() {
        assert!(matches!(parse_id::<Note>("abc"), Err(AppError::NotFound(_))));
        let id = Uuid::new_v4();
        assert_eq!(parse_id::<Note>(&id.to_string()).unwrap(), id);
    }
}
