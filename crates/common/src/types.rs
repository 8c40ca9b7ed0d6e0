use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header carrying the caller's identity on inbound and outbound requests.
pub const USER_NAME_HEADER: &str = "X-User-Name";

macro_rules! uid_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parses an identifier from its hyphenated string form.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Uuid::parse_str(s).map(Self)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uid_type!(
    /// Identifier of a reservation owned by the reservation service.
    ReservationUid
);

uid_type!(
    /// Identifier of a book in the catalog.
    BookUid
);

uid_type!(
    /// Identifier of a library in the catalog.
    LibraryUid
);

/// Name of the calling user, taken from the identity header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserName(String);

impl UserName {
    /// Creates a user name from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the user name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for UserName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_new_creates_unique_ids() {
        let id1 = BookUid::new();
        let id2 = BookUid::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn uid_parse_accepts_hyphenated_form() {
        let uuid = Uuid::new_v4();
        let id = ReservationUid::parse(&uuid.to_string()).unwrap();
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn uid_parse_rejects_garbage() {
        assert!(LibraryUid::parse("not-a-uuid").is_err());
    }

    #[test]
    fn uid_serializes_as_plain_string() {
        let uuid = Uuid::new_v4();
        let json = serde_json::to_string(&BookUid::from_uuid(uuid)).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }

    #[test]
    fn user_name_display_is_raw() {
        let user = UserName::from("Test Max");
        assert_eq!(user.to_string(), "Test Max");
        assert_eq!(serde_json::to_string(&user).unwrap(), "\"Test Max\"");
    }
}
