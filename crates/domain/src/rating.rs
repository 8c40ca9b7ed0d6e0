//! User rating and the reservation quota it implies.

use common::UserName;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

/// A user's rating. The star count doubles as the maximum number of books
/// the user may hold at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<UserName>,
    pub stars: u32,
}

impl Rating {
    /// Creates a rating with the given star count.
    pub fn new(stars: u32) -> Self {
        Self {
            user_name: None,
            stars,
        }
    }
}

/// Checks that a user holding `active` rented books may take one more.
///
/// The rule is `active + 1 <= stars`.
pub fn check_quota(active: usize, stars: u32) -> Result<()> {
    if active + 1 > stars as usize {
        return Err(DomainError::QuotaExceeded { active, stars });
    }
    Ok(())
}
