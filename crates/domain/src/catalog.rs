//! Catalog entities returned by the library service.

use common::{BookUid, LibraryUid};
use serde::{Deserialize, Serialize};

/// A book as described by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub book_uid: BookUid,
    pub name: String,
    pub author: String,
    pub genre: String,
}

/// A library branch as described by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Library {
    pub library_uid: LibraryUid,
    pub name: String,
    pub address: String,
    pub city: String,
}
