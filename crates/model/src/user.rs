//! Identities owned by the account system. Only their ids are of interest here.

use serde::{Deserialize, Serialize};
use utility::id::HasId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rider;

impl HasId for Rider {
    type IdType = i64;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver;

impl HasId for Driver {
    type IdType = i64;
}
