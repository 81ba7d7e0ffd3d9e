use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub login: String,
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserList {
    #[serde(default)]
    pub users: Vec<User>,
    pub total_count: u64,
}

impl UserList {
    pub fn is_empty(&self) -> bool {
        self.total_count == 0 || self.users.is_empty()
    }
}
