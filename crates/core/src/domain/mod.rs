pub mod issue;
pub mod search;
pub mod time_entry;
pub mod user;
