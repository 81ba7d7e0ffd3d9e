//! User name resolution
//!
//! The tracker's user search matches on login, names and email, so a query like
//! `smith` usually returns several people. This module narrows such a result down
//! to one user when the query is an exact login or first name.

use crate::domain::user::User;

/// Outcome of narrowing a user search result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// Exactly one user matched the login or first name.
    Unique(&'a User),
    /// Nothing narrowed the list; the original candidates, in tracker order.
    Ambiguous(&'a [User]),
}

impl<'a> Resolution<'a> {
    /// The user a command should act on. Ambiguous results fall back to the first
    /// candidate.
    pub fn best(&self) -> Option<&'a User> {
        match *self {
            Self::Unique(user) => Some(user),
            Self::Ambiguous(users) => users.first(),
        }
    }
}

/// Resolves `name` against `users`: login first, then first name, both
/// case-insensitive and exact. A field only wins when it matches exactly one user.
pub fn resolve_users<'a>(name: &str, users: &'a [User]) -> Resolution<'a> {
    let name = name.trim().to_lowercase();

    if let Some(user) = single_match(users, |user| user.login.to_lowercase() == name) {
        return Resolution::Unique(user);
    }
    if let Some(user) = single_match(users, |user| user.firstname.to_lowercase() == name) {
        return Resolution::Unique(user);
    }

    Resolution::Ambiguous(users)
}

fn single_match<'a, F>(users: &'a [User], predicate: F) -> Option<&'a User>
where
    F: Fn(&User) -> bool,
{
    let mut matches = users.iter().filter(|user| predicate(user));
    let first = matches.next()?;
    matches.next().is_none().then_some(first)
}

#[cfg(test)]
mod tests {
    use super::{resolve_users, Resolution};
    use crate::domain::user::User;

    fn user(id: u64, login: &str, firstname: &str, lastname: &str) -> User {
        User {
            id,
            login: login.to_owned(),
            firstname: firstname.to_owned(),
            lastname: lastname.to_owned(),
        }
    }

    fn smiths() -> Vec<User> {
        vec![user(1, "asmith", "Alice", "Smith"), user(2, "bsmith", "Bob", "Smith")]
    }

    #[test]
    fn first_name_match_resolves_single_user() {
        let users = smiths();
        assert_eq!(resolve_users("alice", &users), Resolution::Unique(&users[0]));
    }

    #[test]
    fn login_match_resolves_single_user() {
        let users = smiths();
        assert_eq!(resolve_users("ASmith", &users), Resolution::Unique(&users[0]));
    }

    #[test]
    fn partial_name_returns_original_list() {
        let users = smiths();
        let resolution = resolve_users("smith", &users);

        assert_eq!(resolution, Resolution::Ambiguous(&users[..]));
        assert_eq!(resolution.best().map(|user| user.id), Some(1));
    }

    #[test]
    fn login_wins_over_first_name_of_another_user() {
        let users = vec![user(1, "bob", "Robert", "Marley"), user(2, "bjones", "Bob", "Jones")];
        assert_eq!(resolve_users("bob", &users).best().map(|user| user.id), Some(1));
    }

    #[test]
    fn duplicate_first_names_stay_ambiguous() {
        let users = vec![user(1, "alee", "Alice", "Lee"), user(2, "asmith", "Alice", "Smith")];
        assert!(matches!(resolve_users("alice", &users), Resolution::Ambiguous(_)));
    }

    #[test]
    fn empty_candidates_have_no_best_user() {
        let users: Vec<User> = Vec::new();
        assert_eq!(resolve_users("anyone", &users).best(), None);
    }
}
