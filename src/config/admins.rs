//! Admin configuration module for loading group administrators from environment variables.
//!
//! Only the users listed in `ADMIN_USER_IDS` (comma-separated Discord user IDs) may run
//! the commands that change settings. Entries that are not valid IDs are skipped with a
//! warning rather than failing startup.

use std::collections::HashSet;
use tracing::warn;

/// Set of Discord user IDs allowed to run admin commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminList {
    ids: HashSet<u64>,
}

impl AdminList {
    /// Parses a comma-separated list of user IDs.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let ids = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| match s.parse::<u64>() {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!("Ignoring invalid admin user id {:?}: {}", s, e);
                    None
                }
            })
            .collect();
        Self { ids }
    }

    /// Reads `ADMIN_USER_IDS` from the environment. Unset means no admins.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var("ADMIN_USER_IDS")
            .map(|raw| Self::parse(&raw))
            .unwrap_or_default()
    }

    /// Whether the given user is an administrator.
    #[must_use]
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.ids.contains(&user_id)
    }

    /// Number of configured administrators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when nobody can run admin commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_ids() {
        let admins = AdminList::parse(" 123, 456 ,,not-a-number,789");
        assert_eq!(admins.len(), 3);
        assert!(admins.is_admin(123));
        assert!(admins.is_admin(456));
        assert!(admins.is_admin(789));
        assert!(!admins.is_admin(999));
    }

    #[test]
    fn test_empty_list_has_no_admins() {
        let admins = AdminList::parse("");
        assert!(admins.is_empty());
        assert!(!admins.is_admin(0));
    }
}
