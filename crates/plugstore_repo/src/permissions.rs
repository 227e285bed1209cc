//! Access permissions for user management.
//!
//! Every permission kind is a well-known key in the `user_permission`
//! partition. A kind lists the users and the groups it is granted to.

use crate::error::RepoResult;
use crate::users::{User, ADMIN};
use plugstore_db::{impl_entity, Database, Listing, Pk, Repository, Transaction};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Partition holding [`Permission`] records.
pub const PERMISSION_PARTITION: &str = "user_permission";

/// May list users.
pub const LIST_USERS: Pk = Pk::from_tag("LIST_USERS");
/// May create users.
pub const CREATE_USER: Pk = Pk::from_tag("CREATE_USER");
/// May delete users.
pub const DELETE_USER: Pk = Pk::from_tag("DELETE_USER");
/// May update users.
pub const UPDATE_USER: Pk = Pk::from_tag("UPDATE_USER");
/// May read a single user.
pub const GET_USER: Pk = Pk::from_tag("GET_USER");

/// All permission kinds.
pub const KINDS: [Pk; 5] = [LIST_USERS, CREATE_USER, DELETE_USER, UPDATE_USER, GET_USER];

/// Grants of one permission kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Permission {
    /// The permission kind, one of [`KINDS`].
    pub id: Pk,
    /// Groups holding the permission.
    pub allowed_groups: Vec<Pk>,
    /// Users holding the permission.
    pub allowed_users: Vec<Pk>,
}

impl_entity!(Permission);

impl Permission {
    /// Checks a user key and a group key separately.
    ///
    /// Users and groups live in different key spaces, so never pass the
    /// same key as both.
    #[must_use]
    pub fn allows(&self, user: Option<Pk>, group: Option<Pk>) -> bool {
        user.is_some_and(|u| self.allowed_users.contains(&u))
            || group.is_some_and(|g| self.allowed_groups.contains(&g))
    }

    /// Checks `user` directly and through its group memberships.
    #[must_use]
    pub fn allows_user(&self, user: &User) -> bool {
        self.allows(Some(user.id), None)
            || user.groups.iter().any(|g| self.allows(None, Some(*g)))
    }
}

/// Repository of [`Permission`] records.
#[derive(Debug, Clone)]
pub struct Permissions {
    repo: Repository<Permission>,
}

impl Permissions {
    /// Opens the repository, creating every missing kind with the
    /// administrator as its only grantee.
    pub fn open(db: Database) -> RepoResult<Self> {
        let repo = Repository::new(db, PERMISSION_PARTITION);
        repo.with_tx(true, |tx| {
            for kind in KINDS {
                if tx.has(kind) {
                    continue;
                }
                let perm = Permission {
                    id: kind,
                    allowed_users: vec![ADMIN],
                    ..Permission::default()
                };
                repo.update_tx(tx, &perm)?;
                debug!(kind = %kind, "created permission");
            }
            Ok(())
        })?;
        Ok(Self { repo })
    }

    /// Loads the grants of `kind`.
    pub fn get(&self, kind: Pk) -> RepoResult<Permission> {
        Ok(self.repo.get(kind)?)
    }

    /// Stores changed grants.
    pub fn update(&self, perm: &Permission) -> RepoResult<()> {
        Ok(self.repo.update(perm)?)
    }

    /// Lists every permission kind.
    pub fn list(&self) -> RepoResult<Listing<Permission>> {
        Ok(self.repo.list("")?)
    }

    /// Checks if `user` holds `kind`.
    pub fn is_allowed(&self, kind: Pk, user: &User) -> RepoResult<bool> {
        Ok(self.get(kind)?.allows_user(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn every_kind_exists_with_admin() {
        let temp = tempdir().unwrap();
        let perms = Permissions::open(Database::open(temp.path()).unwrap()).unwrap();
        for kind in KINDS {
            let perm = perms.get(kind).unwrap();
            assert_eq!(perm.allowed_users, vec![ADMIN]);
        }
        assert_eq!(perms.list().unwrap().items.len(), KINDS.len());
    }

    #[test]
    fn open_keeps_existing_grants() {
        let temp = tempdir().unwrap();
        let db = Database::open(temp.path()).unwrap();
        let perms = Permissions::open(db.clone()).unwrap();
        let staff = Pk::from_tag("staff");

        let mut perm = perms.get(LIST_USERS).unwrap();
        perm.allowed_groups.push(staff);
        perms.update(&perm).unwrap();

        let perms = Permissions::open(db).unwrap();
        assert_eq!(perms.get(LIST_USERS).unwrap().allowed_groups, vec![staff]);
    }

    #[test]
    fn user_or_group_grants_access() {
        let temp = tempdir().unwrap();
        let perms = Permissions::open(Database::open(temp.path()).unwrap()).unwrap();
        let staff = Pk::from_tag("staff");
        let mut perm = perms.get(GET_USER).unwrap();
        perm.allowed_groups.push(staff);
        perms.update(&perm).unwrap();

        let mut admin = User::new("admin");
        admin.id = ADMIN;
        assert!(perms.is_allowed(DELETE_USER, &admin).unwrap());

        let mut member = User::new("member");
        member.id = Pk::from_tag("member");
        assert!(!perms.is_allowed(GET_USER, &member).unwrap());
        member.groups.push(staff);
        assert!(perms.is_allowed(GET_USER, &member).unwrap());
        assert!(!perms.is_allowed(DELETE_USER, &member).unwrap());
    }

    #[test]
    fn allows_checks_each_space() {
        let perm = Permission {
            id: LIST_USERS,
            allowed_groups: vec![Pk::from_tag("g")],
            allowed_users: vec![Pk::from_tag("u")],
        };
        assert!(perm.allows(Some(Pk::from_tag("u")), None));
        assert!(perm.allows(None, Some(Pk::from_tag("g"))));
        assert!(!perm.allows(Some(Pk::from_tag("g")), None));
        assert!(!perm.allows(None, None));
    }
}
