//! # Plugstore Repositories
//!
//! Domain repositories stored in a [`plugstore_db::Database`]:
//! - [`Users`] with Argon2 password hashes and a bootstrapped `admin`
//! - [`Groups`] and [`Companies`] with case-insensitive unique names
//! - [`Sessions`] with idle-time garbage collection
//! - [`Permissions`] for the user management operations
//! - [`Plugins`] with a unique developer id
//!
//! Uniqueness is checked by listing the partition inside the same write
//! transaction that performs the write, so two concurrent adds cannot both
//! pass the check.
//!
//! Records are stored as JSON with `PascalCase` field names.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod companies;
mod error;
mod groups;
mod named;
pub mod password;
pub mod permissions;
mod plugins;
mod sessions;
mod unique;
mod users;

pub use companies::{Companies, Company, COMPANY_PARTITION};
pub use error::{RepoError, RepoResult};
pub use groups::{Group, Groups, GROUP_PARTITION};
pub use named::Named;
pub use permissions::{Permission, Permissions, PERMISSION_PARTITION};
pub use plugins::{Instance, Plugin, Plugins, PLUGIN_PARTITION};
pub use sessions::{unix_now, Session, Sessions, SESSION_PARTITION};
pub use users::{User, Users, ADMIN, ADMIN_LOGIN, USER_PARTITION};
