//! Identity of persistable types.

use crate::pk::Pk;

/// A type that is stored under a single primary key field.
///
/// Every persistable type exposes exactly one key; composite keys are not
/// supported.
///
/// # Example
///
/// ```rust
/// use plugstore_db::{Entity, Pk};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, Default)]
/// struct Group {
///     id: Pk,
///     name: String,
/// }
///
/// impl Entity for Group {
///     fn id(&self) -> Pk {
///         self.id
///     }
///
///     fn set_id(&mut self, id: Pk) {
///         self.id = id;
///     }
/// }
/// ```
pub trait Entity {
    /// Returns the key the entity is stored under.
    fn id(&self) -> Pk;

    /// Assigns the key, used when a new entity is created.
    fn set_id(&mut self, id: Pk);
}

/// Implements [`Entity`] for structs with an `id: Pk` field.
///
/// ```rust
/// use plugstore_db::{impl_entity, Entity, Pk};
///
/// struct Session {
///     id: Pk,
/// }
///
/// impl_entity!(Session);
/// ```
#[macro_export]
macro_rules! impl_entity {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Entity for $ty {
                fn id(&self) -> $crate::Pk {
                    self.id
                }

                fn set_id(&mut self, id: $crate::Pk) {
                    self.id = id;
                }
            }
        )+
    };
}
