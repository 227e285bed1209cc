//! Uniqueness checks shared by the repositories.

use plugstore_db::{DbError, DbResult, Entity, Pk};

/// Fails with [`DbError::NotUnique`] if an entity other than `own_id`
/// satisfies `clashes`.
///
/// New entities pass [`Pk::NIL`] as `own_id`; stored entities never carry
/// it, so every match counts.
pub(crate) fn ensure_unique<'a, T: Entity + 'a>(
    existing: impl IntoIterator<Item = &'a T>,
    own_id: Pk,
    value: &str,
    clashes: impl Fn(&T) -> bool,
) -> DbResult<()> {
    if existing
        .into_iter()
        .any(|other| other.id() != own_id && clashes(other))
    {
        return Err(DbError::not_unique(value));
    }
    Ok(())
}
