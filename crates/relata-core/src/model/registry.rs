//! Module: model::registry
//! Responsibility: process-wide cache of validated table descriptors.
//! Does not own: declaration rules (see `table`).
//!
//! Descriptors are built at most once per entity type and never mutated after
//! installation. Failed builds are not cached, so a later call reports the
//! same mapping error again.

use crate::{error::InternalError, model::table::TableDescriptor, traits::Entity};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::{any::TypeId, collections::HashMap, sync::Arc};

static REGISTRY: Lazy<RwLock<HashMap<TypeId, Arc<TableDescriptor>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Return the descriptor for `E`, building and validating it on first use.
///
/// Concurrent first use from several threads installs exactly one descriptor;
/// every caller observes that same instance.
pub fn descriptor<E: Entity>() -> Result<Arc<TableDescriptor>, InternalError> {
    let id = TypeId::of::<E>();

    if let Some(found) = REGISTRY.read().get(&id) {
        return Ok(Arc::clone(found));
    }

    let mut registry = REGISTRY.write();
    if let Some(found) = registry.get(&id) {
        return Ok(Arc::clone(found));
    }

    let table = Arc::new(TableDescriptor::build(E::declare())?);
    tracing::debug!(
        entity = table.entity(),
        table = table.name(),
        columns = table.columns().len(),
        relations = table.relations().len(),
        "registered table descriptor"
    );
    registry.insert(id, Arc::clone(&table));

    Ok(table)
}

/// Number of installed descriptors.
#[must_use]
pub fn registered_count() -> usize {
    REGISTRY.read().len()
}
