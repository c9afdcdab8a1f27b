//! Module: db::relation
//! Responsibility: relation collections bound to an owner key, loaded on
//! first read.
//! Does not own: statement text; junction writes come from `sql::compile`.
//!
//! State is one-way: `Unloaded -> Loaded`. A write before any read marks the
//! collection loaded without a query; the first read of an unloaded, bound
//! collection issues exactly one query.
//!
//! Saving an owner saves the contents of its loaded collections: has-many
//! children get the owner key in their foreign key, many-to-many items have
//! their junction rows rewritten. Unloaded collections are left alone.


use crate::{
    db::{
        DbSession,
        order::OrderBy,
        predicate::{Condition, col},
        sql::{JunctionFilter, SelectPlan, compile},
    },
    error::{ErrorOrigin, InternalError, MappingError},
    model::{RelationDescriptor, RelationKind, TableDescriptor, descriptor},
    obs::sink::MetricsEvent,
    traits::Entity,
    value::Value,
};
use std::any::type_name;

///
/// LoadState
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LoadState {
    #[default]
    Unloaded,
    Loaded,
}

///
/// RelationBinding
///
/// What a collection needs to load itself: the relation and a copy of the
/// owner's key. Never a reference to the owner.
///

#[derive(Clone, Debug, PartialEq)]
pub struct RelationBinding {
    pub relation: RelationDescriptor,
    pub owner_table: &'static str,
    pub owner_key: Value,
}

///
/// LazyList
///

#[derive(Debug)]
pub struct LazyList<T: Entity> {
    items: Vec<T>,
    state: LoadState,
    binding: Option<RelationBinding>,
}

impl<T: Entity> LazyList<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            state: LoadState::Unloaded,
            binding: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> LoadState {
        self.state
    }

    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self.state, LoadState::Loaded)
    }

    #[must_use]
    pub const fn binding(&self) -> Option<&RelationBinding> {
        self.binding.as_ref()
    }

    // ------------------------------------------------------------------
    // Writes (never query)
    // ------------------------------------------------------------------

    pub fn push(&mut self, item: T) {
        self.items.push(item);
        self.state = LoadState::Loaded;
    }

    /// Insert at `index`, clamped to the current length.
    pub fn insert(&mut self, index: usize, item: T) {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        self.state = LoadState::Loaded;
    }

    /// Replace the whole contents.
    pub fn set(&mut self, items: Vec<T>) {
        self.items = items;
        self.state = LoadState::Loaded;
    }

    /// Record an item without marking the collection loaded; a later load
    /// merges around it.
    pub fn attach(&mut self, item: T) {
        self.items.push(item);
    }

    // ------------------------------------------------------------------
    // Reads (load first)
    // ------------------------------------------------------------------

    pub fn len(&mut self, session: &DbSession) -> Result<usize, InternalError> {
        self.load(session)?;

        Ok(self.items.len())
    }

    pub fn is_empty(&mut self, session: &DbSession) -> Result<bool, InternalError> {
        self.load(session)?;

        Ok(self.items.is_empty())
    }

    pub fn get(&mut self, session: &DbSession, index: usize) -> Result<Option<&T>, InternalError> {
        self.load(session)?;

        Ok(self.items.get(index))
    }

    pub fn as_slice(&mut self, session: &DbSession) -> Result<&[T], InternalError> {
        self.load(session)?;

        Ok(&self.items)
    }

    pub fn iter(&mut self, session: &DbSession) -> Result<std::slice::Iter<'_, T>, InternalError> {
        self.load(session)?;

        Ok(self.items.iter())
    }

    /// Membership by the related type's key.
    pub fn contains(&mut self, session: &DbSession, item: &T) -> Result<bool, InternalError> {
        Ok(self.index_of(session, item)?.is_some())
    }

    /// Position by the related type's key.
    pub fn index_of(&mut self, session: &DbSession, item: &T) -> Result<Option<usize>, InternalError> {
        self.load(session)?;
        let key = key_of(item)?;

        for (index, existing) in self.items.iter().enumerate() {
            if key_of(existing)? == key {
                return Ok(Some(index));
            }
        }

        Ok(None)
    }

    /// Remove the item whose key matches `item`'s key.
    pub fn remove(&mut self, session: &DbSession, item: &T) -> Result<Option<T>, InternalError> {
        Ok(self
            .index_of(session, item)?
            .map(|index| self.items.remove(index)))
    }

    pub fn remove_at(&mut self, session: &DbSession, index: usize) -> Result<Option<T>, InternalError> {
        self.load(session)?;

        Ok((index < self.items.len()).then(|| self.items.remove(index)))
    }

    pub fn clear(&mut self, session: &DbSession) -> Result<(), InternalError> {
        self.load(session)?;
        self.items.clear();

        Ok(())
    }

    pub fn into_items(mut self, session: &DbSession) -> Result<Vec<T>, InternalError> {
        self.load(session)?;

        Ok(self.items)
    }

    /// Load now if still unloaded. An unbound collection has nothing to load
    /// and is marked loaded as is.
    pub fn load(&mut self, session: &DbSession) -> Result<(), InternalError> {
        if self.is_loaded() {
            return Ok(());
        }

        if let Some(binding) = &self.binding {
            let loaded = session.load_relation::<T>(binding)?;
            self.merge(loaded)?;
        }
        self.state = LoadState::Loaded;

        Ok(())
    }

    // Loaded rows keep load order. With exactly one attached item, rows
    // before its key in load order go ahead of it and rows after are
    // appended; its own row is a duplicate. With several attached items,
    // unseen rows go ahead of all of them, in load order.
    fn merge(&mut self, loaded: Vec<T>) -> Result<(), InternalError> {
        match self.items.len() {
            0 => self.items = loaded,
            1 => {
                let anchor = key_of(&self.items[0])?;
                let mut found = false;
                let mut at = 0;

                for item in loaded {
                    if key_of(&item)? == anchor {
                        found = true;
                    } else if found {
                        self.items.push(item);
                    } else {
                        self.items.insert(at, item);
                        at += 1;
                    }
                }
            }
            _ => {
                let attached = self.items.iter().map(key_of).collect::<Result<Vec<_>, _>>()?;
                let mut at = 0;

                for item in loaded {
                    if !attached.contains(&key_of(&item)?) {
                        self.items.insert(at, item);
                        at += 1;
                    }
                }
            }
        }

        Ok(())
    }
}

impl<T: Entity> Default for LazyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity + Clone> Clone for LazyList<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            state: self.state,
            binding: self.binding.clone(),
        }
    }
}

impl<T: Entity + PartialEq> PartialEq for LazyList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state && self.items == other.items
    }
}

fn key_of<T: Entity>(item: &T) -> Result<Value, InternalError> {
    let table = descriptor::<T>()?;
    let (index, _) = table.single_key("relation key", ErrorOrigin::Relation)?;

    Ok(item.values().swap_remove(index))
}

///
/// BindMode
///
/// What binding does to a collection beyond recording the owner key.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BindMode {
    /// Bind only.
    Bind,

    /// Owner was just read: load non-lazy relations now.
    Load,

    /// Owner was just written: save the loaded contents.
    Persist,
}

///
/// RelationBinder
///
/// Handed to `Entity::bind_relations` so an entity can bind each of its
/// collections to its key.
///

pub struct RelationBinder<'a> {
    session: &'a DbSession,
    table: &'a TableDescriptor,
    owner_key: Value,
    mode: BindMode,
}

impl<'a> RelationBinder<'a> {
    pub(crate) const fn new(
        session: &'a DbSession,
        table: &'a TableDescriptor,
        owner_key: Value,
        mode: BindMode,
    ) -> Self {
        Self {
            session,
            table,
            owner_key,
            mode,
        }
    }

    /// Bind `list` to the relation declared as `relation`, then load or save
    /// it as the mode asks.
    pub fn bind<T: Entity>(&self, relation: &str, list: &mut LazyList<T>) -> Result<(), InternalError> {
        let descriptor = self.table.relation(relation).ok_or_else(|| {
            InternalError::mapping(
                ErrorOrigin::Relation,
                MappingError::UnknownRelation {
                    entity: self.table.entity().to_string(),
                    relation: relation.to_string(),
                },
            )
        })?;

        if descriptor.target != type_name::<T>() {
            return Err(InternalError::mapping(
                ErrorOrigin::Relation,
                MappingError::UnknownRelation {
                    entity: self.table.entity().to_string(),
                    relation: format!("{relation} ({})", type_name::<T>()),
                },
            ));
        }

        list.binding = Some(RelationBinding {
            relation: descriptor.clone(),
            owner_table: self.table.name(),
            owner_key: self.owner_key.clone(),
        });

        match self.mode {
            BindMode::Bind => Ok(()),
            BindMode::Load if descriptor.lazy => Ok(()),
            BindMode::Load => list.load(self.session),
            BindMode::Persist => self.session.save_relation(self.table, list),
        }
    }
}

impl DbSession {
    /// One query for the rows related to the binding's owner key, in key order.
    pub(crate) fn load_relation<T: Entity>(
        &self,
        binding: &RelationBinding,
    ) -> Result<Vec<T>, InternalError> {
        let table = descriptor::<T>()?;
        let (_, key) = table.single_key("relation load", ErrorOrigin::Relation)?;
        let order = OrderBy::new().asc(key.name);

        let statement = match &binding.relation.kind {
            RelationKind::HasMany { foreign_key } => {
                let condition = col(*foreign_key).eq(binding.owner_key.clone());
                compile::select(self.dialect(), &table, &SelectPlan::new(&condition, &order))?
            }
            RelationKind::ManyToMany {
                junction,
                owner_column,
                related_column,
            } => {
                let condition = Condition::Empty;
                let plan = SelectPlan::new(&condition, &order).junction(JunctionFilter {
                    junction,
                    owner_column,
                    related_column,
                    owner_key: binding.owner_key.clone(),
                });
                compile::select(self.dialect(), &table, &plan)?
            }
        };

        let items = self.load_related::<T>(&table, &statement)?;
        tracing::trace!(
            owner = binding.owner_table,
            relation = binding.relation.name,
            rows = items.len(),
            "relation loaded"
        );
        self.emit(MetricsEvent::RelationLoad {
            table: table.name(),
            rows: items.len() as u64,
        });

        Ok(items)
    }
    /// Save every item of a loaded collection against its binding.
    fn save_relation<T: Entity>(
        &self,
        owner: &TableDescriptor,
        list: &mut LazyList<T>,
    ) -> Result<(), InternalError> {
        let Some(binding) = list.binding.clone() else {
            return Ok(());
        };
        if !list.is_loaded() {
            return Ok(());
        }

        match binding.relation.kind {
            RelationKind::HasMany { foreign_key } => {
                for item in &mut list.items {
                    item.set_value(foreign_key, &binding.owner_key)?;
                    self.save(item)?;
                }
            }
            RelationKind::ManyToMany {
                junction,
                owner_column,
                related_column,
            } => {
                let link = JunctionFilter {
                    junction,
                    owner_column,
                    related_column,
                    owner_key: binding.owner_key.clone(),
                };
                self.run_execute(&compile::junction_delete(self.dialect(), owner, &link))?;

                for item in &mut list.items {
                    self.save(item)?;
                    let key = key_of(item)?;
                    self.run_execute(&compile::junction_insert(self.dialect(), owner, &link, key))?;
                }
            }
        }

        tracing::trace!(
            owner = binding.owner_table,
            relation = binding.relation.name,
            rows = list.items.len(),
            "relation saved"
        );

        Ok(())
    }
}
