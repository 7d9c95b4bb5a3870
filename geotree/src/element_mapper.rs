//! Association between application objects and tree identifiers.
//!
//! The tree stores only compact [`EntryId`]s. An [`ElementMapper`] resolves
//! them back to application objects and computes the boundary of an object.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::boundary::Boundary;
use crate::rtree::rtree_types::{EntryId, IndexError, IndexResult};

/// Bidirectional object/identifier mapping backing a spatial index.
///
/// While an entry is indexed, both directions are total and unique: one
/// object has exactly one identifier and the identifier resolves back to it.
pub trait ElementMapper<T>: Send + Sync {
    /// Identifier assigned to `object`, if it is registered.
    fn tree_identifier(&self, object: &T) -> Option<EntryId>;

    /// Registers `object` under `id`.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if the object already has another identifier or the
    /// identifier already belongs to another object.
    fn set_tree_identifier(&self, object: &T, id: EntryId) -> IndexResult<()>;

    /// The object registered under `id`.
    fn object_from_tree_identifier(&self, id: EntryId) -> Option<T>;

    /// Boundary of `object` in the index's coordinate system.
    fn envelope(&self, object: &T) -> IndexResult<Boundary>;

    /// Unregisters `id`, returning the object it belonged to.
    fn remove_tree_identifier(&self, id: EntryId) -> Option<T>;

    /// Number of registered objects.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unregisters every object.
    fn clear(&self);
}

/// Computes the boundary of an object.
pub type EnvelopeFn<T> = Arc<dyn Fn(&T) -> IndexResult<Boundary> + Send + Sync>;

/// Hash-map backed [`ElementMapper`] with constant time lookups both ways.
///
/// # Examples
///
/// ```rust
/// use geotree::{Boundary, CoordinateSystem, ElementMapper, HashElementMapper};
///
/// let crs = CoordinateSystem::cartesian(2).shared();
/// let mapper = HashElementMapper::new(move |name: &String| {
///     let x = name.len() as f64;
///     Boundary::point(crs.clone(), &[x, x])
/// });
///
/// mapper.set_tree_identifier(&"cafe".to_string(), 7).unwrap();
/// assert_eq!(mapper.tree_identifier(&"cafe".to_string()), Some(7));
/// assert_eq!(mapper.object_from_tree_identifier(7).as_deref(), Some("cafe"));
/// ```
pub struct HashElementMapper<T>
where
    T: Eq + Hash + Clone,
{
    by_id: DashMap<EntryId, T>,
    by_object: DashMap<T, EntryId>,
    envelope_fn: EnvelopeFn<T>,
}

impl<T> HashElementMapper<T>
where
    T: Eq + Hash + Clone,
{
    pub fn new<F>(envelope_fn: F) -> Self
    where
        F: Fn(&T) -> IndexResult<Boundary> + Send + Sync + 'static,
    {
        HashElementMapper {
            by_id: DashMap::new(),
            by_object: DashMap::new(),
            envelope_fn: Arc::new(envelope_fn),
        }
    }
}

impl<T> ElementMapper<T> for HashElementMapper<T>
where
    T: Eq + Hash + Clone + Send + Sync,
{
    fn tree_identifier(&self, object: &T) -> Option<EntryId> {
        self.by_object.get(object).map(|id| *id)
    }

    fn set_tree_identifier(&self, object: &T, id: EntryId) -> IndexResult<()> {
        // Lock order: object entry first, then id entry.
        match self.by_object.entry(object.clone()) {
            Entry::Occupied(existing) => {
                if *existing.get() == id {
                    Ok(())
                } else {
                    Err(IndexError::InvalidOperation(format!(
                        "object is already registered under identifier {}",
                        existing.get()
                    )))
                }
            }
            Entry::Vacant(vacant) => match self.by_id.entry(id) {
                Entry::Occupied(_) => Err(IndexError::InvalidOperation(format!(
                    "identifier {} already belongs to another object",
                    id
                ))),
                Entry::Vacant(slot) => {
                    slot.insert(object.clone());
                    vacant.insert(id);
                    Ok(())
                }
            },
        }
    }

    fn object_from_tree_identifier(&self, id: EntryId) -> Option<T> {
        self.by_id.get(&id).map(|object| object.clone())
    }

    fn envelope(&self, object: &T) -> IndexResult<Boundary> {
        (self.envelope_fn)(object)
    }

    fn remove_tree_identifier(&self, id: EntryId) -> Option<T> {
        let (_, object) = self.by_id.remove(&id)?;
        self.by_object.remove_if(&object, |_, mapped| *mapped == id);
        Some(object)
    }

    fn len(&self) -> usize {
        self.by_id.len()
    }

    fn clear(&self) {
        self.by_object.clear();
        self.by_id.clear();
    }
}

impl<T> fmt::Debug for HashElementMapper<T>
where
    T: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashElementMapper")
            .field("len", &self.by_id.len())
            .finish()
    }
}
