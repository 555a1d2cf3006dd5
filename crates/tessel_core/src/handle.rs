//! Resource handles with generational indices
//!
//! Handles are 4-byte values that reference a slot in a [`HandlePool`].
//! The generation counter catches use-after-destroy and double-destroy.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use thiserror::Error;

/// Marker trait naming a family of resources (vertex buffers, textures, ...).
///
/// The kind only exists at the type level so that a texture handle can never
/// be passed where a program handle is expected.
pub trait ResourceKind: 'static {
    const NAME: &'static str;
}

/// Index reserved for "no resource".
pub const INVALID_INDEX: u16 = u16::MAX;

/// Typed resource handle
///
/// Format: [16-bit index | 16-bit generation]
/// - Index: slot in the owning pool
/// - Generation: bumped every time the slot is freed
///
/// Example:
/// ```ignore
/// let vb = renderer.create_vertex_buffer(&bytes, &decl)?;
/// renderer.destroy_vertex_buffer(vb)?;
/// // second destroy fails: generation mismatch
/// assert!(renderer.destroy_vertex_buffer(vb).is_err());
/// ```
pub struct Handle<K: ResourceKind> {
    index: u16,
    generation: u16,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind> Handle<K> {
    pub(crate) const fn new(index: u16, generation: u16) -> Self {
        Self {
            index,
            generation,
            _kind: PhantomData,
        }
    }

    /// A handle that never resolves.
    pub const INVALID: Self = Self::new(INVALID_INDEX, 0);

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn generation(&self) -> u16 {
        self.generation
    }

    pub fn is_invalid(&self) -> bool {
        self.index == INVALID_INDEX
    }

    /// Pack into a 32-bit integer (for sort keys and debugging output)
    pub fn to_bits(&self) -> u32 {
        ((self.generation as u32) << 16) | (self.index as u32)
    }

    pub fn from_bits(bits: u32) -> Self {
        Self::new(bits as u16, (bits >> 16) as u16)
    }
}

impl<K: ResourceKind> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: ResourceKind> Copy for Handle<K> {}

impl<K: ResourceKind> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<K: ResourceKind> Eq for Handle<K> {}

impl<K: ResourceKind> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_bits().hash(state);
    }
}

impl<K: ResourceKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            write!(f, "{}(invalid)", K::NAME)
        } else {
            write!(f, "{}({}v{})", K::NAME, self.index, self.generation)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    #[error("{kind} pool exhausted ({limit} live handles)")]
    Exhausted { kind: &'static str, limit: usize },

    #[error("{kind} handle {index}v{generation} is stale or was never allocated")]
    Stale {
        kind: &'static str,
        index: u16,
        generation: u16,
    },
}

struct Slot<V> {
    generation: u16,
    value: Option<V>,
}

/// Slot arena addressed by [`Handle`]s.
///
/// Freed slots go on a free list and are reused with a bumped generation,
/// so old handles to a reused slot stop resolving.
pub struct HandlePool<K: ResourceKind, V> {
    slots: Vec<Slot<V>>,
    free: Vec<u16>,
    live: usize,
    limit: usize,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind, V> HandlePool<K, V> {
    /// `limit` is clamped so the invalid index is never handed out.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            limit: limit.min(INVALID_INDEX as usize),
            _kind: PhantomData,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn alloc(&mut self, value: V) -> Result<Handle<K>, HandleError> {
        if self.live >= self.limit {
            return Err(HandleError::Exhausted {
                kind: K::NAME,
                limit: self.limit,
            });
        }

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    value: None,
                });
                (self.slots.len() - 1) as u16
            }
        };

        let slot = &mut self.slots[index as usize];
        debug_assert!(slot.value.is_none());
        slot.value = Some(value);
        self.live += 1;
        Ok(Handle::new(index, slot.generation))
    }

    fn slot(&self, handle: Handle<K>) -> Option<&Slot<V>> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation && s.value.is_some())
    }

    pub fn contains(&self, handle: Handle<K>) -> bool {
        self.slot(handle).is_some()
    }

    pub fn get(&self, handle: Handle<K>) -> Option<&V> {
        self.slot(handle).and_then(|s| s.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle<K>) -> Option<&mut V> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.value.as_mut())
    }

    /// Resolve or report the handle as stale.
    pub fn try_get(&self, handle: Handle<K>) -> Result<&V, HandleError> {
        self.get(handle).ok_or_else(|| Self::stale(handle))
    }

    pub fn try_get_mut(&mut self, handle: Handle<K>) -> Result<&mut V, HandleError> {
        self.get_mut(handle).ok_or_else(|| Self::stale(handle))
    }

    /// Release the slot and return its value.
    pub fn free(&mut self, handle: Handle<K>) -> Result<V, HandleError> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .ok_or_else(|| Self::stale(handle))?;
        let value = slot.value.take().ok_or_else(|| Self::stale(handle))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        Ok(value)
    }

    /// Iterate over live handles and their values.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<K>, &V)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|v| (Handle::new(index as u16, slot.generation), v))
        })
    }

    fn stale(handle: Handle<K>) -> HandleError {
        HandleError::Stale {
            kind: K::NAME,
            index: handle.index,
            generation: handle.generation,
        }
    }
}
