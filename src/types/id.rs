// ABOUTME: Phantom-typed persisted identities for model entities.
// ABOUTME: Prevents comparing a VM identity with an application identity at compile time.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Entity kinds; never constructed.
pub enum EnvironmentMarker {}
pub enum VmMarker {}
pub enum ApplicationMarker {}
pub enum LogicalDatabaseMarker {}
pub enum PhysicalDatabaseMarker {}

/// Identity assigned by persistence on first save.
///
/// The raw value `0` means "not yet persisted". Two entities of the same kind
/// with the same identity are the same entity, whatever their other fields say.
pub struct EntityId<T> {
    value: u64,
    _marker: PhantomData<T>,
}

impl<T> EntityId<T> {
    pub const UNASSIGNED: u64 = 0;

    pub fn new(value: u64) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    /// Identity of an entity that has never been saved.
    pub fn unassigned() -> Self {
        Self::new(Self::UNASSIGNED)
    }

    pub fn is_assigned(&self) -> bool {
        self.value != Self::UNASSIGNED
    }

    pub fn get(&self) -> u64 {
        self.value
    }
}

// Derives would demand the same traits of the uninhabited marker types.

impl<T> Default for EntityId<T> {
    fn default() -> Self {
        Self::unassigned()
    }
}

impl<T> std::fmt::Debug for EntityId<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EntityId").field(&self.value).finish()
    }
}

impl<T> Clone for EntityId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for EntityId<T> {}

impl<T> PartialEq for EntityId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for EntityId<T> {}

impl<T> Hash for EntityId<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> std::fmt::Display for EntityId<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for EntityId<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for EntityId<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u64::deserialize(deserializer)?;
        Ok(Self::new(value))
    }
}

pub type EnvironmentId = EntityId<EnvironmentMarker>;
pub type VmId = EntityId<VmMarker>;
pub type ApplicationId = EntityId<ApplicationMarker>;
pub type LogicalDatabaseId = EntityId<LogicalDatabaseMarker>;
pub type PhysicalDatabaseId = EntityId<PhysicalDatabaseMarker>;
