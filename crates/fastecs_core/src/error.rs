//! # ECS Error Types
//!
//! Every error raised here is a usage error: the caller referenced something
//! that does not exist, asked for something twice, or exceeded a numeric
//! header range. None of them are transient and none are retried.

use std::borrow::Cow;

use thiserror::Error;

use crate::ecs::{ComponentId, EntityId};

/// Fixed-width header fields of the packed record layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderField {
    /// Signed length prefix of an entity record.
    EntityLength,
    /// Length prefix of a component block (header + payload).
    ComponentLength,
    /// Component type id inside a component block.
    TypeId,
}

impl std::fmt::Display for HeaderField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::EntityLength => "entity length",
            Self::ComponentLength => "component length",
            Self::TypeId => "type id",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while managing entities, components and systems.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The entity id was never issued, or its storage was already reclaimed.
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    /// The entity id is already present in this storage.
    #[error("entity {0} already exists")]
    EntityExists(EntityId),

    /// The entity was removed and its record is tombstoned.
    #[error("entity {0} was removed")]
    EntityRemoved(EntityId),

    /// A component of this type is already attached to the entity.
    #[error("component '{component}' already exists for entity {entity}")]
    DuplicateComponent {
        /// The entity.
        entity: EntityId,
        /// Short name of the component type.
        component: Cow<'static, str>,
    },

    /// The entity has no component of this type.
    #[error("entity {entity} has no component '{component}'")]
    MissingComponent {
        /// The entity.
        entity: EntityId,
        /// Short name of the component type.
        component: Cow<'static, str>,
    },

    /// The component type is not part of the registered component set.
    #[error("component '{0}' is not registered")]
    UnregisteredComponent(&'static str),

    /// Two component types declared the same id.
    #[error("component id {id} is declared by both '{first}' and '{second}'")]
    DuplicateComponentId {
        /// The clashing id.
        id: ComponentId,
        /// The type registered first.
        first: &'static str,
        /// The type registered second.
        second: &'static str,
    },

    /// A value does not fit in its fixed-width header field.
    #[error("{field} header overflow: {value} exceeds {max}")]
    HeaderOverflow {
        /// Which header field overflowed.
        field: HeaderField,
        /// The value that was to be written.
        value: u64,
        /// The largest value the field can hold.
        max: u64,
    },

    /// The configured header layout cannot describe the registered components.
    #[error("invalid header layout: {0}")]
    InvalidLayout(String),

    /// The type id equals the value reserved for tombstoned component blocks.
    #[error("type id {0} is reserved for tombstoned components")]
    ReservedTypeId(ComponentId),

    /// A system of this type is already registered.
    #[error("system '{0}' is already registered")]
    DuplicateSystem(&'static str),

    /// No system of this type is registered.
    #[error("system '{0}' is not registered")]
    SystemNotFound(&'static str),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EcsError {
    /// Replaces the component named in a component error.
    ///
    /// The packed store only knows type ids; the typed layer above it calls
    /// this to report the component's type name instead.
    #[must_use]
    pub fn with_component_name(self, name: &'static str) -> Self {
        match self {
            Self::DuplicateComponent { entity, .. } => Self::DuplicateComponent {
                entity,
                component: Cow::Borrowed(name),
            },
            Self::MissingComponent { entity, .. } => Self::MissingComponent {
                entity,
                component: Cow::Borrowed(name),
            },
            other => other,
        }
    }
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
