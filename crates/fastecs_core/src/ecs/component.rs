//! # Component System
//!
//! Components are pure data containers with no behavior.
//! They must be `Pod` so they can live in untyped byte storage and be copied
//! in and out of it without pointer reinterpretation.

use std::any::TypeId;
use std::fmt::Debug;
use std::mem::size_of;

use bytemuck::Pod;

/// Integer id naming a component type.
pub type ComponentId = u32;

/// Marker trait for ECS components.
///
/// Components must be:
/// - `Pod`: plain old data, bitwise copyable, any bit pattern valid
/// - `Send + Sync`: read concurrently by parallel systems
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Default, Pod, Zeroable)]
/// #[repr(C)]
/// struct Position {
///     x: f32,
///     y: f32,
/// }
///
/// impl Component for Position {
///     const ID: ComponentId = 0;
/// }
/// ```
pub trait Component: Pod + Send + Sync + 'static {
    /// Unique identifier for this component type.
    ///
    /// Written into packed component headers, so it must fit the configured
    /// type-id width and must not equal its reserved tombstone value.
    const ID: ComponentId;
}

/// Formats a component payload for the debug dump.
pub type DebugFn = fn(&[u8]) -> String;

/// Called with a component's payload right before it is erased.
pub type RemoveHook = fn(&[u8]);

/// Last path segment of a type name, e.g. `Position` for `game::Position`.
#[must_use]
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// Reads a component out of a payload that may be larger than the type.
///
/// # Panics
///
/// Panics if `bytes` is shorter than `C`.
#[inline]
#[must_use]
pub fn read_payload<C: Component>(bytes: &[u8]) -> C {
    bytemuck::pod_read_unaligned(&bytes[..size_of::<C>()])
}

fn debug_payload<C: Component + Debug>(bytes: &[u8]) -> String {
    format!("{:?}", read_payload::<C>(bytes))
}

/// Type-erased description of a registered component type.
///
/// Carries the operations the engine needs without knowing the type:
/// its size, an optional formatter and an optional removal hook.
#[derive(Clone, Copy, Debug)]
pub struct ComponentInfo {
    /// The component's id.
    pub id: ComponentId,
    /// Short type name, used by errors and the debug dump.
    pub name: &'static str,
    /// Rust type identity, used to catch id clashes.
    pub type_id: TypeId,
    /// Payload size in bytes.
    pub size: usize,
    /// Custom formatter, if one was supplied.
    pub debug: Option<DebugFn>,
    /// Removal hook, if one was supplied.
    pub on_remove: Option<RemoveHook>,
}

impl ComponentInfo {
    /// Describes `C` with no formatter and no hook.
    #[must_use]
    pub fn of<C: Component>() -> Self {
        Self {
            id: C::ID,
            name: short_type_name::<C>(),
            type_id: TypeId::of::<C>(),
            size: size_of::<C>(),
            debug: None,
            on_remove: None,
        }
    }

    /// Describes `C`, formatting it with its `Debug` impl.
    #[must_use]
    pub fn with_debug<C: Component + Debug>() -> Self {
        Self {
            debug: Some(debug_payload::<C> as DebugFn),
            ..Self::of::<C>()
        }
    }

    /// Attaches a removal hook.
    #[must_use]
    pub fn on_remove(mut self, hook: RemoveHook) -> Self {
        self.on_remove = Some(hook);
        self
    }

    /// Returns `true` if this describes `C`.
    #[inline]
    #[must_use]
    pub fn is<C: Component>(&self) -> bool {
        self.type_id == TypeId::of::<C>()
    }

    /// Formats a payload, or `None` when no formatter was supplied.
    #[must_use]
    pub fn format(&self, bytes: &[u8]) -> Option<String> {
        self.debug.map(|f| f(bytes))
    }

    /// Runs the removal hook, if any.
    #[inline]
    pub fn removed(&self, bytes: &[u8]) {
        if let Some(hook) = self.on_remove {
            hook(bytes);
        }
    }
}
