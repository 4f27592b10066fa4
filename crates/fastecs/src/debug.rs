//! # Debug Dump
//!
//! Human-readable dumps of entities and the global value:
//!
//! ```text
//! {
//!    global = { World { tick: 3 } },
//!    entities = {
//!       [0] = {
//!       Position = { Position { x: 1.0, y: 2.0 } },
//!       Tag = {},
//!    },
//!    }
//! }
//! ```
//!
//! Components registered with a formatter print their value; the others
//! print only their name.

use fastecs_core::ecs::short_type_name;
use fastecs_core::{EcsResult, EntityId, PoolId, Storage};

use crate::engine::Engine;
use crate::query::ComponentSet;

impl<G, M, S: Storage> Engine<G, M, S> {
    /// Dumps every component of one entity, in ascending type-id order.
    ///
    /// # Errors
    ///
    /// Fails if the entity is unknown.
    pub fn debug_entity(&self, id: EntityId) -> EcsResult<String> {
        let storage = self.storage(id)?;
        let mut out = String::from("{\n");
        for info in self.registry.iter() {
            let Some(bytes) = storage.raw(id, info.id)? else {
                continue;
            };
            out.push_str("      ");
            out.push_str(info.name);
            out.push_str(" = {");
            if let Some(text) = info.format(bytes) {
                out.push_str(&format!(" {text} "));
            }
            out.push_str("}, \n");
        }
        out.push_str("   }");
        Ok(out)
    }

    /// Dumps every entity, ascending.
    ///
    /// # Errors
    ///
    /// Propagates [`Engine::debug_entity`] failures.
    pub fn debug_entities(&self) -> EcsResult<String> {
        self.debug_list(&self.entities::<()>()?, 0)
    }

    /// Dumps every entity of one pool.
    ///
    /// # Errors
    ///
    /// Propagates [`Engine::debug_entity`] failures.
    pub fn debug_entities_in(&self, pool: PoolId) -> EcsResult<String> {
        self.debug_list(&self.entities_in::<()>(pool)?, 0)
    }

    /// Dumps the entities carrying at least one of the types in `Q`.
    ///
    /// # Errors
    ///
    /// Fails if a type in `Q` is unregistered.
    pub fn debug_entities_with<Q: ComponentSet>(&self) -> EcsResult<String> {
        Q::check(&self.registry)?;
        let types = Q::component_ids();
        let mut ids = Vec::new();
        for id in self.entities::<()>()? {
            let storage = self.storage(id)?;
            for &component in &types {
                if storage.contains(id, component)? {
                    ids.push(id);
                    break;
                }
            }
        }
        self.debug_list(&ids, 0)
    }

    /// Dumps the global value, through its formatter if one was supplied.
    #[must_use]
    pub fn debug_global(&self) -> String {
        let text = match self.global_formatter {
            Some(format) => format(&self.global),
            None => short_type_name::<G>().to_owned(),
        };
        format!("{{ {text} }}")
    }

    /// Dumps the global value and every entity.
    ///
    /// # Errors
    ///
    /// Propagates [`Engine::debug_entity`] failures.
    pub fn debug_all(&self) -> EcsResult<String> {
        let entities = self.debug_list(&self.entities::<()>()?, 3)?;
        Ok(format!(
            "{{\n   global = {},\n   entities = {entities}\n}}",
            self.debug_global()
        ))
    }

    fn debug_list(&self, ids: &[EntityId], indent: usize) -> EcsResult<String> {
        let pad = " ".repeat(indent);
        let mut out = String::from("{\n");
        for &id in ids {
            out.push_str(&format!("{pad}   [{id}] = {},\n", self.debug_entity(id)?));
        }
        out.push_str(&pad);
        out.push('}');
        Ok(out)
    }
}
