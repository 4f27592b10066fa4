//! # Packed Record Store
//!
//! Every entity's components packed back to back into one [`ByteArena`]:
//!
//! ```text
//! record    = [entity_length][component]*
//! component = [component_length][type_id][payload bytes]
//! ```
//!
//! Records are laid out in ascending id order. A record is found through its
//! slot (id, offset); components inside it are found by walking forward from
//! the record start, each block announcing its own length.
//!
//! Removal never moves bytes. A removed component keeps its block, stamped
//! with the reserved tombstone type id and zeroed; a removed entity has its
//! length negated and its body wiped. [`PackedStore::compact`] rewrites the
//! arena without them.

use std::borrow::Cow;

use super::component::{
    read_payload, short_type_name, Component, ComponentId, ComponentInfo, RemoveHook,
};
use super::entity::EntityId;
use super::registry::ComponentRegistry;
use super::storage::Storage;
use crate::error::{EcsError, EcsResult, HeaderField};
use crate::memory::{ByteArena, HeaderLayout};

/// Where one entity record starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RecordSlot {
    id: EntityId,
    offset: usize,
}

/// A live record, resolved against the current arena.
#[derive(Clone, Copy, Debug)]
struct Record {
    index: usize,
    offset: usize,
    len: usize,
}

/// One component block inside a record.
#[derive(Clone, Copy, Debug)]
struct Block {
    offset: usize,
    len: usize,
    type_id: u64,
}

/// Forward walk over the blocks of one record.
struct Blocks<'a> {
    bytes: &'a [u8],
    layout: HeaderLayout,
    at: usize,
    end: usize,
}

impl Iterator for Blocks<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        if self.at >= self.end {
            return None;
        }
        let len = self.layout.component_length.read_unsigned(&self.bytes[self.at..]) as usize;
        let type_id = self
            .layout
            .type_id
            .read_unsigned(&self.bytes[self.at + self.layout.component_length.bytes()..]);
        debug_assert!(len >= self.layout.component_header(), "corrupt component block");
        let block = Block {
            offset: self.at,
            len,
            type_id,
        };
        self.at += len;
        Some(block)
    }
}

fn type_label(id: u64) -> Cow<'static, str> {
    Cow::Owned(format!("type #{id}"))
}

/// Packed, variable-length record store.
///
/// # Thread Safety
///
/// Insertion, removal and compaction take `&mut self` and run only in the
/// mutable phase. Shared readers never see a half-written record.
///
/// # Example
///
/// ```rust,ignore
/// let mut store = PackedStore::new(HeaderLayout::default());
/// store.create_entity(EntityId::new(0))?;
/// store.add_component(EntityId::new(0), 1, &7u32.to_le_bytes())?;
/// assert!(store.has_component(EntityId::new(0), 1)?);
/// ```
#[derive(Debug, Clone)]
pub struct PackedStore {
    layout: HeaderLayout,
    arena: ByteArena,
    /// One slot per record in the arena, ascending by id and by offset.
    slots: Vec<RecordSlot>,
    /// Bytes held by tombstoned records and blocks.
    dead_bytes: usize,
    /// Records that are not tombstoned.
    live: usize,
}

impl Default for PackedStore {
    fn default() -> Self {
        Self::new(HeaderLayout::default())
    }
}

impl PackedStore {
    /// Creates an empty store using `layout` for every header.
    #[must_use]
    pub fn new(layout: HeaderLayout) -> Self {
        Self {
            layout,
            arena: ByteArena::new(),
            slots: Vec::new(),
            dead_bytes: 0,
            live: 0,
        }
    }

    /// The header layout in use.
    #[inline]
    #[must_use]
    pub const fn layout(&self) -> &HeaderLayout {
        &self.layout
    }

    /// The raw arena bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.arena.as_bytes()
    }

    /// Number of bytes held by tombstones.
    #[inline]
    #[must_use]
    pub const fn dead_bytes(&self) -> usize {
        self.dead_bytes
    }

    fn record_length(&self, offset: usize) -> i64 {
        self.layout.entity_length.read_signed(self.arena.tail(offset))
    }

    fn write_record_length(&mut self, offset: usize, len: i64) {
        let width = self.layout.entity_length;
        width.write_signed(self.arena.slice_mut(offset, width.bytes()), len);
    }

    fn locate(&self, id: EntityId) -> EcsResult<Record> {
        let index = self
            .slots
            .binary_search_by_key(&id, |slot| slot.id)
            .map_err(|_| EcsError::EntityNotFound(id))?;
        let offset = self.slots[index].offset;
        let len = self.record_length(offset);
        if len < 0 {
            return Err(EcsError::EntityRemoved(id));
        }
        Ok(Record {
            index,
            offset,
            len: len.unsigned_abs() as usize,
        })
    }

    fn blocks(&self, record: Record) -> Blocks<'_> {
        Blocks {
            bytes: self.arena.as_bytes(),
            layout: self.layout,
            at: record.offset + self.layout.entity_header(),
            end: record.offset + record.len,
        }
    }

    fn find_block(&self, record: Record, type_id: ComponentId) -> Option<Block> {
        let wanted = u64::from(type_id);
        self.blocks(record).find(|block| block.type_id == wanted)
    }

    fn payload_range(&self, block: Block) -> (usize, usize) {
        let header = self.layout.component_header();
        (block.offset + header, block.len - header)
    }

    fn shift_after(&mut self, index: usize, delta: usize) {
        for slot in &mut self.slots[index + 1..] {
            slot.offset += delta;
        }
    }

    #[inline]
    fn debug_check_order(&self) {
        debug_assert!(
            self.slots
                .windows(2)
                .all(|w| w[0].id < w[1].id && w[0].offset < w[1].offset),
            "packed records out of order"
        );
    }

    /// Appends an empty record for `id`.
    ///
    /// Ids normally arrive in ascending order and land at the end of the
    /// arena; an out-of-order id is spliced in at its sorted position.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityExists`] if `id` already has a record,
    /// tombstoned or not.
    pub fn create_entity(&mut self, id: EntityId) -> EcsResult<()> {
        let pos = match self.slots.binary_search_by_key(&id, |slot| slot.id) {
            Ok(_) => return Err(EcsError::EntityExists(id)),
            Err(pos) => pos,
        };

        let width = self.layout.entity_length;
        let mut header = [0u8; 8];
        width.write_signed(&mut header, width.bytes() as i64);

        let offset = self
            .slots
            .get(pos)
            .map_or(self.arena.len(), |next| next.offset);
        self.arena.insert(offset, &header[..width.bytes()]);
        self.slots.insert(pos, RecordSlot { id, offset });
        self.shift_after(pos, width.bytes());
        self.live += 1;
        self.debug_check_order();
        Ok(())
    }

    /// Attaches a component payload to a live entity.
    ///
    /// The first tombstoned block in the record with enough room is reused in
    /// place. Otherwise a new block is inserted right after the record and
    /// every later record moves down.
    ///
    /// # Arguments
    ///
    /// * `id` - The entity
    /// * `type_id` - Component type id, must not be the tombstone id
    /// * `payload` - Component bytes
    ///
    /// # Errors
    ///
    /// Fails if the entity is unknown or tombstoned, if it already carries
    /// `type_id`, or if any header would overflow.
    pub fn add_component(
        &mut self,
        id: EntityId,
        type_id: ComponentId,
        payload: &[u8],
    ) -> EcsResult<()> {
        let record = self.locate(id)?;
        let wanted = u64::from(type_id);
        if wanted == self.layout.tombstone_id() {
            return Err(EcsError::ReservedTypeId(type_id));
        }
        self.layout.check(HeaderField::TypeId, wanted)?;

        let header = self.layout.component_header();
        let block_len = header + payload.len();
        self.layout
            .check(HeaderField::ComponentLength, block_len as u64)?;

        let tombstone = self.layout.tombstone_id();
        let mut reusable = None;
        for block in self.blocks(record) {
            if block.type_id == wanted {
                return Err(EcsError::DuplicateComponent {
                    entity: id,
                    component: type_label(wanted),
                });
            }
            if reusable.is_none() && block.type_id == tombstone && block.len >= block_len {
                reusable = Some(block);
            }
        }

        if let Some(block) = reusable {
            let type_width = self.layout.type_id;
            let at = block.offset + self.layout.component_length.bytes();
            type_width.write_unsigned(self.arena.slice_mut(at, type_width.bytes()), wanted);
            self.arena
                .slice_mut(block.offset + header, payload.len())
                .copy_from_slice(payload);
            self.dead_bytes -= block.len;
            return Ok(());
        }

        let new_len = record.len + block_len;
        self.layout
            .check(HeaderField::EntityLength, new_len as u64)?;

        let mut bytes = vec![0u8; block_len];
        self.layout
            .component_length
            .write_unsigned(&mut bytes, block_len as u64);
        self.layout
            .type_id
            .write_unsigned(&mut bytes[self.layout.component_length.bytes()..], wanted);
        bytes[header..].copy_from_slice(payload);

        self.arena.insert(record.offset + record.len, &bytes);
        self.write_record_length(record.offset, new_len as i64);
        self.shift_after(record.index, block_len);
        self.debug_check_order();
        Ok(())
    }

    /// Borrows a component's payload, including any slack left by a reused
    /// block.
    ///
    /// # Errors
    ///
    /// Fails if the entity is unknown or tombstoned.
    pub fn component(&self, id: EntityId, type_id: ComponentId) -> EcsResult<Option<&[u8]>> {
        let record = self.locate(id)?;
        Ok(self.find_block(record, type_id).map(|block| {
            let (at, len) = self.payload_range(block);
            self.arena.slice(at, len)
        }))
    }

    /// Mutably borrows a component's payload.
    ///
    /// # Errors
    ///
    /// Fails if the entity is unknown or tombstoned.
    pub fn component_mut(
        &mut self,
        id: EntityId,
        type_id: ComponentId,
    ) -> EcsResult<Option<&mut [u8]>> {
        let record = self.locate(id)?;
        match self.find_block(record, type_id) {
            Some(block) => {
                let (at, len) = self.payload_range(block);
                Ok(Some(self.arena.slice_mut(at, len)))
            }
            None => Ok(None),
        }
    }

    /// Returns `true` if the entity carries `type_id`.
    ///
    /// # Errors
    ///
    /// Fails if the entity is unknown or tombstoned.
    pub fn has_component(&self, id: EntityId, type_id: ComponentId) -> EcsResult<bool> {
        let record = self.locate(id)?;
        Ok(self.find_block(record, type_id).is_some())
    }

    /// Tombstones a component in place, running `hook` on its payload first.
    ///
    /// The block keeps its size and becomes reusable by a later component no
    /// larger than it.
    ///
    /// # Errors
    ///
    /// Fails if the entity is unknown or tombstoned, or lacks `type_id`.
    pub fn remove_component(
        &mut self,
        id: EntityId,
        type_id: ComponentId,
        hook: Option<RemoveHook>,
    ) -> EcsResult<()> {
        let record = self.locate(id)?;
        let block = self
            .find_block(record, type_id)
            .ok_or_else(|| EcsError::MissingComponent {
                entity: id,
                component: type_label(u64::from(type_id)),
            })?;

        let (at, len) = self.payload_range(block);
        if let Some(hook) = hook {
            hook(self.arena.slice(at, len));
        }

        let type_width = self.layout.type_id;
        let tombstone = self.layout.tombstone_id();
        let id_at = block.offset + self.layout.component_length.bytes();
        type_width.write_unsigned(self.arena.slice_mut(id_at, type_width.bytes()), tombstone);
        self.arena.zero(at, len);
        self.dead_bytes += block.len;
        Ok(())
    }

    /// Tombstones a whole entity record.
    ///
    /// Removal hooks registered in `registry` run for every live component
    /// first. The record keeps its place; no other offset moves.
    ///
    /// # Errors
    ///
    /// Fails if the entity is unknown or already tombstoned.
    pub fn invalidate_entity(&mut self, id: EntityId, registry: &ComponentRegistry) -> EcsResult<()> {
        let record = self.locate(id)?;
        let header = self.layout.component_header();
        let tombstone = self.layout.tombstone_id();

        let mut already_dead = 0;
        for block in self.blocks(record) {
            if block.type_id == tombstone {
                already_dead += block.len;
                continue;
            }
            let hook = registry
                .get(block.type_id as ComponentId)
                .and_then(|info| info.on_remove);
            if let Some(hook) = hook {
                hook(self.arena.slice(block.offset + header, block.len - header));
            }
        }

        let body = self.layout.entity_header();
        self.write_record_length(record.offset, -(record.len as i64));
        self.arena.zero(record.offset + body, record.len - body);
        self.dead_bytes += record.len - already_dead;
        self.live -= 1;
        tracing::debug!(entity = %id, bytes = record.len, "tombstoned packed record");
        Ok(())
    }

    /// Iterates an entity's live components as `(type id, payload)`.
    ///
    /// # Errors
    ///
    /// Fails if the entity is unknown or tombstoned.
    pub fn components(
        &self,
        id: EntityId,
    ) -> EcsResult<impl Iterator<Item = (ComponentId, &[u8])> + '_> {
        let record = self.locate(id)?;
        let tombstone = self.layout.tombstone_id();
        Ok(self
            .blocks(record)
            .filter(move |block| block.type_id != tombstone)
            .map(move |block| {
                let (at, len) = self.payload_range(block);
                (block.type_id as ComponentId, self.arena.slice(at, len))
            }))
    }

    /// Rewrites the arena without tombstoned records and blocks.
    ///
    /// Every offset is recomputed; nothing resolved before this call is valid
    /// after it. Returns the number of bytes reclaimed.
    pub fn compact(&mut self) -> usize {
        let before = self.arena.len();
        let tombstone = self.layout.tombstone_id();
        let entity_width = self.layout.entity_length;
        let mut out = Vec::with_capacity(before - self.dead_bytes);
        let mut slots = Vec::with_capacity(self.live);

        for slot in &self.slots {
            let len = self.record_length(slot.offset);
            if len < 0 {
                continue;
            }
            let record = Record {
                index: 0,
                offset: slot.offset,
                len: len.unsigned_abs() as usize,
            };

            let start = out.len();
            out.resize(start + entity_width.bytes(), 0);
            for block in self.blocks(record) {
                if block.type_id != tombstone {
                    out.extend_from_slice(self.arena.slice(block.offset, block.len));
                }
            }
            let new_len = (out.len() - start) as i64;
            entity_width.write_signed(&mut out[start..], new_len);
            slots.push(RecordSlot {
                id: slot.id,
                offset: start,
            });
        }

        self.arena.replace(out);
        self.slots = slots;
        self.dead_bytes = 0;
        let reclaimed = before - self.arena.len();
        tracing::debug!(reclaimed, live = self.live, "compacted packed store");
        self.debug_check_order();
        reclaimed
    }

    /// Share of the arena held by tombstones, in `0.0..=1.0`.
    #[must_use]
    pub fn waste_ratio(&self) -> f32 {
        if self.arena.is_empty() {
            0.0
        } else {
            self.dead_bytes as f32 / self.arena.len() as f32
        }
    }

    fn record_has(&self, offset: usize, component: Option<ComponentId>) -> bool {
        let len = self.record_length(offset);
        if len < 0 {
            return false;
        }
        let Some(component) = component else {
            return true;
        };
        let record = Record {
            index: 0,
            offset,
            len: len.unsigned_abs() as usize,
        };
        self.find_block(record, component).is_some()
    }
}

/// Ascending ids of live records, optionally filtered by component.
pub struct PackedIds<'a> {
    store: &'a PackedStore,
    slots: std::slice::Iter<'a, RecordSlot>,
    component: Option<ComponentId>,
}

impl Iterator for PackedIds<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        self.slots
            .by_ref()
            .find(|slot| self.store.record_has(slot.offset, self.component))
            .map(|slot| slot.id)
    }
}

impl Storage for PackedStore {
    type Ids<'a> = PackedIds<'a>;

    fn with_layout(layout: HeaderLayout) -> Self {
        Self::new(layout)
    }

    fn spawn(&mut self, id: EntityId) -> EcsResult<()> {
        self.create_entity(id)
    }

    fn despawn(&mut self, id: EntityId, registry: &ComponentRegistry) -> EcsResult<()> {
        self.invalidate_entity(id, registry)
    }

    fn contains_entity(&self, id: EntityId) -> bool {
        self.locate(id).is_ok()
    }

    fn entity_count(&self) -> usize {
        self.live
    }

    fn insert<C: Component>(&mut self, id: EntityId, value: C) -> EcsResult<()> {
        self.add_component(id, C::ID, bytemuck::bytes_of(&value))
            .map_err(|e| e.with_component_name(short_type_name::<C>()))
    }

    fn read<C: Component>(&self, id: EntityId) -> EcsResult<Option<C>> {
        Ok(self.component(id, C::ID)?.map(read_payload::<C>))
    }

    fn write<C: Component>(&mut self, id: EntityId, value: C) -> EcsResult<()> {
        let bytes = bytemuck::bytes_of(&value);
        let slot = self
            .component_mut(id, C::ID)?
            .ok_or_else(|| EcsError::MissingComponent {
                entity: id,
                component: short_type_name::<C>().into(),
            })?;
        slot[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn remove(&mut self, id: EntityId, info: &ComponentInfo) -> EcsResult<()> {
        self.remove_component(id, info.id, info.on_remove)
            .map_err(|e| e.with_component_name(info.name))
    }

    fn contains(&self, id: EntityId, component: ComponentId) -> EcsResult<bool> {
        self.has_component(id, component)
    }

    fn raw(&self, id: EntityId, component: ComponentId) -> EcsResult<Option<&[u8]>> {
        self.component(id, component)
    }

    fn entity_ids(&self) -> Self::Ids<'_> {
        PackedIds {
            store: self,
            slots: self.slots.iter(),
            component: None,
        }
    }

    fn ids_with(&self, component: ComponentId) -> Self::Ids<'_> {
        PackedIds {
            store: self,
            slots: self.slots.iter(),
            component: Some(component),
        }
    }

    fn waste_ratio(&self) -> f32 {
        PackedStore::waste_ratio(self)
    }

    fn compact(&mut self) -> usize {
        PackedStore::compact(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Width;
    use bytemuck::{Pod, Zeroable};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Health(u32);
    impl Component for Health {
        const ID: ComponentId = 1;
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Speed(f32);
    impl Component for Speed {
        const ID: ComponentId = 2;
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Mana(u32);
    impl Component for Mana {
        const ID: ComponentId = 3;
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Wide(u64);
    impl Component for Wide {
        const ID: ComponentId = 4;
    }

    #[derive(Clone, Copy, Pod, Zeroable)]
    #[repr(C)]
    struct Blob([u8; 60]);
    impl Component for Blob {
        const ID: ComponentId = 5;
    }

    fn e(raw: u64) -> EntityId {
        EntityId::new(raw)
    }

    fn narrow() -> HeaderLayout {
        HeaderLayout {
            entity_length: Width::U8,
            component_length: Width::U8,
            type_id: Width::U8,
        }
    }

    #[test]
    fn test_byte_exact_layout() {
        let mut store = PackedStore::default();
        store.create_entity(e(0)).unwrap();
        assert_eq!(store.as_bytes(), &[4, 0, 0, 0]);

        store.insert(e(0), Health(7)).unwrap();
        let mut expected = vec![14, 0, 0, 0, 10, 0, 0, 0, 1, 0];
        expected.extend_from_slice(&7u32.to_ne_bytes());
        assert_eq!(store.as_bytes(), &expected[..]);

        store.create_entity(e(1)).unwrap();
        expected.extend_from_slice(&[4, 0, 0, 0]);
        assert_eq!(store.as_bytes(), &expected[..]);
    }

    #[test]
    fn test_insert_shifts_later_records() {
        let mut store = PackedStore::default();
        for raw in 0..3 {
            store.create_entity(e(raw)).unwrap();
        }
        store.insert(e(2), Health(2)).unwrap();
        store.insert(e(0), Speed(0.5)).unwrap();
        store.insert(e(1), Health(1)).unwrap();

        assert_eq!(store.read::<Health>(e(2)).unwrap(), Some(Health(2)));
        assert_eq!(store.read::<Health>(e(1)).unwrap(), Some(Health(1)));
        assert_eq!(store.read::<Speed>(e(0)).unwrap(), Some(Speed(0.5)));
        assert_eq!(store.read::<Health>(e(0)).unwrap(), None);
    }

    #[test]
    fn test_has_after_add_and_remove() {
        let mut store = PackedStore::default();
        store.create_entity(e(0)).unwrap();
        store.insert(e(0), Health(1)).unwrap();
        store.insert(e(0), Speed(2.0)).unwrap();
        assert!(store.has_component(e(0), Health::ID).unwrap());

        let info = ComponentInfo::of::<Health>();
        store.remove(e(0), &info).unwrap();
        assert!(!store.has_component(e(0), Health::ID).unwrap());
        assert!(store.has_component(e(0), Speed::ID).unwrap());
        assert_eq!(
            store.remove(e(0), &info),
            Err(EcsError::MissingComponent {
                entity: e(0),
                component: "Health".into()
            })
        );
    }

    #[test]
    fn test_duplicate_component_rejected() {
        let mut store = PackedStore::default();
        store.create_entity(e(0)).unwrap();
        store.insert(e(0), Health(1)).unwrap();
        let err = store.insert(e(0), Health(2)).unwrap_err();
        assert_eq!(err.to_string(), "component 'Health' already exists for entity 0");

        let err = store.add_component(e(0), 1, &[0; 4]).unwrap_err();
        assert_eq!(err.to_string(), "component 'type #1' already exists for entity 0");
    }

    #[test]
    fn test_reuse_does_not_grow() {
        let mut store = PackedStore::default();
        store.create_entity(e(0)).unwrap();
        store.create_entity(e(1)).unwrap();
        store.insert(e(0), Health(1)).unwrap();
        store.insert(e(0), Speed(1.0)).unwrap();
        store.insert(e(1), Health(9)).unwrap();

        store.remove(e(0), &ComponentInfo::of::<Health>()).unwrap();
        let len = store.as_bytes().len();
        assert!(store.waste_ratio() > 0.0);

        store.insert(e(0), Mana(5)).unwrap();
        assert_eq!(store.as_bytes().len(), len);
        assert_eq!(store.dead_bytes(), 0);
        assert_eq!(store.read::<Mana>(e(0)).unwrap(), Some(Mana(5)));
        assert_eq!(store.read::<Health>(e(1)).unwrap(), Some(Health(9)));
    }

    #[test]
    fn test_undersized_slot_allocates_fresh() {
        let mut store = PackedStore::default();
        store.create_entity(e(0)).unwrap();
        store.insert(e(0), Health(1)).unwrap();
        store.remove(e(0), &ComponentInfo::of::<Health>()).unwrap();
        let len = store.as_bytes().len();
        let dead = store.dead_bytes();

        store.insert(e(0), Wide(77)).unwrap();
        assert_eq!(store.as_bytes().len(), len + 6 + 8);
        assert_eq!(store.dead_bytes(), dead);

        let reclaimed = store.compact();
        assert_eq!(reclaimed, dead);
        assert_eq!(store.read::<Wide>(e(0)).unwrap(), Some(Wide(77)));
        assert_eq!(store.waste_ratio(), 0.0);
    }

    #[test]
    fn test_reused_slot_keeps_capacity() {
        let mut store = PackedStore::default();
        store.create_entity(e(0)).unwrap();
        store.insert(e(0), Wide(u64::MAX)).unwrap();
        store.remove(e(0), &ComponentInfo::of::<Wide>()).unwrap();
        store.insert(e(0), Health(3)).unwrap();

        let payload = store.component(e(0), Health::ID).unwrap().unwrap();
        assert_eq!(payload.len(), 8);
        assert_eq!(store.read::<Health>(e(0)).unwrap(), Some(Health(3)));

        store.compact();
        assert_eq!(store.read::<Health>(e(0)).unwrap(), Some(Health(3)));
    }

    #[test]
    fn test_tombstoned_entity_fails() {
        let registry = ComponentRegistry::new();
        let mut store = PackedStore::default();
        store.create_entity(e(0)).unwrap();
        store.create_entity(e(1)).unwrap();
        store.insert(e(0), Health(1)).unwrap();
        store.insert(e(1), Health(2)).unwrap();

        store.invalidate_entity(e(0), &registry).unwrap();
        assert!(!store.contains_entity(e(0)));
        assert_eq!(store.entity_count(), 1);
        assert_eq!(store.read::<Health>(e(0)), Err(EcsError::EntityRemoved(e(0))));
        assert_eq!(store.insert(e(0), Speed(1.0)), Err(EcsError::EntityRemoved(e(0))));
        assert_eq!(
            store.invalidate_entity(e(0), &registry),
            Err(EcsError::EntityRemoved(e(0)))
        );
        assert_eq!(store.read::<Health>(e(1)).unwrap(), Some(Health(2)));

        store.compact();
        assert_eq!(store.read::<Health>(e(0)), Err(EcsError::EntityNotFound(e(0))));
        assert_eq!(store.entity_ids().collect::<Vec<_>>(), vec![e(1)]);
    }

    static REMOVED: AtomicUsize = AtomicUsize::new(0);

    fn count_removal(_bytes: &[u8]) {
        REMOVED.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_remove_hooks_run() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(ComponentInfo::of::<Mana>().on_remove(count_removal))
            .unwrap();
        let info = *registry.info_of::<Mana>().unwrap();

        let mut store = PackedStore::default();
        store.create_entity(e(0)).unwrap();
        store.create_entity(e(1)).unwrap();
        store.insert(e(0), Mana(1)).unwrap();
        store.insert(e(1), Mana(2)).unwrap();
        store.insert(e(1), Health(2)).unwrap();

        store.remove(e(0), &info).unwrap();
        store.invalidate_entity(e(1), &registry).unwrap();
        assert_eq!(REMOVED.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_header_overflow() {
        let mut store = PackedStore::new(narrow());
        store.create_entity(e(0)).unwrap();
        store.insert(e(0), Blob([1; 60])).unwrap();
        store.add_component(e(0), 6, &[2; 60]).unwrap();
        assert_eq!(
            store.add_component(e(0), 7, &[3; 60]),
            Err(EcsError::HeaderOverflow {
                field: HeaderField::EntityLength,
                value: 187,
                max: 127
            })
        );
        assert!(matches!(
            store.add_component(e(0), 8, &[0; 300]),
            Err(EcsError::HeaderOverflow {
                field: HeaderField::ComponentLength,
                ..
            })
        ));
        assert_eq!(
            store.add_component(e(0), 255, &[0; 1]),
            Err(EcsError::ReservedTypeId(255))
        );
        assert!(matches!(
            store.add_component(e(0), 300, &[0; 1]),
            Err(EcsError::HeaderOverflow {
                field: HeaderField::TypeId,
                ..
            })
        ));
    }

    #[test]
    fn test_ids_filtered_and_ascending() {
        let mut store = PackedStore::default();
        for raw in [4, 0, 2] {
            store.create_entity(e(raw)).unwrap();
        }
        store.insert(e(4), Health(4)).unwrap();
        store.insert(e(0), Health(0)).unwrap();
        store.insert(e(2), Speed(2.0)).unwrap();

        assert_eq!(store.entity_ids().collect::<Vec<_>>(), vec![e(0), e(2), e(4)]);
        assert_eq!(store.ids_with(Health::ID).collect::<Vec<_>>(), vec![e(0), e(4)]);
        let comps: Vec<_> = store.components(e(2)).unwrap().map(|(id, _)| id).collect();
        assert_eq!(comps, vec![Speed::ID]);
    }

    type Snapshot = Vec<(bool, Option<Health>, Option<Speed>, Option<Mana>, Option<Wide>)>;

    fn snapshot(store: &PackedStore, ids: u64) -> Snapshot {
        (0..ids)
            .map(|raw| {
                let id = e(raw);
                if !store.contains_entity(id) {
                    return (false, None, None, None, None);
                }
                (
                    true,
                    store.read::<Health>(id).unwrap(),
                    store.read::<Speed>(id).unwrap(),
                    store.read::<Mana>(id).unwrap(),
                    store.read::<Wide>(id).unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn test_compaction_preserves_queries() {
        let registry = ComponentRegistry::new();
        let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
        let mut store = PackedStore::default();
        const ENTITIES: u64 = 64;
        for raw in 0..ENTITIES {
            store.create_entity(e(raw)).unwrap();
        }

        for round in 0..8 {
            for _ in 0..400 {
                let id = e(rng.gen_range(0..ENTITIES));
                if !store.contains_entity(id) {
                    continue;
                }
                // errors here are expected (duplicates, missing)
                let _ = match rng.gen_range(0..10) {
                    0 => store.insert(id, Health(rng.gen())),
                    1 => store.insert(id, Speed(rng.gen())),
                    2 => store.insert(id, Mana(rng.gen())),
                    3 => store.insert(id, Wide(rng.gen())),
                    4 => store.remove(id, &ComponentInfo::of::<Health>()),
                    5 => store.remove(id, &ComponentInfo::of::<Speed>()),
                    6 => store.remove(id, &ComponentInfo::of::<Mana>()),
                    7 => store.remove(id, &ComponentInfo::of::<Wide>()),
                    8 => store.write(id, Health(round)),
                    _ if rng.gen_bool(0.05) => store.invalidate_entity(id, &registry),
                    _ => Ok(()),
                };
            }

            let before = snapshot(&store, ENTITIES);
            let ids_before: Vec<_> = store.ids_with(Mana::ID).collect();
            let live_before = store.entity_count();

            store.compact();

            assert_eq!(snapshot(&store, ENTITIES), before, "round {round}");
            assert_eq!(store.ids_with(Mana::ID).collect::<Vec<_>>(), ids_before);
            assert_eq!(store.entity_count(), live_before);
            assert_eq!(store.dead_bytes(), 0);
        }
    }
}
