use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use slab::Slab;

/// A shared-memory region holding many fixed-size slots, used for zero-copy
/// inter-worker packet delivery (spec.md §9, GLOSSARY "Cabinet / slot").
///
/// Unlike the teacher's single-threaded `rc::Alloc` (a `Cell`-refcounted
/// allocation confined to one worker), a `Cabinet` is shared by the workers
/// that route packets through it, so it is built on `Arc` + a real lock
/// rather than an interior `Cell`.
#[derive(Clone)]
pub struct Cabinet {
	id: u32,
	slots: Arc<Mutex<Slab<Arc<RwLock<Box<[u8]>>>>>>,
}

impl Cabinet {
	pub fn new(id: u32) -> Self {
		Self { id, slots: Arc::new(Mutex::new(Slab::new())) }
	}

	pub fn id(&self) -> u32 {
		self.id
	}

	/// Allocates a new slot holding `data`, returning a handle that frees the
	/// slot when the last clone is dropped.
	pub fn alloc(&self, data: Box<[u8]>) -> SlotHandle {
		let mut slots = self.slots.lock().expect("cabinet lock poisoned");
		let slot_id = slots.insert(Arc::new(RwLock::new(data))) as u32;

		SlotHandle {
			cabinet_id: self.id,
			slot_id,
			slots: self.slots.clone(),
			data: slots[slot_id as usize].clone(),
		}
	}

	/// Looks up a slot by id without taking ownership of a handle; used when
	/// reconstructing a [`SlotHandle`] from a wire-level `(cabinet_id,
	/// slot_id)` pair received from another worker.
	pub fn get(&self, slot_id: u32) -> Option<SlotHandle> {
		let slots = self.slots.lock().expect("cabinet lock poisoned");
		let data = slots.get(slot_id as usize)?.clone();

		Some(SlotHandle { cabinet_id: self.id, slot_id, slots: self.slots.clone(), data })
	}
}

/// A handle to one slot in a [`Cabinet`]. Dropping the last handle to a slot
/// returns it to the cabinet's free list (spec.md §9: "Drop on the handle
/// returns the slot").
#[derive(Clone)]
pub struct SlotHandle {
	cabinet_id: u32,
	slot_id: u32,
	slots: Arc<Mutex<Slab<Arc<RwLock<Box<[u8]>>>>>>,
	data: Arc<RwLock<Box<[u8]>>>,
}

impl SlotHandle {
	pub fn cabinet_id(&self) -> u32 {
		self.cabinet_id
	}

	pub fn slot_id(&self) -> u32 {
		self.slot_id
	}

	/// Acquires the slot's read lock before reading its payload (spec.md §4.2,
	/// §5: "before reading fields, acquire read").
	pub fn read(&self) -> RwLockReadGuard<'_, Box<[u8]>> {
		self.data.read().expect("slot lock poisoned")
	}

	/// Acquires the slot's write lock; only the worker that owns the slot at
	/// handoff time should call this (spec.md §5: "only the owning worker ever
	/// does this, before handing off").
	pub fn write(&self) -> RwLockWriteGuard<'_, Box<[u8]>> {
		self.data.write().expect("slot lock poisoned")
	}
}

impl Drop for SlotHandle {
	fn drop(&mut self) {
		// Arc::strong_count includes this handle's own reference plus the copy
		// stored in the slab; once no other handle or the slab entry alone
		// remains, reclaim the slot.
		if Arc::strong_count(&self.data) <= 2 {
			let mut slots = self.slots.lock().expect("cabinet lock poisoned");
			if slots.contains(self.slot_id as usize) {
				slots.remove(self.slot_id as usize);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn alloc_and_read_back() {
		let cabinet = Cabinet::new(1);
		let handle = cabinet.alloc(vec![1, 2, 3].into_boxed_slice());

		assert_eq!(&*handle.read(), &[1, 2, 3]);
		assert_eq!(handle.cabinet_id(), 1);
	}

	#[test]
	fn slot_is_reclaimed_after_last_drop() {
		let cabinet = Cabinet::new(1);
		let handle = cabinet.alloc(vec![9].into_boxed_slice());
		let slot_id = handle.slot_id();

		drop(handle);

		assert!(cabinet.get(slot_id).is_none());
	}

	#[test]
	fn clone_keeps_slot_alive() {
		let cabinet = Cabinet::new(1);
		let handle = cabinet.alloc(vec![9].into_boxed_slice());
		let clone = handle.clone();
		let slot_id = handle.slot_id();

		drop(handle);
		assert!(cabinet.get(slot_id).is_some());

		drop(clone);
		assert!(cabinet.get(slot_id).is_none());
	}
}
