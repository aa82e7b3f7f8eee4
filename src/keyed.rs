//! Keyed reconciler: diffs child lists by key so that reordered children are moved rather than recreated.
//!
//! This is a single left-to-right pass with one element of look-ahead on each side.
//! It recognizes single insertions, removals, replacements and swaps of neighbours.
//! Anything more involved falls through to removing the remaining old children and appending the remaining new ones,
//! where the shared key map still turns a removal and an insertion of the same key into one move.

use crate::{
	diff::diff_help,
	node::Node,
	patch::{EntryState, KeyedEntry, KeyedInsert, Patch, PatchKind, Reorder, SharedEntry},
};
use core::cell::RefCell;
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{trace, trace_span};

/// Appended to a key that occurs more than once in the same list.
pub const DUPLICATE_KEY_SUFFIX: &str = "\u{27C2}dup";

struct Reconciler<Msg> {
	changes: HashMap<String, SharedEntry<Msg>>,
	local: Vec<Patch<Msg>>,
	inserts: Vec<KeyedInsert<Msg>>,
	end_inserts: Vec<SharedEntry<Msg>>,
}

pub(crate) fn diff_keyed_kids<Msg: 'static>(old: &[(String, Node<Msg>)], new: &[(String, Node<Msg>)], patches: &mut Vec<Patch<Msg>>, root_index: usize) {
	let span = trace_span!("Diffing keyed children", root_index, old.len = old.len(), new.len = new.len());
	let _enter = span.enter();

	let mut reconciler = Reconciler {
		changes: HashMap::new(),
		local: Vec::new(),
		inserts: Vec::new(),
		end_inserts: Vec::new(),
	};

	let mut old_index = 0;
	let mut new_index = 0;
	let mut index = root_index;

	while old_index < old.len() && new_index < new.len() {
		let (old_key, old_node) = &old[old_index];
		let (new_key, new_node) = &new[new_index];

		if old_key == new_key {
			index += 1;
			diff_help(old_node, new_node, &mut reconciler.local, index);
			index += old_node.subtree_size();
			old_index += 1;
			new_index += 1;
			continue;
		}

		let old_next = old.get(old_index + 1);
		let new_next = new.get(new_index + 1);
		// The old child moved one to the right.
		let new_match = new_next.map_or(false, |(new_next_key, _)| new_next_key == old_key);
		// The new child was one to the right.
		let old_match = old_next.map_or(false, |(old_next_key, _)| old_next_key == new_key);

		match (old_next, new_next) {
			(Some((_, old_next_node)), Some((_, new_next_node))) if new_match && old_match => {
				trace!("Swap at {}", new_index);
				index += 1;
				diff_help(old_node, new_next_node, &mut reconciler.local, index);
				reconciler.insert_node(new_key, new_node, Some(new_index));
				index += old_node.subtree_size();

				index += 1;
				reconciler.remove_node(new_key, old_next_node, index);
				index += old_next_node.subtree_size();

				old_index += 2;
				new_index += 2;
			}

			(_, Some((_, new_next_node))) if new_match => {
				trace!("Insertion at {}", new_index);
				index += 1;
				reconciler.insert_node(new_key, new_node, Some(new_index));
				diff_help(old_node, new_next_node, &mut reconciler.local, index);
				index += old_node.subtree_size();

				old_index += 1;
				new_index += 2;
			}

			(Some((_, old_next_node)), _) if old_match => {
				trace!("Removal at {}", old_index);
				index += 1;
				reconciler.remove_node(old_key, old_node, index);
				index += old_node.subtree_size();

				index += 1;
				diff_help(old_next_node, new_node, &mut reconciler.local, index);
				index += old_next_node.subtree_size();

				old_index += 2;
				new_index += 1;
			}

			(Some((old_next_key, old_next_node)), Some((new_next_key, new_next_node))) if old_next_key == new_next_key => {
				trace!("Replacement at {}", new_index);
				index += 1;
				reconciler.remove_node(old_key, old_node, index);
				reconciler.insert_node(new_key, new_node, Some(new_index));
				index += old_node.subtree_size();

				index += 1;
				diff_help(old_next_node, new_next_node, &mut reconciler.local, index);
				index += old_next_node.subtree_size();

				old_index += 2;
				new_index += 2;
			}

			_ => break,
		}
	}

	for (old_key, old_node) in &old[old_index..] {
		index += 1;
		reconciler.remove_node(old_key, old_node, index);
		index += old_node.subtree_size();
	}

	for (new_key, new_node) in &new[new_index..] {
		reconciler.insert_node(new_key, new_node, None);
	}

	let Reconciler { local, inserts, end_inserts, .. } = reconciler;
	if !local.is_empty() || !inserts.is_empty() || !end_inserts.is_empty() {
		patches.push(Patch::new(root_index, PatchKind::KeyedReorder(Reorder { local, inserts, end_inserts })));
	}
}

impl<Msg: 'static> Reconciler<Msg> {
	/// Records `node` as inserted under `key`, at `new_index` or (for `None`) at the end.
	fn insert_node(&mut self, key: &str, node: &Node<Msg>, new_index: Option<usize>) {
		let entry = match self.changes.get(key) {
			Some(entry) => Rc::clone(entry),
			None => {
				let entry = Rc::new(RefCell::new(KeyedEntry {
					key: key.to_owned(),
					state: EntryState::Inserted,
					node: node.clone(),
					removed_at: None,
					patches: Vec::new(),
					live: None,
				}));
				self.push_insert(new_index, Rc::clone(&entry));
				self.changes.insert(key.to_owned(), entry);
				return;
			}
		};

		let state = entry.borrow().state;
		match state {
			EntryState::Removed => {
				trace!("Key {:?} moved.", key);
				self.push_insert(new_index, Rc::clone(&entry));
				let mut entry = entry.borrow_mut();
				let old_node = entry.node.clone();
				let mut sub_patches = Vec::new();
				diff_help(&old_node, node, &mut sub_patches, entry.removed_at.unwrap_or_default());
				entry.state = EntryState::Moved;
				entry.node = node.clone();
				entry.patches = sub_patches;
			}
			EntryState::Inserted | EntryState::Moved => {
				trace!("Duplicate key {:?} inserted.", key);
				self.insert_node(&format!("{}{}", key, DUPLICATE_KEY_SUFFIX), node, new_index);
			}
		}
	}

	/// Records the old `node` at abstract `index` as removed from under `key`.
	fn remove_node(&mut self, key: &str, node: &Node<Msg>, index: usize) {
		let entry = match self.changes.get(key) {
			Some(entry) => Rc::clone(entry),
			None => {
				let entry = Rc::new(RefCell::new(KeyedEntry {
					key: key.to_owned(),
					state: EntryState::Removed,
					node: node.clone(),
					removed_at: Some(index),
					patches: Vec::new(),
					live: None,
				}));
				self.local.push(Patch::new(index, PatchKind::RemoveKeyedNode(Rc::clone(&entry))));
				self.changes.insert(key.to_owned(), entry);
				return;
			}
		};

		let state = entry.borrow().state;
		match state {
			EntryState::Inserted => {
				trace!("Key {:?} moved.", key);
				{
					let mut entry = entry.borrow_mut();
					let new_node = entry.node.clone();
					let mut sub_patches = Vec::new();
					diff_help(node, &new_node, &mut sub_patches, index);
					entry.state = EntryState::Moved;
					entry.removed_at = Some(index);
					entry.patches = sub_patches;
				}
				self.local.push(Patch::new(index, PatchKind::RemoveKeyedNode(entry)));
			}
			EntryState::Removed | EntryState::Moved => {
				trace!("Duplicate key {:?} removed.", key);
				self.remove_node(&format!("{}{}", key, DUPLICATE_KEY_SUFFIX), node, index);
			}
		}
	}

	fn push_insert(&mut self, new_index: Option<usize>, entry: SharedEntry<Msg>) {
		match new_index {
			Some(index) => self.inserts.push(KeyedInsert { index, entry }),
			None => self.end_inserts.push(entry),
		}
	}
}
