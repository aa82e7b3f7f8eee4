//! Differ: compares two abstract trees and produces positional [`Patch`]es against the old one.
//!
//! Indices count the old tree's nodes in pre-order, starting with 0 for the root.
//! Each child is 1 past the end of its preceding sibling's subtree (see [`Node::subtree_size`]),
//! and the contents of a [`Thunk`](`crate::node::Thunk`) are indexed separately inside [`PatchKind::DescendIntoThunk`].

use crate::{
	facts::diff_facts,
	keyed::diff_keyed_kids,
	node::{same_tagger, Element, Node, NodeKind},
	patch::{Patch, PatchKind},
};
use tracing::{instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

/// Computes the patches that turn `old` into `new`, in ascending index order.
///
/// `old` must be the tree that is currently rendered, since thunks take over its cached contents.
#[instrument(skip_all)]
pub fn diff<Msg: 'static>(old: &Node<Msg>, new: &Node<Msg>) -> Vec<Patch<Msg>> {
	let mut patches = Vec::new();
	diff_help(old, new, &mut patches, 0);
	trace!("Produced {} top-level patch(es).", patches.len());
	patches
}

pub(crate) fn diff_help<Msg: 'static>(old: &Node<Msg>, new: &Node<Msg>, patches: &mut Vec<Patch<Msg>>, index: usize) {
	if Node::ptr_eq(old, new) {
		return;
	}

	match (old.kind(), new.kind()) {
		(NodeKind::Thunk(old_thunk), NodeKind::Thunk(new_thunk)) => {
			let span = trace_span!("Diffing thunk", index);
			let _enter = span.enter();
			if old_thunk.same_refs(new_thunk) {
				new_thunk.reuse(old_thunk);
				return;
			}
			let mut sub_patches = Vec::new();
			diff_help(&old_thunk.force(), &new_thunk.force(), &mut sub_patches, 0);
			if !sub_patches.is_empty() {
				patches.push(Patch::new(index, PatchKind::DescendIntoThunk(sub_patches)));
			}
		}

		(NodeKind::Tagged(old_tagged), NodeKind::Tagged(new_tagged)) => {
			let (old_taggers, old_inner) = old_tagged.unwrap_chain();
			let (new_taggers, new_inner) = new_tagged.unwrap_chain();
			let span = trace_span!("Diffing tagged node", index, old_taggers = old_taggers.len(), new_taggers = new_taggers.len());
			let _enter = span.enter();

			if old_taggers.len() != new_taggers.len() {
				patches.push(Patch::new(index, PatchKind::Replace(new.clone())));
				return;
			}
			if !old_taggers.iter().zip(&new_taggers).all(|(old, new)| same_tagger(old, new)) {
				patches.push(Patch::new(index, PatchKind::RetagTaggers(new_taggers)));
			}
			diff_help(old_inner, new_inner, patches, index + 1);
		}

		(NodeKind::Text(old_text), NodeKind::Text(new_text)) => {
			if old_text != new_text {
				patches.push(Patch::new(index, PatchKind::SetText(new_text.clone())));
			}
		}

		(NodeKind::Element(old_element), NodeKind::Element(new_element)) => {
			if diff_element(old_element, new_element, new, patches, index) {
				diff_kids(old_element.children(), new_element.children(), patches, index);
			}
		}

		// Mixed keyed and unkeyed elements are compared without keys.
		(NodeKind::Element(old_element), NodeKind::KeyedElement(new_element)) => {
			if diff_element(old_element, new_element, new, patches, index) {
				diff_kids(old_element.children(), &new_element.nodes(), patches, index);
			}
		}
		(NodeKind::KeyedElement(old_element), NodeKind::Element(new_element)) => {
			if diff_element(old_element, new_element, new, patches, index) {
				diff_kids(&old_element.nodes(), new_element.children(), patches, index);
			}
		}

		(NodeKind::KeyedElement(old_element), NodeKind::KeyedElement(new_element)) => {
			if diff_element(old_element, new_element, new, patches, index) {
				diff_keyed_kids(old_element.children(), new_element.children(), patches, index);
			}
		}

		(NodeKind::Custom(old_custom), NodeKind::Custom(new_custom)) => {
			let span = trace_span!("Diffing custom node", index);
			let _enter = span.enter();
			if !old_custom.same_widget(new_custom) {
				patches.push(Patch::new(index, PatchKind::Replace(new.clone())));
				return;
			}
			if let Some(facts_diff) = diff_facts(old_custom.facts(), new_custom.facts()) {
				patches.push(Patch::new(index, PatchKind::UpdateFacts(facts_diff)));
			}
			if let Some(custom_patch) = old_custom.diff(new_custom) {
				patches.push(Patch::new(index, PatchKind::CustomUpdate(custom_patch)));
			}
		}

		_ => patches.push(Patch::new(index, PatchKind::Replace(new.clone()))),
	}
}

/// Diffs the element itself. Returns whether its children should be diffed too.
fn diff_element<Msg: 'static, C, D>(old: &Element<Msg, C>, new: &Element<Msg, D>, new_node: &Node<Msg>, patches: &mut Vec<Patch<Msg>>, index: usize) -> bool {
	let span = trace_span!("Diffing element", index, old_tag = old.tag(), new_tag = new.tag());
	let _enter = span.enter();

	if !old.same_identity(new) {
		patches.push(Patch::new(index, PatchKind::Replace(new_node.clone())));
		return false;
	}
	if let Some(facts_diff) = diff_facts(old.facts(), new.facts()) {
		patches.push(Patch::new(index, PatchKind::UpdateFacts(facts_diff)));
	}
	true
}

fn diff_kids<Msg: 'static>(old: &[Node<Msg>], new: &[Node<Msg>], patches: &mut Vec<Patch<Msg>>, mut index: usize) {
	if old.len() > new.len() {
		patches.push(Patch::new(
			index,
			PatchKind::TrimTrailingChildren {
				keep: new.len(),
				remove: old.len() - new.len(),
			},
		));
	} else if old.len() < new.len() {
		patches.push(Patch::new(
			index,
			PatchKind::AppendChildren {
				from: old.len(),
				children: new[old.len()..].to_vec(),
			},
		));
	}

	if STATIC_MAX_LEVEL >= Level::WARN && old.len().max(new.len()) >= 1000 && old.len() != new.len() {
		warn!(
			"Resizing a long unkeyed child list ({} -> {}).\n\
			Consider a keyed element if children are inserted or removed other than at the end.",
			old.len(),
			new.len()
		);
	}

	for (old_kid, new_kid) in old.iter().zip(new) {
		index += 1;
		diff_help(old_kid, new_kid, patches, index);
		index += old_kid.subtree_size();
	}
}
