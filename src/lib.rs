//! A virtual DOM reconciler.
//!
//! Views are [`Node`] trees, rebuilt every render cycle. A [`RenderSession`] diffs each new tree against the previous one,
//! resolves the resulting [`Patch`]es to live nodes and applies them through a [`Dom`] display surface:
//! [`MemoryDom`] headlessly or [`WebDom`] in a browser.

#![doc(html_root_url = "https://docs.rs/twig-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod apply;
pub mod diff;
pub mod dom;
pub mod error;
pub mod event;
pub mod facts;
pub mod index;
pub mod keyed;
pub mod load;
pub mod memory;
pub mod node;
pub mod patch;
pub mod render;
pub mod session;
pub mod web;

pub use crate::{
	apply::apply,
	diff::diff,
	dom::{Dom, EventFlags, LiveNode, NodeId},
	error::{Error, Result},
	event::{CustomEvent, Decoder, EventNode, Handler},
	facts::Fact,
	index::{resolve, IndexStats},
	memory::MemoryDom,
	node::{Node, Tagger, Widget},
	patch::{Patch, PatchKind},
	render::render,
	session::{CycleStats, RenderSession},
	web::WebDom,
};
