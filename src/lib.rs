#![doc(html_root_url = "https://docs.rs/xylem-dom/0.1.0")]
#![warn(clippy::pedantic)]

//! A virtual DOM reconciler.
//!
//! [`diff`] compares two immutable [`Node`] trees and produces index-addressed [`Patch`](`patch::Patch`)es,
//! [`resolve_targets`] finds the live nodes they apply to, and [`apply`] carries them out on a [`Host`].
//! [`Reconciler`] runs that cycle for you.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod apply;
mod closure_map;
pub mod diff;
pub mod event;
pub mod facts;
pub mod host;
pub mod index;
mod keyed;
pub mod load;
pub mod memory;
pub mod node;
pub mod patch;
mod reconciler;
pub mod render;
mod sanitize;
pub mod web;

pub use crate::{
	apply::apply,
	diff::diff,
	event::{EventNode, Handler, Message},
	facts::{Fact, Facts, Value},
	host::Host,
	index::resolve_targets,
	node::{Key, Node, Widget},
	reconciler::Reconciler,
	render::render,
};
