#![forbid(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(forbidden_lint_groups)]

#[macro_use]
extern crate tracing;

pub mod account;
pub mod community;
pub mod context;
pub mod search;
pub mod upload;
pub mod url;

pub use self::context::Context;

/// Number of results the search and the popular communities listing are capped at
pub const DEFAULT_RESULT_LIMIT: usize = 5;
