// Pedantic: suppress noise for internal crate code.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]

pub mod board;
pub mod column;
pub mod config;
pub mod engine;
pub mod git;
pub mod listing;
pub mod lock;
pub mod notify;
pub mod ops;
pub mod project;
pub mod render;
pub mod table;
