// engine module: board engine running on its own thread

mod interface;
mod runner;

pub use interface::{Engine, EngineHandle, Event, Request};
pub use runner::BoardEngine;
