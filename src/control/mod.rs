//! Control plane: serialized dispatch of start/pause/stop intents.

pub mod dispatcher;

pub use dispatcher::CommandDispatcher;
