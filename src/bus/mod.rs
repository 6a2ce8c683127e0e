//! Typed command dispatch table with a composable middleware chain.

pub mod command_bus;

pub use command_bus::{
    logging_middleware, BusError, CommandBus, CommandEnvelope, Handler, Middleware, Next,
};
