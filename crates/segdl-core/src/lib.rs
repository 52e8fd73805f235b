pub mod config;
pub mod logging;

// Core modules, leaf-first: invocation engine, then acquisition, then scheduling.
pub mod acquire;
pub mod control;
pub mod invoke;
pub mod manifest;
pub mod paths;
pub mod probe;
pub mod resolve;
pub mod scheduler;
