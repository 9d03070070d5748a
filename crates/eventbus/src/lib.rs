//! # flowcore-eventbus
//!
//! Live broadcast: fans out execution/node/log events to subscribed
//! listeners per execution, plus a global channel for start/complete
//! (spec §4.6). Best-effort — a slow listener is dropped from, never
//! blocks, the scheduler.

pub mod bus;
pub mod event;

pub use bus::EventBus;
pub use event::ExecutionEvent;
