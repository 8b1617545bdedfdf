//! Frame-stepped cooperative task runtime.
//!
//! Simulation behavior is written as long-running tasks: `async` bodies that
//! suspend across frames while the entities they care about come and go.
//! The [`Runtime`] advances every live task once per frame in creation
//! order, couples task lifetimes into trees so canceling a parent cancels
//! its children, and lets tasks synchronize on events.
//!
//! # Example
//!
//! ```
//! use skein_engine::{Runtime, RuntimeConfig};
//!
//! let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
//! let ticks = std::rc::Rc::new(std::cell::Cell::new(0));
//! let seen = ticks.clone();
//! rt.invoke_with("ticker", (), move |ctx, _| async move {
//!     loop {
//!         seen.set(seen.get() + 1);
//!         ctx.wait(2).await;
//!     }
//! });
//! for _ in 0..4 {
//!     rt.run_frame();
//! }
//! // Ran at creation (frame 0), then on frames 2 and 4.
//! assert_eq!(ticks.get(), 3);
//! ```
//!
//! # Threading
//!
//! Everything is single-threaded: the runtime is `!Send` and every task
//! runs on the thread that calls [`Runtime::run_frame`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod event;
pub mod metrics;
pub mod runtime;
mod sched;
mod state;
pub mod task;
mod trace;
mod tree;
pub mod wait;
pub mod world;

pub use config::{ConfigError, RuntimeConfig};
pub use context::TaskContext;
pub use event::{EventKind, EventSnapshot, EventStatus, WaitOutcome};
pub use metrics::{FrameMetrics, RuntimeStats};
pub use runtime::Runtime;
pub use task::{ArgBlock, TaskDef, Termination};
pub use world::World;

pub use skein_core::{EventId, FrameId, TaskHandle};
