#![warn(clippy::perf)]
#![allow(clippy::type_complexity)]
#![doc = include_str!("../README.md")]

//! ## Sources
//!
//! [range], [from_iter], [create] and [defer] build cold observables: each
//! subscription runs independently and sees the whole sequence.  [Subject]
//! is hot, it broadcasts to whoever is subscribed at the time and keeps
//! nothing but its terminal notification.
//!
//! Sources that could deliver synchronously take a [Delivery].  There is no
//! ambient scheduler; pass [Delivery::On] to move delivery onto one.
//!
//! ```rust
//! use rivulet::*;
//!
//! let scheduler = VirtualTimeScheduler::new();
//! let recorder = Recorder::new();
//! range(1, 3, Delivery::on(&scheduler))
//!     .unwrap()
//!     .subscribe(recorder.clone());
//! assert!(recorder.is_empty());
//! scheduler.start().unwrap();
//! assert_eq!(recorder.values(), vec![1, 2, 3]);
//! ```
//!
//! ## Real time vs virtual time
//!
//! [RealTimeScheduler] waits on a dedicated timer thread and runs due work
//! on an [Executor], by default that same thread.  [VirtualTimeScheduler]
//! runs nothing until it is advanced, then runs every due action on the
//! calling thread in (due time, schedule order).  The same pipeline can be
//! driven by either, so time dependent logic is tested without sleeping.
//!
//! ```rust
//! use rivulet::*;
//! use std::time::Duration;
//!
//! let scheduler = VirtualTimeScheduler::new();
//! let recorder = Recorder::with_scheduler(&scheduler);
//! timer(Duration::from_secs(60), &scheduler).subscribe(recorder.clone());
//! scheduler.advance_by(Duration::from_secs(60)).unwrap();
//! assert_eq!(recorder.records()[0].time, NanoTime::from(Duration::from_secs(60)));
//! assert!(recorder.is_completed());
//! ```
//!
//! ## Delivery guarantees
//!
//! Each subscription is fronted by a [Sink].  Observers never see two
//! callbacks at once, never see anything after `on_error` or
//! `on_completed`, and the subscription's resources are released as soon
//! as it terminates.

#[macro_use]
extern crate log;
extern crate derive_new;

mod disposable;
mod error;
mod notification;
mod observer;
mod queue;
mod scheduler;
mod sources;
mod testing;
mod time;
mod types;

pub use error::*;
pub use observer::*;
pub use queue::ValueAt;
pub use scheduler::*;
pub use sources::*;
pub use testing::*;
pub use types::*;
