//! Course definitions for Parkforge.
//!
//! This crate holds the immutable description of an obstacle course and the
//! identity types every other layer shares:
//!
//! - **Types** ([`PlayerId`], [`Location`], [`ItemStack`]): the small value
//!   types passed between the engine and the host world.
//! - **Course** ([`Course`], [`Checkpoint`], [`ParkourMode`]): checkpoints,
//!   limits, rewards, and the behavioral mode of a course.
//! - **Catalog** ([`CourseRegistry`] trait, [`CourseCatalog`]): where courses
//!   are looked up by name.
//!
//! # Architecture
//!
//! ```text
//! Engine (progression) → Session (live progress) → Course (this crate, read-only)
//! ```
//!
//! A course never changes after it is loaded. Sessions hold it behind an
//! `Arc` so any number of players can share one definition.

mod catalog;
mod course;
mod error;
mod types;

pub use catalog::{CourseCatalog, CourseRegistry};
pub use course::{Checkpoint, Course, CourseRewards, CourseSettings, ParkourMode};
pub use error::CourseError;
pub use types::{ItemStack, Location, PlayerId};
