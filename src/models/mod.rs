// SPDX-License-Identifier: MIT

//! Data models for the pipeline.

pub mod activity;
pub mod bookkeeping;
pub mod leader;
pub mod place;

pub use activity::{Activity, ActivityDraft};
pub use bookkeeping::{Bookkeeping, Stage, StageStatus};
pub use leader::Leader;
pub use place::Place;
