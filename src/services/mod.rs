// SPDX-License-Identifier: MIT

//! Services module - pipeline stages and external clients.

pub mod discord;
pub mod pipeline;
pub mod source;
pub mod tasks;

pub use discord::DiscordClient;
pub use source::SourceClient;
pub use tasks::TasksService;
