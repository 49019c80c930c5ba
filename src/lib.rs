// SPDX-License-Identifier: MIT

//! Trip-Herald: announce newly listed outdoor activities to Discord.
//!
//! This crate implements the discovery pipeline: search-results pages are
//! scanned for activity listings, detail pages are scraped into structured
//! records, and each genuinely-new activity is announced once to a Discord
//! channel. Stages run as independent Cloud Tasks invocations; all shared
//! state lives in Firestore.

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::FirestoreDb;
use services::{DiscordClient, SourceClient, TasksService};

/// Shared application state.
///
/// Every dependency is constructed once at startup and passed in explicitly,
/// so stage handlers can be exercised with fakes in tests.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub source: SourceClient,
    pub tasks_service: TasksService,
    pub discord: DiscordClient,
}
