// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! ClipTube accounts: registration, sessions, and channel profiles
//!
//! This crate provides the user-account backend for the ClipTube
//! video-sharing platform: registration with media upload, JWT
//! access/refresh session lifecycle, and the channel/watch-history
//! aggregation reads.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{MediaService, TokenService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub media: MediaService,
    pub tokens: TokenService,
}
