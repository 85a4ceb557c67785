// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod media;
pub mod token;

pub use media::{MediaService, MediaUpload};
pub use token::{AccessClaims, RefreshClaims, TokenPair, TokenService};
