// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod subscription;
pub mod user;
pub mod video;

pub use subscription::Subscription;
pub use user::{ChannelProfile, MediaAsset, PublicUser, User};
pub use video::{Video, VideoOwner, WatchHistoryVideo};
