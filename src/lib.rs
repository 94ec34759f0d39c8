//! CineMatch - collaborative movie voting sessions
//!
//! Participants join a short-lived session by code, vote like or dislike on
//! movies from a shared catalog, and are told when enough of them like the
//! same movie.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
