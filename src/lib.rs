//! Skynote - Social reading platform backend
//!
//! This library provides the core functionality behind the Skynote API:
//! reviews and posts about books, follows, reading logs, achievements,
//! notifications, moderation and quizzes.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
