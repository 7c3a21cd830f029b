//! # pagesum
//!
//! A URL summarization service with asynchronous background processing.
//!
//! Submitting a URL creates a persisted record immediately; a background
//! worker fetches the page, produces a summary through a pluggable
//! provider, and fills the record in asynchronously. Clients poll the
//! record to observe completion.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌───────────┐
//! │   HTTP   │──▶│ Job queue │──▶│  Worker    │
//! │  (axum)  │   │ (bounded) │   │ summarize │
//! └────┬─────┘   └───────────┘   └─────┬─────┘
//!      │                               │
//!      └────────────▶ SQLite ◀─────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pagesum init                  # create database
//! pagesum serve                 # start HTTP server + worker
//! pagesum stats                 # record counts by status
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`crud`] | Database operations on summary records |
//! | [`extract`] | Page fetching and HTML-to-text extraction |
//! | [`summarizer`] | Summarizer provider abstraction |
//! | [`worker`] | Background job queue and worker |
//! | [`server`] | JSON HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`stats`] | Database statistics overview |

pub mod config;
pub mod crud;
pub mod db;
pub mod extract;
pub mod migrate;
pub mod models;
pub mod server;
pub mod stats;
pub mod summarizer;
pub mod worker;
