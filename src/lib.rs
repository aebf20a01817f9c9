//! # Docsense
//!
//! A context-aware documentation suggestion engine for operations teams.
//!
//! Docsense ingests context events from monitored subjects (commands, file
//! changes, process and network snapshots, log lines), distills them into a
//! weighted keyword vector, and ranks a documentation corpus against that
//! vector — combining full-text search scores with rule-based matches —
//! to surface the runbooks an operator most likely needs right now.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌───────────┐
//! │ Context      │──▶│ Extract +     │──▶│  SQLite    │
//! │ events       │   │ Vector + Rank │   │ FTS5 corpus│
//! └──────┬───────┘   └───────┬───────┘   └───────────┘
//!        │                   │
//!        ▼                   ▼
//! ┌──────────────┐   ┌───────────────┐
//! │ Activity log │   │ Suggestions + │──▶ SSE to sessions
//! │ + live cache │   │ feedback log  │
//! └──────────────┘   └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docsense init                       # create database
//! docsense load corpus.json           # import documentation corpus
//! docsense analyze event.json         # one-shot analysis of an event
//! docsense stats                      # database overview
//! docsense serve                      # start HTTP + SSE server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Keyword extraction and stemming |
//! | [`vector`] | Domain-weighted context vectors |
//! | [`rules`] | Rule-based suggestion matching |
//! | [`oracle`] | Search-index oracle (SQLite FTS5) |
//! | [`rank`] | Hybrid relevance ranking |
//! | [`cache`] | TTL suggestion and live-context caches |
//! | [`events`] | Real-time event types and fan-out |
//! | [`distribute`] | Context distribution pipeline |
//! | [`store`] | Durable activity/suggestion/feedback records |
//! | [`corpus`] | Documentation corpus import |
//! | [`server`] | HTTP + SSE server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod cache;
pub mod config;
pub mod corpus;
pub mod db;
pub mod distribute;
pub mod events;
pub mod extract;
pub mod migrate;
pub mod models;
pub mod oracle;
pub mod rank;
pub mod rules;
pub mod server;
pub mod stats;
pub mod store;
pub mod vector;
