//! # ragchat
//!
//! A retrieval-augmented chat backend. Documents are embedded into 384-dim
//! vectors and stored next to their text; questions are gated, embedded,
//! matched against the store and answered by a generation model that may
//! only use the retrieved documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────┐   ┌────────────┐   ┌───────────┐   ┌────────────┐
//! │  query   │──▶│ gate  │──▶│ embedding  │──▶│ retrieval │──▶│ generation │
//! └──────────┘   └───────┘   │ (HF / hash)│   │ (pgvector │   │  (Gemini)  │
//!                            └────────────┘   │  / SQLite)│   └────────────┘
//!                                             └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ragchat init                  # create the schema
//! ragchat ingest --clear        # load the built-in corpus
//! ragchat ask "How much Navyakosh should I apply per acre?"
//! ragchat serve                 # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment credentials |
//! | [`db`] | Connection pools and store selection |
//! | [`migrate`] | Idempotent schema setup |
//! | [`sqlite_store`] | SQLite document store |
//! | [`pg_store`] | PostgreSQL + pgvector document store |
//! | [`embedding`] | HuggingFace and hash embedders, failure policy |
//! | [`llm`] | Gemini generation client |
//! | [`context`] | Shared application context |
//! | [`chat`] | Query pipeline and answer composition |
//! | [`ingest`] | Corpus loading and ingestion |
//! | [`stats`] | Status overview |
//! | [`server`] | HTTP API |
//!
//! Backend-independent pieces (gate, retrieval, prompt, store trait) live in
//! the `ragchat-core` crate.

pub mod chat;
pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod ingest;
pub mod llm;
pub mod migrate;
pub mod pg_store;
pub mod server;
pub mod sqlite_store;
pub mod stats;
