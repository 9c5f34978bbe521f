//! # ragchat core
//!
//! Runtime-free logic shared by the `ragchat` service: data models, the
//! query gate, hash embeddings and vector math, the [`store::Store`]
//! abstraction, retrieval with relevance filtering, and prompt assembly.
//!
//! This crate has no tokio, sqlx, or HTTP dependencies. Everything that
//! talks to the network or a database lives in the `ragchat` app crate and
//! plugs in through the [`embedding::Embedder`], [`generate::Generator`]
//! and [`store::Store`] traits.

pub mod embedding;
pub mod gate;
pub mod generate;
pub mod messages;
pub mod models;
pub mod prompt;
pub mod retrieve;
pub mod store;
