//! # pdfchat core
//!
//! Runtime-agnostic logic for the pdfchat retrieval pipeline: data models,
//! namespace sanitizing, page chunking, context assembly, the collaborator
//! traits the pipeline is written against, and an in-memory vector store.
//!
//! This crate performs no network or filesystem I/O. Concrete clients
//! (S3, Pinecone, OpenAI, PDF extraction) live in the `pdfchat` app crate.

pub mod chunk;
pub mod context;
pub mod embedding;
pub mod error;
pub mod models;
pub mod namespace;
pub mod source;
pub mod store;

pub use error::{PipelineError, Result};
