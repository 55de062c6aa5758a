//! # pdfchat
//!
//! Ingestion and retrieval pipeline for chatting with uploaded PDF documents.
//!
//! A document stored in object storage is split into page-tagged chunks,
//! embedded, and written to a vector index under a namespace derived from the
//! document's key. At question time the question is embedded and the closest
//! chunks of that one document are assembled into a bounded context string
//! for a chat model.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │ ObjectStore │──▶│ TextExtractor│──▶│ Chunk + Embed│──▶│ Pinecone │
//! │ S3 / FS     │   │  (PDF pages) │   │  (bounded)   │   │ namespace│
//! └─────────────┘   └──────────────┘   └──────────────┘   └────┬─────┘
//!                                                              │
//!                          question ──▶ embed ──▶ top-K ───────┘
//!                                                   │
//!                                                   ▼
//!                                          context string
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export OPENAI_API_KEY=... PINECONE_API_KEY=...
//! pdfchat ingest uploads/1700000000-report.pdf
//! pdfchat context uploads/1700000000-report.pdf "What was Q3 revenue?"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`pipeline`] | Collaborator wiring and request deadlines |
//! | [`ingest`] | Document ingestion |
//! | [`retrieve`] | Context retrieval |
//! | [`embedding`] | OpenAI embedding client |
//! | [`pinecone`] | Pinecone vector store client |
//! | [`storage_s3`] | S3 object store |
//! | [`storage_fs`] | Local filesystem object store |
//! | [`extract`] | PDF page extraction |
//!
//! Runtime-agnostic pieces (models, chunking, key sanitizing, context
//! assembly, traits) live in [`pdfchat_core`].

pub mod config;
pub mod embedding;
pub mod extract;
pub mod ingest;
pub mod pinecone;
pub mod pipeline;
pub mod retrieve;
pub mod storage_fs;
pub mod storage_s3;

pub use ingest::IngestReport;
pub use pipeline::{Pipeline, PipelineSettings};
