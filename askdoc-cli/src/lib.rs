//! # askdoc-cli
//!
//! Command-line launcher for the askdoc query pipeline.
//!
//! ```text
//! askdoc ask "What is the invoice number?"
//! askdoc ask --document report.pdf "Summarize this file"
//! askdoc health --json
//! askdoc clear
//! ```
//!
//! Settings come from flags, then the environment (a `.env` file is loaded
//! first): `HF_API_KEY`, `OPENAI_API_KEY`, `QDRANT_URL`, `QDRANT_COLLECTION`,
//! `ASKDOC_TOP_K`, `ASKDOC_EXPAND_QUERIES`.

pub mod cli;
pub mod output;
pub mod setup;
pub mod telemetry;

pub use cli::{Cli, Commands};
pub use setup::build_pipeline;
