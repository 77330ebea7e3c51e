//! Command-line arguments.

use clap::{Parser, Subcommand};

/// Default Qdrant collection name.
pub const DEFAULT_COLLECTION: &str = "documents";

#[derive(Debug, Parser)]
#[command(name = "askdoc", version, about = "Ask questions about your indexed documents")]
pub struct Cli {
    /// Hugging Face API key, used for embeddings and the primary chat model
    #[arg(long, env = "HF_API_KEY", hide_env_values = true, global = true)]
    pub hf_api_key: Option<String>,

    /// OpenAI API key; adds OpenAI as the fallback chat model
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub openai_api_key: Option<String>,

    /// Qdrant gRPC URL; without it an empty in-memory index is used
    #[arg(long, env = "QDRANT_URL", global = true)]
    pub qdrant_url: Option<String>,

    /// Qdrant collection holding the document chunks
    #[arg(long, env = "QDRANT_COLLECTION", default_value = DEFAULT_COLLECTION, global = true)]
    pub collection: String,

    /// Nearest neighbours fetched per query variant
    #[arg(long, env = "ASKDOC_TOP_K", global = true)]
    pub top_k: Option<usize>,

    /// Rewrite each question into several search queries
    #[arg(long, env = "ASKDOC_EXPAND_QUERIES", global = true)]
    pub expand: bool,

    /// Use deterministic mock providers instead of remote APIs
    #[arg(long, global = true)]
    pub offline: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Answer a question
    Ask {
        /// The question
        question: String,
        /// The document currently open, if any
        #[arg(short, long)]
        document: Option<String>,
        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every indexed vector
    Clear,
    /// Check that every collaborator is reachable
    Health {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}
