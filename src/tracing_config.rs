//! Tracing configuration for debugging aggregation and resolution.
//!
//! Supports three output formats controlled by `SRCMODEL_LOG_FORMAT`:
//!
//! - `text` (default): standard `tracing-subscriber` flat output
//! - `tree`: hierarchical indented output via `tracing-tree`, handy for
//!   following nested member folds and scope walks
//! - `json`: one JSON object per span/event
//!
//! ## Quick start
//!
//! ```bash
//! # Member folds and synthesized members as a tree
//! SRCMODEL_LOG=srcmodel_binder=debug SRCMODEL_LOG_FORMAT=tree cargo test
//!
//! # Every cache fill and store registration
//! SRCMODEL_LOG=trace SRCMODEL_LOG_FORMAT=json cargo test
//! ```
//!
//! The subscriber is only initialised when `SRCMODEL_LOG` (or `RUST_LOG`)
//! is set.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Tree,
    Json,
}

impl LogFormat {
    /// Parse a `SRCMODEL_LOG_FORMAT` value; anything unknown is `Text`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "tree" => Self::Tree,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var("SRCMODEL_LOG_FORMAT").unwrap_or_default())
    }
}

/// `SRCMODEL_LOG` takes precedence over `RUST_LOG`.
fn build_filter() -> EnvFilter {
    if let Ok(val) = std::env::var("SRCMODEL_LOG") {
        EnvFilter::builder().parse_lossy(val)
    } else {
        EnvFilter::from_default_env()
    }
}

/// Initialise the global tracing subscriber.
///
/// Does nothing when neither `SRCMODEL_LOG` nor `RUST_LOG` is set, or when
/// a global subscriber is already installed. All output goes to stderr.
pub fn init_tracing() {
    let has_own_log = std::env::var("SRCMODEL_LOG").is_ok();
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if !has_own_log && !has_rust_log {
        return;
    }

    let filter = build_filter();
    let installed = match LogFormat::from_env() {
        LogFormat::Tree => {
            let tree_layer = tracing_tree::HierarchicalLayer::default()
                .with_writer(std::io::stderr)
                .with_indent_amount(2)
                .with_indent_lines(true)
                .with_deferred_spans(true)
                .with_span_retrace(true)
                .with_targets(true);
            Registry::default().with(filter).with(tree_layer).try_init()
        }
        LogFormat::Json => {
            let json_layer = fmt::layer().json().with_writer(std::io::stderr);
            Registry::default().with(filter).with(json_layer).try_init()
        }
        LogFormat::Text => {
            let text_layer = fmt::layer().with_writer(std::io::stderr);
            Registry::default().with(filter).with(text_layer).try_init()
        }
    };
    if let Err(error) = installed {
        tracing::debug!(%error, "tracing subscriber already installed");
    }
}
