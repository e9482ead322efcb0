//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Resumable sync of store resources into rows
#[derive(Parser, Debug)]
#[command(name = "shoptable-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Store configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Test connection to the store
    Check,

    /// List syncable resources and what they support
    Resources,

    /// Show the columns of a resource, custom fields included
    Columns {
        /// Resource name (e.g. products, variants)
        resource: String,
    },

    /// Run one slice of a sync, or every slice with --all
    Sync {
        /// Resource name (e.g. products, variants)
        resource: String,

        /// Columns to read (comma-separated, empty = all standard columns)
        #[arg(long, value_delimiter = ',')]
        keys: Vec<String>,

        /// Listing filter as key=value (repeatable)
        #[arg(long = "filter", value_parser = parse_key_value)]
        filters: Vec<(String, String)>,

        /// Continuation state file (JSON)
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Keep running slices until the sync is complete
        #[arg(long)]
        all: bool,

        /// Stop after this many slices
        #[arg(long)]
        max_slices: Option<usize>,
    },

    /// Apply row edits from a JSON file
    Update {
        /// Resource name
        resource: String,

        /// JSON array of {previous, new, changedFields}
        #[arg(long)]
        edits: PathBuf,
    },

    /// Delete one record
    Delete {
        /// Resource name
        resource: String,

        /// Numeric record id
        #[arg(long)]
        id: u64,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

/// Parse `key=value`
fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_sync_command() {
        let cli = Cli::parse_from([
            "shoptable-sync",
            "-C",
            "shop.yaml",
            "sync",
            "products",
            "--keys",
            "title,custom.color",
            "--filter",
            "status=active",
            "--filter",
            "vendor=A=B",
            "--all",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("shop.yaml")));
        match cli.command {
            Commands::Sync {
                resource,
                keys,
                filters,
                state,
                all,
                max_slices,
            } => {
                assert_eq!(resource, "products");
                assert_eq!(keys, vec!["title", "custom.color"]);
                assert_eq!(
                    filters,
                    vec![
                        ("status".to_string(), "active".to_string()),
                        ("vendor".to_string(), "A=B".to_string()),
                    ]
                );
                assert_eq!(state, None);
                assert!(all);
                assert_eq!(max_slices, None);
            }
            other => panic!("expected sync, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_malformed_filter() {
        let result = Cli::try_parse_from(["shoptable-sync", "sync", "products", "--filter", "oops"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_delete_command() {
        let cli = Cli::parse_from(["shoptable-sync", "delete", "pages", "--id", "42", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Delete { id: 42, .. }));
    }
}
