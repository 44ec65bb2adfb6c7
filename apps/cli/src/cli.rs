use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "filestore",
    version,
    about = "Manage Gemini file-search stores and upload documents into them",
    after_help = "\
Configuration file lookup order:
  1. --config <path>      (explicit flag)
  2. $FILESTORE_CONFIG    (environment variable)
  3. ~/.config/filestore/config.toml

Environment variables:
  GEMINI_API_KEY          API key (overrides api_key in the config file)
  FILESTORE_<SETTING>     Overrides an [upload] setting, e.g. FILESTORE_MAX_UPLOAD_RETRIES"
)]
pub(crate) struct Cli {
    /// Path to configuration file (overrides FILESTORE_CONFIG and the default path)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Manage file-search stores
    Stores {
        #[command(subcommand)]
        command: StoreCommand,
    },

    /// Inspect and delete documents
    Docs {
        #[command(subcommand)]
        command: DocCommand,
    },

    /// Upload files or directories into a store
    Upload(UploadArgs),

    /// Show or clear the persisted upload failure log
    Failures {
        /// Truncate the failure log
        #[arg(long)]
        clear: bool,

        /// Confirm --clear (required, the log cannot be recovered)
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub(crate) enum StoreCommand {
    /// List all stores
    List,

    /// Create a new store
    Create {
        /// Human-readable display name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Show store details
    Show {
        /// Store ID or resource name
        store: String,
    },

    /// Delete a store
    Delete {
        /// Store ID or resource name
        store: String,

        /// Also delete every document in the store
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub(crate) enum DocCommand {
    /// List documents in a store
    List {
        /// Store ID or resource name
        store: String,
    },

    /// Show document details and custom metadata
    Show {
        /// Document resource name (fileSearchStores/.../documents/...)
        document: String,
    },

    /// Delete a document
    Delete {
        /// Document resource name
        document: String,

        /// Also delete the document's indexed chunks
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
pub(crate) struct UploadArgs {
    /// Target store ID or resource name
    pub store: String,

    /// Files or directories to upload
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Maximum tokens per chunk (1-512, overrides config)
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Overlap tokens between chunks (overrides config)
    #[arg(long)]
    pub overlap: Option<u32>,

    /// Concurrent uploads (overrides config)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Upload files even when their content duplicates another file in the batch
    #[arg(long)]
    pub keep_duplicates: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_upload() {
        let cli = Cli::try_parse_from([
            "filestore",
            "upload",
            "abc",
            "docs/",
            "a.pdf",
            "-r",
            "--max-tokens",
            "256",
            "--overlap",
            "32",
            "--keep-duplicates",
        ])
        .unwrap();
        let Commands::Upload(args) = cli.command else {
            panic!("expected upload");
        };
        assert_eq!(args.store, "abc");
        assert_eq!(args.paths.len(), 2);
        assert!(args.recursive);
        assert_eq!(args.max_tokens, Some(256));
        assert_eq!(args.overlap, Some(32));
        assert_eq!(args.concurrency, None);
        assert!(args.keep_duplicates);
    }

    #[test]
    fn upload_requires_paths() {
        assert!(Cli::try_parse_from(["filestore", "upload", "abc"]).is_err());
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::try_parse_from(["filestore", "-vv", "stores", "list"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
