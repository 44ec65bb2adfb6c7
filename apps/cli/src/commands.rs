//! Subcommand implementations.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, bail};
use filestore_gemini::Client;
use filestore_metadata::FileMetadataExtractor;
use filestore_protocol::ChunkConfig;
use filestore_transfer::{ContentHasher, ResolvedFile, resolve_files};
use filestore_upload::{
    BatchResult, DuplicatePolicy, FailureLog, ProgressCallback, ProgressSnapshot, StoreService,
    UploadOrchestrator, UploadSettings, find_duplicate_groups,
};
use tracing::{info, warn};

use crate::cli::{Commands, DocCommand, StoreCommand, UploadArgs};
use crate::config::Config;
use crate::format::{format_bytes, format_metadata_value, or_dash};
use crate::store_adapter::GeminiStore;

pub(crate) async fn run(command: Commands, config: Config) -> anyhow::Result<()> {
    match command {
        Commands::Failures { clear, yes } => failures(&config.upload, clear, yes),
        Commands::Stores { command } => stores(&connect(&config)?, command).await,
        Commands::Docs { command } => docs(&connect(&config)?, command).await,
        Commands::Upload(args) => {
            let store: Arc<dyn StoreService> = Arc::new(connect(&config)?);
            let result = upload(store, &args, &config.upload).await?;
            report(&result);
            if !result.is_success() {
                bail!(
                    "{} of {} uploads failed (see {})",
                    result.failed.len(),
                    result.total(),
                    config.upload.failure_log_path.display()
                );
            }
            Ok(())
        }
    }
}

fn connect(config: &Config) -> anyhow::Result<GeminiStore> {
    let client = Client::new(config.api_key()?)?;
    Ok(GeminiStore::new(client))
}

async fn stores(store: &dyn StoreService, command: StoreCommand) -> anyhow::Result<()> {
    match command {
        StoreCommand::List => {
            let stores = store.list_stores().await?;
            if stores.is_empty() {
                println!("No stores.");
            }
            for s in stores {
                println!(
                    "{}  {}  {} docs  {}",
                    s.name,
                    or_dash(s.display_name.as_deref()),
                    s.active_documents_count,
                    format_bytes(s.size_bytes)
                );
            }
        }
        StoreCommand::Create { name } => {
            let created = store.create_store(name.as_deref()).await?;
            println!("{created}");
        }
        StoreCommand::Show { store: id } => {
            let d = store.get_store(&id).await?;
            println!("Name:          {}", d.summary.name);
            println!("Display name:  {}", or_dash(d.summary.display_name.as_deref()));
            println!("Created:       {}", or_dash(d.summary.create_time.as_deref()));
            println!("Updated:       {}", or_dash(d.update_time.as_deref()));
            println!("Active docs:   {}", d.summary.active_documents_count);
            println!("Pending docs:  {}", d.pending_documents_count);
            println!("Failed docs:   {}", d.failed_documents_count);
            println!("Size:          {}", format_bytes(d.summary.size_bytes));
        }
        StoreCommand::Delete { store: id, force } => {
            store
                .delete_store(&id, force)
                .await
                .with_context(|| format!("deleting {id} (use --force to delete its documents)"))?;
            println!("Deleted {id}");
        }
    }
    Ok(())
}

async fn docs(store: &dyn StoreService, command: DocCommand) -> anyhow::Result<()> {
    match command {
        DocCommand::List { store: id } => {
            let docs = store.list_documents(&id).await?;
            if docs.is_empty() {
                println!("No documents.");
            }
            for d in docs {
                println!(
                    "{}  {}  {}  {}",
                    d.name,
                    or_dash(d.display_name.as_deref()),
                    or_dash(d.state.as_deref()),
                    format_bytes(d.size_bytes)
                );
            }
        }
        DocCommand::Show { document } => {
            let d = store.get_document(&document).await?;
            println!("Name:          {}", d.summary.name);
            println!("Display name:  {}", or_dash(d.summary.display_name.as_deref()));
            println!("State:         {}", or_dash(d.summary.state.as_deref()));
            println!("MIME type:     {}", or_dash(d.summary.mime_type.as_deref()));
            println!("Size:          {}", format_bytes(d.summary.size_bytes));
            println!("Created:       {}", or_dash(d.summary.create_time.as_deref()));
            println!("Updated:       {}", or_dash(d.update_time.as_deref()));
            if !d.custom_metadata.is_empty() {
                println!("Metadata:");
                for entry in &d.custom_metadata {
                    println!("  {} = {}", entry.key, format_metadata_value(entry));
                }
            }
        }
        DocCommand::Delete { document, force } => {
            store.delete_document(&document, force).await?;
            println!("Deleted {document}");
        }
    }
    Ok(())
}

fn chunk_config_for(args: &UploadArgs, settings: &UploadSettings) -> anyhow::Result<ChunkConfig> {
    let config = ChunkConfig::new(
        args.max_tokens
            .unwrap_or(settings.default_max_tokens_per_chunk),
        args.overlap.unwrap_or(settings.default_max_overlap_tokens),
    )?;
    Ok(config)
}

/// Resolves every path argument into one batch, reporting skipped files.
fn collect_files(args: &UploadArgs, settings: &UploadSettings) -> anyhow::Result<Vec<ResolvedFile>> {
    let hasher = ContentHasher::default();
    let max_bytes = settings.max_file_size_bytes();
    let mut files = Vec::new();

    for path in &args.paths {
        let resolution = resolve_files(path, args.recursive, max_bytes, &hasher)
            .with_context(|| format!("resolving {}", path.display()))?;
        for skipped in &resolution.skipped {
            eprintln!("skip  {}: {}", skipped.path.display(), skipped.reason);
        }
        info!(
            path = %path.display(),
            files = resolution.accepted.len(),
            bytes = resolution.total_bytes(),
            "resolved"
        );
        files.extend(resolution.accepted);
    }
    Ok(files)
}

async fn upload(
    store: Arc<dyn StoreService>,
    args: &UploadArgs,
    settings: &UploadSettings,
) -> anyhow::Result<BatchResult> {
    let chunk_config = chunk_config_for(args, settings)?;
    let concurrency = args.concurrency.unwrap_or(settings.concurrency_limit);

    let files = collect_files(args, settings)?;
    if files.is_empty() {
        bail!("no uploadable files found");
    }

    let policy = if args.keep_duplicates {
        DuplicatePolicy::UploadAll
    } else {
        for group in find_duplicate_groups(&files) {
            eprintln!(
                "duplicate content: {} (keeping {})",
                group
                    .duplicates()
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                group.canonical().display()
            );
        }
        DuplicatePolicy::Skip
    };

    let orchestrator = UploadOrchestrator::from_settings(
        settings,
        store,
        Arc::new(FileMetadataExtractor::default()),
    )?
    .with_duplicate_policy(policy);

    let cancel = orchestrator.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling remaining uploads");
            cancel.cancel();
        }
    });

    let last_completed = AtomicUsize::new(0);
    let on_progress: ProgressCallback = Box::new(move |snap: &ProgressSnapshot| {
        let done = snap.completed_count;
        if last_completed.swap(done, Ordering::Relaxed) != done {
            eprintln!(
                "[{done}/{}] {:.0}%  {} ok, {} failed, {} active",
                snap.total_count,
                snap.fraction() * 100.0,
                snap.succeeded,
                snap.failed,
                snap.in_progress
            );
        }
    });

    let result = orchestrator
        .upload_batch(
            files,
            &crate::store_adapter::store_name(&args.store),
            chunk_config,
            concurrency,
            Some(on_progress),
        )
        .await;
    interrupt.abort();
    Ok(result?)
}

fn report(result: &BatchResult) {
    for path in &result.succeeded {
        println!("ok    {}", path.display());
    }
    for path in &result.skipped_duplicates {
        println!("dup   {}", path.display());
    }
    for (path, error) in &result.failed {
        println!("FAIL  {}: {error}", path.display());
    }
    println!(
        "{} uploaded, {} failed, {} duplicates skipped",
        result.succeeded.len(),
        result.failed.len(),
        result.skipped_duplicates.len()
    );
}

fn failures(settings: &UploadSettings, clear: bool, yes: bool) -> anyhow::Result<()> {
    let log = FailureLog::new(&settings.failure_log_path);
    if clear {
        if !yes {
            bail!(
                "refusing to clear {} without --yes",
                log.path().display()
            );
        }
        log.clear()?;
        println!("Cleared {}", log.path().display());
        return Ok(());
    }

    let records = log.read_all()?;
    if records.is_empty() {
        println!("No recorded failures.");
    }
    for r in records {
        println!(
            "{}  {}  {}  attempts={}  {}",
            r.timestamp.to_rfc3339(),
            r.store_id,
            r.path.display(),
            r.attempt_count,
            r.error_message
        );
    }
    Ok(())
}
