//! Application entry point: lyric-sync command-line client.
//!
//! # Startup sequence
//!
//! 1. Parse arguments.
//! 2. Initialise logging (`-v` raises the default filter to `debug`).
//! 3. Load [`AppConfig`] from disk (defaults on first run).
//! 4. Open the secret store and build the [`AlignmentClient`].
//! 5. Install the Ctrl-C handler. It cancels whichever request, poll or
//!    playback is in flight.
//! 6. Run the subcommand. Failures are shown on the status line and recorded
//!    in the debug log, next to any API-key changes made during the run.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use lyric_sync::{
    api::{
        AlignmentClient, FileSecretStore, MemorySecretStore, SecretStore, TargetRequest, TaskApi,
        TaskQuery,
    },
    catalog::{AlignmentCatalog, AlignmentSelection, Asset, AssetCatalog},
    config::{AppConfig, AppPaths},
    lyrics::{parse_alignment, Alignment, LyricHighlighter, MediaClock, SimulatedPlayer},
    pipeline::{AlignmentPipeline, PipelineEvent, TaskPoller},
    session::{DebugLog, Session},
};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "lyric-sync")]
#[command(about = "Create, browse and play word-level lyric alignments")]
#[command(version)]
struct Cli {
    /// Debug logging and debug-log dump on failure
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding settings.toml and the stored key
    #[arg(long, global = true, env = "LYRIC_SYNC_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// API key for this run only (not persisted)
    #[arg(long, global = true, env = "LYRIC_SYNC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Override the API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Keep the key in memory instead of the credentials file
    #[arg(long, global = true)]
    no_store: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage the stored API key
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Create an alignment task for a media URL
    Create {
        url: String,
        #[arg(long)]
        callback_url: Option<String>,
    },
    /// Print a task
    Get { id: String },
    /// List alignment tasks
    List {
        #[arg(long)]
        skip: Option<u32>,
        #[arg(long)]
        take: Option<u32>,
        /// Case-insensitive match on the source file name
        #[arg(long)]
        filter: Option<String>,
    },
    /// Print task statistics
    Stats {
        #[arg(long, default_value = "usage")]
        name: String,
    },
    /// Poll a task until it completes or fails
    Poll { id: String },
    /// Create, poll, fetch and normalize in one go
    Align {
        /// Media URL; defaults to the selected asset
        url: Option<String>,
        #[command(flatten)]
        assets: AssetArgs,
        /// Index of the asset to submit
        #[arg(long, default_value_t = 0)]
        asset: usize,
        #[arg(long)]
        play: bool,
    },
    /// Load the alignment of a completed task (or a local artifact)
    Lyrics {
        task_id: Option<String>,
        #[arg(long, conflicts_with = "task_id")]
        file: Option<PathBuf>,
        #[command(flatten)]
        assets: AssetArgs,
        /// Index of the asset to play against
        #[arg(long, default_value_t = 0)]
        asset: usize,
        #[arg(long)]
        play: bool,
        /// Start playback at this word
        #[arg(long)]
        from_word: Option<usize>,
    },
    /// Load and list media assets
    Assets {
        #[command(flatten)]
        assets: AssetArgs,
        #[arg(long)]
        select: Option<usize>,
    },
}

/// Where to load the asset catalog from. The first option given wins.
#[derive(Args, Debug, Default)]
struct AssetArgs {
    /// Asset list JSON file
    #[arg(long)]
    assets_file: Option<PathBuf>,
    /// Asset list JSON URL
    #[arg(long)]
    assets_url: Option<String>,
    /// Single media URL; MIME type is inferred from its extension
    #[arg(long)]
    source: Option<String>,
    #[arg(long, requires = "source")]
    title: Option<String>,
    /// Built-in demo media
    #[arg(long)]
    demo: bool,
}

impl AssetArgs {
    fn is_set(&self) -> bool {
        self.assets_file.is_some() || self.assets_url.is_some() || self.source.is_some() || self.demo
    }
}

#[derive(Subcommand, Debug)]
enum AuthAction {
    /// Store a new key
    Set { key: String },
    /// Remove the stored key
    Clear,
    /// Show whether a key is configured
    Status,
    /// Check the key against the API
    Validate,
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

struct Ctx {
    config: AppConfig,
    client: Arc<AlignmentClient>,
    cancel: CancellationToken,
    session: Session,
}

impl Ctx {
    fn api(&self) -> Arc<dyn TaskApi> {
        self.client.clone()
    }

    async fn require_key(&self) -> Result<()> {
        if !self.client.has_api_key().await {
            bail!("API key not set. Run `lyric-sync auth set <KEY>` or set LYRIC_SYNC_API_KEY");
        }
        Ok(())
    }

    fn pipeline(&self) -> (AlignmentPipeline, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline =
            AlignmentPipeline::new(self.api(), self.config.poll, self.config.alignment.clone())
                .with_events(tx)
                .with_cancel(self.cancel.clone());
        (pipeline, rx)
    }

    /// Load the catalog `args` point at. Empty when no option is given.
    async fn load_assets(&self, args: &AssetArgs) -> Result<AssetCatalog> {
        let mut catalog = AssetCatalog::new();
        if let Some(path) = &args.assets_file {
            catalog.load_file(path)?;
        } else if let Some(url) = &args.assets_url {
            let data = or_cancel(&self.cancel, self.client.fetch_json(url)).await??;
            catalog.load_json(&data)?;
        } else if let Some(source) = &args.source {
            catalog.load_source(source, args.title.as_deref());
        } else if args.demo {
            catalog.load_demo();
        }
        Ok(catalog)
    }
}

/// Await `step` unless `cancel` fires first.
async fn or_cancel<T>(cancel: &CancellationToken, step: impl Future<Output = T>) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => bail!("Cancelled"),
        out = step => Ok(out),
    }
}

// ---------------------------------------------------------------------------
// Media selection
// ---------------------------------------------------------------------------

/// URL to submit for alignment: `url` when given, else the asset at `index`.
fn media_source(url: Option<String>, assets: &mut AssetCatalog, index: usize) -> Result<String> {
    if let Some(url) = url {
        return Ok(url);
    }
    if assets.is_empty() {
        bail!("Pass a media URL or load assets with --assets-file, --assets-url, --source or --demo");
    }
    Ok(assets.select(index)?.src.clone())
}

/// Select the alignment at `index` and pick the media to play with it.
///
/// Loaded assets take precedence. The task's own media is only offered when
/// the asset catalog is empty.
fn select_alignment(
    alignments: &mut AlignmentCatalog,
    index: usize,
    assets: &mut AssetCatalog,
    asset_index: usize,
) -> Result<(AlignmentSelection, Option<Asset>)> {
    let selection = alignments.select(index, !assets.is_empty())?;
    let media = match &selection.fallback_media {
        Some(media) => Some(media.clone()),
        None if !assets.is_empty() => Some(assets.select(asset_index)?.clone()),
        None => None,
    };
    Ok((selection, media))
}

fn print_media(media: &Asset) {
    println!("Media: {} ({})", media.src, media.title);
}

// ---------------------------------------------------------------------------
// Event printer
// ---------------------------------------------------------------------------

/// Print pipeline progress and collect it as debug entries. Returns the log
/// once the pipeline is dropped.
fn spawn_event_printer(
    mut rx: mpsc::UnboundedReceiver<PipelineEvent>,
) -> tokio::task::JoinHandle<DebugLog> {
    tokio::spawn(async move {
        let mut log = DebugLog::new();
        while let Some(event) = rx.recv().await {
            match event {
                PipelineEvent::Submitting { media_url } => {
                    println!("Creating alignment task...");
                    log.info(json!({ "info": "Creating alignment task", "url": media_url }));
                }
                PipelineEvent::TaskCreated(task) => {
                    println!("Task created: {}", task.id);
                    log.success(json!({ "success": "Task created", "task": task }));
                }
                PipelineEvent::TaskUpdated(task) => {
                    let status = task
                        .targets
                        .first()
                        .map(|t| t.status.to_string())
                        .unwrap_or_default();
                    println!("Status: {status}");
                    log.info(json!({ "info": "Task status", "taskId": task.id, "status": status }));
                }
                PipelineEvent::TaskCompleted(task) => {
                    println!("Alignment completed");
                    log.success(json!({ "success": "Task completed", "task": task }));
                }
                PipelineEvent::FetchingArtifact { url } => {
                    log.info(json!({ "info": format!("Fetching alignment from: {url}") }));
                }
                PipelineEvent::AlignmentLoaded { lines, words, keys } => {
                    println!("Loaded {words} words in {lines} lines");
                    log.success(json!({ "success": "Alignment data loaded", "structure": keys }));
                }
            }
        }
        log
    })
}

// ---------------------------------------------------------------------------
// Terminal player
// ---------------------------------------------------------------------------

/// Play `alignment` against a simulated clock, printing the current line
/// whenever the set of active words changes.
async fn play(alignment: &Alignment, tick: Duration, from_word: Option<usize>, cancel: CancellationToken) {
    let mut highlighter = LyricHighlighter::new(alignment);
    let mut player = SimulatedPlayer::for_alignment(alignment);

    if let Some(index) = from_word {
        match highlighter.seek_to_word(index, &mut player) {
            Some(at) => log::info!("player: starting at word {index} ({at:.2}s)"),
            None => log::warn!("player: no word at index {index}, starting from 0"),
        }
    }

    let mut ticker = tokio::time::interval(tick);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let change = highlighter.on_time_update(&player);
        if !change.is_empty() {
            let mut lines: Vec<usize> = change
                .activated
                .iter()
                .filter_map(|&i| highlighter.line_of(i))
                .collect();
            lines.dedup();
            for line in lines {
                println!("{:>7.2}s  {}", player.current_time(), highlighter.render_line(line));
            }
        }

        if player.is_finished() {
            break;
        }
    }
}

fn print_alignment(alignment: &Alignment) {
    for line in &alignment.lines {
        let start = line.words.first().map(|w| w.start).unwrap_or_default();
        println!("{start:>7.2}s  {}", line.text());
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn run(cmd: Command, ctx: &mut Ctx) -> Result<()> {
    match cmd {
        Command::Auth { action } => match action {
            AuthAction::Set { key } => {
                ctx.client.set_api_key(&key).await?;
                println!("API key saved");
            }
            AuthAction::Clear => {
                ctx.client.clear_api_key().await?;
                println!("API key cleared");
            }
            AuthAction::Status => {
                if ctx.client.has_api_key().await {
                    println!("API key configured");
                } else {
                    println!("API key not set");
                }
            }
            AuthAction::Validate => {
                ctx.require_key().await?;
                if or_cancel(&ctx.cancel, ctx.client.validate_key()).await? {
                    println!("API key is valid");
                } else {
                    bail!("API key was rejected");
                }
            }
        },

        Command::Create { url, callback_url } => {
            ctx.require_key().await?;
            let targets = vec![TargetRequest::alignment(
                ctx.config.alignment.formats.clone(),
                ctx.config.alignment.language.clone(),
            )];
            let task = or_cancel(
                &ctx.cancel,
                ctx.client.create_task(&url, targets, callback_url.as_deref()),
            )
            .await??;
            ctx.session.log.success(json!({ "success": "Task created", "taskId": task.id }));
            print_json(&task)?;
        }

        Command::Get { id } => {
            ctx.require_key().await?;
            print_json(&or_cancel(&ctx.cancel, ctx.client.get_task(&id)).await??)?;
        }

        Command::List { skip, take, filter } => {
            ctx.require_key().await?;
            let query = TaskQuery::page(
                skip.unwrap_or(ctx.config.catalog.default_skip),
                take.unwrap_or(ctx.config.catalog.default_take),
            );
            let tasks = or_cancel(&ctx.cancel, ctx.client.list_tasks(&query)).await??;

            let mut catalog = AlignmentCatalog::new();
            catalog.replace(tasks);
            if let Some(filter) = filter {
                catalog.set_filter(filter);
            }

            let visible = catalog.visible();
            if visible.is_empty() {
                println!("No alignments found");
            }
            for (index, s) in visible {
                println!("#{index:<3} {}  [{}]", s.id, s.status);
                println!("     {}", s.source_line());
                println!("     Created: {}", s.created);
                if let Some(error) = s.error {
                    println!("     Error: {error}");
                }
            }
        }

        Command::Stats { name } => {
            ctx.require_key().await?;
            print_json(&or_cancel(&ctx.cancel, ctx.client.task_statistics(&name)).await??)?;
        }

        Command::Poll { id } => {
            ctx.require_key().await?;
            let poller = TaskPoller::new(ctx.api(), ctx.config.poll).with_cancel(ctx.cancel.clone());
            let result = poller
                .poll(&id, |t| {
                    if let Some(target) = t.targets.first() {
                        println!("Status: {}", target.status);
                    }
                })
                .await;
            match result {
                Ok(task) => print_json(&task)?,
                Err(e) => {
                    println!("Polling stopped: {}", e.state().label());
                    return Err(e.into());
                }
            }
        }

        Command::Align {
            url,
            assets,
            asset,
            play: should_play,
        } => {
            ctx.require_key().await?;
            let mut catalog = ctx.load_assets(&assets).await?;
            let url = media_source(url, &mut catalog, asset)?;
            if let Some(selected) = catalog.selected() {
                print_media(selected);
            }

            let (pipeline, rx) = ctx.pipeline();
            let printer = spawn_event_printer(rx);

            let result = pipeline.run(&url).await;
            drop(pipeline);
            if let Ok(log) = printer.await {
                ctx.session.log = log;
            }

            let alignment = result?;
            if should_play {
                play(&alignment, ctx.config.player.tick(), None, ctx.cancel.clone()).await;
            } else {
                print_alignment(&alignment);
            }
        }

        Command::Lyrics {
            task_id,
            file,
            assets,
            asset,
            play: should_play,
            from_word,
        } => {
            let mut catalog = ctx.load_assets(&assets).await?;
            let alignment = match (task_id, file) {
                (_, Some(path)) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    let data: Value = serde_json::from_str(&text)?;
                    if !catalog.is_empty() {
                        print_media(catalog.select(asset)?);
                    }
                    parse_alignment(&data)?
                }
                (Some(id), None) => {
                    ctx.require_key().await?;
                    let task = or_cancel(&ctx.cancel, ctx.client.get_task(&id)).await??;

                    let mut alignments = AlignmentCatalog::new();
                    alignments.replace(vec![task]);
                    if alignments.is_empty() {
                        bail!("No alignment target found");
                    }
                    let (selection, media) =
                        select_alignment(&mut alignments, 0, &mut catalog, asset)?;
                    if let Some(media) = &media {
                        print_media(media);
                    }

                    let (pipeline, rx) = ctx.pipeline();
                    let printer = spawn_event_printer(rx);
                    let result = pipeline.load_artifact(&selection.link).await;
                    drop(pipeline);
                    if let Ok(log) = printer.await {
                        ctx.session.log = log;
                    }
                    result?
                }
                (None, None) => bail!("Pass a task id or --file"),
            };

            if should_play {
                play(&alignment, ctx.config.player.tick(), from_word, ctx.cancel.clone()).await;
            } else {
                print_alignment(&alignment);
            }
        }

        Command::Assets { assets, select } => {
            if !assets.is_set() {
                bail!("Pass one of --assets-file, --assets-url, --source or --demo");
            }
            let mut catalog = ctx.load_assets(&assets).await?;

            println!("Loaded {} assets", catalog.len());
            for (i, asset) in catalog.assets().iter().enumerate() {
                println!("#{i:<3} {:<6} {}", asset.label(), asset.title);
            }

            if let Some(index) = select {
                let asset = catalog.select(index)?;
                println!("Selected: {} ({:?}, {})", asset.src, asset.kind(), asset.format);
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Arguments
    let cli = Cli::parse();

    // 2. Logging
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    // 3. Configuration
    let paths = match &cli.config_dir {
        Some(dir) => AppPaths::in_dir(dir.clone()),
        None => AppPaths::new(),
    };
    let mut config = AppConfig::load_from(&paths.settings_file).unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }

    // 4. Client. A key passed on the command line is never persisted.
    let transient = cli.no_store || cli.api_key.is_some();
    let store: Arc<dyn SecretStore> = if transient {
        Arc::new(MemorySecretStore::new())
    } else {
        Arc::new(FileSecretStore::open(paths.credentials_file.clone()))
    };
    let client = Arc::new(AlignmentClient::from_config(&config.api, store));
    let mut key_events = client.subscribe();
    match &cli.api_key {
        Some(key) => client.set_api_key(key).await?,
        None => {
            client.load_stored_key().await;
        }
    }

    // 5. Ctrl-C
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Ctrl-C received, cancelling");
                cancel.cancel();
            }
        });
    }

    // 6. Command
    let mut ctx = Ctx {
        config,
        client,
        cancel,
        session: Session::new(),
    };
    ctx.session.drain_key_events(&mut key_events);
    let result = run(cli.command, &mut ctx).await;
    ctx.session.drain_key_events(&mut key_events);
    if let Err(e) = result {
        ctx.session.report_error(format!("{e:#}"), json!({}));
        if let Some(message) = ctx.session.status.current() {
            eprintln!("Error: {message}");
        }
        if cli.verbose {
            for entry in ctx.session.log.entries() {
                eprintln!("{entry}");
            }
        }
        std::process::exit(1);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
