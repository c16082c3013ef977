//! CLI for GenRelay - run the relay server or drive it from the terminal.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use genrelay::client::{
    download, Composer, JsonFileStore, HistoryStore, LocalFile, RelayClient, Studio,
    DEFAULT_SERVER_URL,
};
use genrelay::server::{self, AppState, Config};
use genrelay::{Mode, Resolution};
use tracing::info;

#[derive(Parser)]
#[command(name = "genrelay")]
#[command(about = "Relay prompts and reference images to Seedream (Volcengine Ark)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay HTTP server
    Serve(ServeArgs),

    /// Submit a prompt to a running relay server
    Generate(GenerateArgs),

    /// Inspect or edit the local history
    History {
        #[command(subcommand)]
        action: HistoryAction,

        #[command(flatten)]
        store: HistoryFile,
    },

    /// Download a generated image
    Download {
        /// Image URL
        url: String,

        /// Target directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// Address to bind, overrides GENRELAY_BIND
    #[arg(short, long)]
    bind: Option<String>,
}

#[derive(Args)]
struct HistoryFile {
    /// Key/value file holding the history
    #[arg(long = "history", env = "GENRELAY_HISTORY", default_value = "genrelay-storage.json", global = true)]
    path: PathBuf,
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt
    prompt: String,

    /// Generation mode; inferred from the number of images when omitted
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Local reference image (repeatable)
    #[arg(short, long = "image")]
    images: Vec<PathBuf>,

    /// Reference image URL (repeatable)
    #[arg(short, long = "url")]
    urls: Vec<String>,

    /// Output resolution
    #[arg(short, long, value_enum, default_value = "2K")]
    size: SizeArg,

    /// Model override
    #[arg(long)]
    model: Option<String>,

    /// Ask the provider to watermark results
    #[arg(long)]
    watermark: bool,

    /// Relay server base URL
    #[arg(long, env = "GENRELAY_SERVER", default_value = DEFAULT_SERVER_URL)]
    server: String,

    /// Save results into this directory
    #[arg(short, long)]
    download: Option<PathBuf>,

    #[command(flatten)]
    store: HistoryFile,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List entries, newest first
    List,
    /// Remove one entry by id
    Remove { id: String },
    /// Remove every entry
    Clear,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    #[value(name = "text")]
    Text,
    #[value(name = "img")]
    Single,
    #[value(name = "imgs")]
    Multi,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Text => Mode::Text,
            ModeArg::Single => Mode::Single,
            ModeArg::Multi => Mode::Multi,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SizeArg {
    #[value(name = "1K")]
    OneK,
    #[value(name = "2K")]
    TwoK,
    #[value(name = "4K")]
    FourK,
}

impl From<SizeArg> for Resolution {
    fn from(arg: SizeArg) -> Self {
        match arg {
            SizeArg::OneK => Resolution::OneK,
            SizeArg::TwoK => Resolution::TwoK,
            SizeArg::FourK => Resolution::FourK,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();
    init_tracing(&config);

    match cli.command {
        Commands::Serve(args) => serve(args, config).await?,
        Commands::Generate(args) => generate(args, cli.json).await?,
        Commands::History { action, store } => history(action, store, cli.json)?,
        Commands::Download { url, dir } => {
            let path = download(&reqwest::Client::new(), &url, &dir).await?;
            if cli.json {
                let result = serde_json::json!({ "url": url, "output": path.display().to_string() });
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Saved {}", path.display());
            }
        }
    }

    Ok(())
}

/// Logs go to stderr so command output stays parseable.
fn init_tracing(config: &Config) {
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match config.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: GENRELAY_LOG='{}' is not a valid tracing filter ({}); falling back to 'info'",
                    config.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn serve(args: ServeArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    info!(version = env!("CARGO_PKG_VERSION"), "genrelay server starting");

    let state = AppState::from_config(config)?;
    info!(
        uploads = state.blob_store.as_ref().map(|s| s.kind()).unwrap_or("disabled"),
        "blob storage ready"
    );
    server::serve(Arc::new(state)).await?;
    Ok(())
}

async fn generate(args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let relay = RelayClient::new(&args.server)?;
    let http = relay.http().clone();
    let mut studio = Studio::new(relay, JsonFileStore::new(&args.store.path));
    studio.prompt = args.prompt;
    studio.size = args.size.into();
    studio.model = args.model;
    studio.watermark = args.watermark;

    let composer = studio.composer_mut();
    if let Some(mode) = args.mode {
        composer.set_mode(mode.into());
    } else if args.images.len() + args.urls.len() > 1 {
        composer.set_mode(Mode::Multi);
    } else if !args.urls.is_empty() {
        composer.set_mode(Mode::Single);
    }

    let files = args
        .images
        .iter()
        .map(LocalFile::from_path)
        .collect::<Result<Vec<_>, _>>()?;
    let wanted = files.len();
    if composer.add_files(files) < wanted {
        eprintln!("note: only some of the given images were used for this mode");
    }
    for url in &args.urls {
        push_url(composer, url);
    }

    let outcome = studio.submit().await.map(<[String]>::to_vec);
    let images = match outcome {
        Ok(images) => images,
        Err(e) => {
            let message = studio.error().map(str::to_string).unwrap_or_else(|| e.to_string());
            anyhow::bail!("generation failed: {message}");
        }
    };

    let mut saved = Vec::new();
    if let Some(dir) = &args.download {
        for url in &images {
            saved.push(download(&http, url, dir).await?);
        }
    }

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "images": images,
            "saved": saved.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            "history": studio.history().len(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for url in &images {
            println!("{url}");
        }
        for path in &saved {
            println!("Saved {}", path.display());
        }
    }

    Ok(())
}

/// Places `url` into the first empty URL row, adding a row if needed.
fn push_url(composer: &mut Composer, url: &str) {
    let blank = composer
        .url_rows()
        .into_iter()
        .find(|row| !row.is_filled())
        .map(|row| row.id().to_string());
    let Some(id) = blank.or_else(|| composer.add_url_row()) else {
        eprintln!("note: ignoring URL {url} for this mode");
        return;
    };
    composer.set_url(&id, url);
}

fn history(action: HistoryAction, file: HistoryFile, json_output: bool) -> anyhow::Result<()> {
    let store = JsonFileStore::new(&file.path);
    let mut history = store.load()?;

    match action {
        HistoryAction::List => {
            if json_output {
                println!("{}", serde_json::to_string_pretty(history.entries())?);
            } else if history.is_empty() {
                println!("History is empty ({})", store.path().display());
            } else {
                for entry in history.entries() {
                    let when = chrono::DateTime::from_timestamp_millis(entry.ts)
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_default();
                    println!("{}  {}  {}", entry.id, when, entry.url);
                }
            }
        }
        HistoryAction::Remove { id } => {
            if !history.remove(&id) {
                anyhow::bail!("no history entry with id {id}");
            }
            store.save(&history)?;
            println!("Removed {id}");
        }
        HistoryAction::Clear => {
            history.clear();
            store.save(&history)?;
            println!("History cleared");
        }
    }

    Ok(())
}
