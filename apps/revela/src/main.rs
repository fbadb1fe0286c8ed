mod charset;
mod render;

use chrono::Utc;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use rv_core::PreviewError;
use rv_core::PreviewResult;
use rv_preview::ViewConfiguration;
use rv_preview::ViewMode;
use rv_relay::DEFAULT_RELAY_ADDR;
use rv_relay::HttpUpstream;
use rv_relay::RelayService;
use rv_sandbox::ContextReport;
use rv_storage::HostPreferences;
use rv_storage::KeyValueStore;
use rv_storage::SnapshotHistory;
use rv_storage::StorageConfig;
use std::fs;
use std::io::Read;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const HISTORY_PREVIEW_CHARS: usize = 60;

#[derive(Debug, Parser)]
#[command(name = "revela", version, about = "Sandboxed HTML preview and deobfuscation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a document in the sandbox and print the settled markup.
    Render(RenderArgs),
    /// Run the remote-fetch relay.
    Serve {
        #[arg(long, default_value = DEFAULT_RELAY_ADDR)]
        addr: String,
    },
    /// List saved snapshots, or print one.
    History {
        #[arg(long)]
        show: Option<usize>,
    },
}

#[derive(Debug, Args)]
struct RenderArgs {
    /// Input file, or `-` for stdin.
    input: PathBuf,
    #[arg(long, default_value = "desktop")]
    mode: ViewMode,
    /// Custom viewport width (custom mode only).
    #[arg(long)]
    width: Option<u32>,
    /// Custom viewport height (custom mode only).
    #[arg(long)]
    height: Option<u32>,
    /// Leave network primitives untouched inside the preview.
    #[arg(long, conflicts_with = "block_network")]
    allow_network: bool,
    /// Block network primitives even if the saved preference allows them.
    #[arg(long)]
    block_network: bool,
    /// Write the output here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Print what the page tried to do to stderr.
    #[arg(long)]
    report: bool,
    /// Do not record the input in the snapshot history.
    #[arg(long)]
    no_history: bool,
    #[arg(long, default_value_t = 15_000)]
    timeout_ms: u64,
}

impl RenderArgs {
    /// Command-line flags override the saved preference in either direction.
    fn network_blocked(&self, preference: bool) -> bool {
        if self.allow_network {
            false
        } else if self.block_network {
            true
        } else {
            preference
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Render(args) => run_render(&args),
        Command::Serve { addr } => run_serve(&addr),
        Command::History { show } => run_history(show),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("revela: {error}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_render(args: &RenderArgs) -> PreviewResult<()> {
    let source = charset::decode_source(&read_input(&args.input)?);
    let store = KeyValueStore::open(&StorageConfig::default());
    let preferences = HostPreferences::load(&store).unwrap_or_else(|error| {
        warn!(%error, "preferences unreadable, using defaults");
        HostPreferences::default()
    });

    let view = ViewConfiguration::new(args.mode)
        .with_custom_size(
            args.width.unwrap_or(preferences.custom_width),
            args.height.unwrap_or(preferences.custom_height),
        )
        .with_block_network(args.network_blocked(preferences.block_network));

    if !args.no_history {
        remember(&store, &source, preferences);
    }

    let result = render::run(render::RenderJob {
        source,
        view,
        timeout: Duration::from_millis(args.timeout_ms),
    })?;
    if result.timed_out {
        eprintln!("revela: preview did not settle, output reflects the document at timeout");
    }
    if args.report {
        if let Some(report) = &result.report {
            print_report(report);
        }
    }

    match &args.out {
        Some(path) => fs::write(path, &result.html).map_err(|error| {
            PreviewError::new(
                "cli.write_failed",
                format!("failed to write `{}`: {error}", path.display()),
            )
        }),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(result.html.as_bytes())
                .and_then(|()| stdout.write_all(b"\n"))
                .map_err(|error| PreviewError::new("cli.write_failed", error.to_string()))
        }
    }
}

fn read_input(path: &PathBuf) -> PreviewResult<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .map_err(|error| PreviewError::new("cli.read_failed", error.to_string()))?;
        return Ok(bytes);
    }
    fs::read(path).map_err(|error| {
        PreviewError::new(
            "cli.read_failed",
            format!("failed to read `{}`: {error}", path.display()),
        )
    })
}

/// Records the source as editor content and as a snapshot. Storage problems
/// never fail the render.
fn remember(store: &KeyValueStore, source: &str, mut preferences: HostPreferences) {
    preferences.editor_content = source.to_owned();
    if let Err(error) = preferences.save(store) {
        warn!(%error, "could not save editor content");
    }

    let mut history = SnapshotHistory::load(store);
    if history.record(source, Utc::now()) {
        if let Err(error) = history.persist(store) {
            warn!(%error, "could not save snapshot history");
        }
    }
}

fn print_report(report: &ContextReport) {
    eprintln!(
        "scripts: {} executed, {} failed, {} skipped",
        report.scripts_executed, report.scripts_failed, report.scripts_skipped
    );
    for error in &report.errors {
        eprintln!("  error [{}] {}", error.origin, error.message);
    }
    for capability in &report.blocked {
        eprintln!("  blocked {capability}");
    }
    for request in &report.network_requests {
        eprintln!("  request {} {} via {}", request.method, request.url, request.api);
    }
    for navigation in &report.navigations {
        eprintln!("  navigation ({}) {}", navigation.kind, navigation.url);
    }
    eprintln!("console: {} line(s)", report.console.len());
}

fn run_serve(addr: &str) -> PreviewResult<()> {
    let service = RelayService::new(HttpUpstream::new()?);
    eprintln!("revela relay listening on http://{addr}/api/proxy");
    rv_relay::serve(addr, &service)
}

fn run_history(show: Option<usize>) -> PreviewResult<()> {
    let store = KeyValueStore::open(&StorageConfig::default());
    let history = SnapshotHistory::load(&store);

    if let Some(index) = show {
        let snapshot = history.get(index).ok_or_else(|| {
            PreviewError::new(
                "cli.snapshot_missing",
                format!("no snapshot at index {index} ({} saved)", history.len()),
            )
        })?;
        println!("{}", snapshot.content);
        return Ok(());
    }

    if history.is_empty() {
        println!("no snapshots saved");
        return Ok(());
    }
    for (index, snapshot) in history.entries().iter().enumerate() {
        println!(
            "{index:>2}  {}  {:>7} B  {}",
            snapshot.timestamp,
            snapshot.content.len(),
            charset::one_line_preview(&snapshot.content, HISTORY_PREVIEW_CHARS)
        );
    }
    println!("{} bytes stored", history.size_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use super::Command;
    use clap::Parser;
    use rv_preview::ViewMode;

    #[test]
    fn parses_render_flags() {
        let cli = Cli::try_parse_from([
            "revela",
            "render",
            "page.html",
            "--mode",
            "custom",
            "--width",
            "640",
            "--allow-network",
        ]);
        let Ok(Cli {
            command: Command::Render(args),
        }) = cli
        else {
            panic!("render arguments should parse");
        };
        assert_eq!(args.mode, ViewMode::Custom);
        assert_eq!(args.width, Some(640));
        assert!(args.allow_network);
        assert_eq!(args.timeout_ms, 15_000);
    }

    fn render_args(flags: &[&str]) -> super::RenderArgs {
        let argv = ["revela", "render", "page.html"].iter().chain(flags);
        match Cli::try_parse_from(argv) {
            Ok(Cli {
                command: Command::Render(args),
            }) => args,
            Ok(other) => panic!("unexpected command: {other:?}"),
            Err(error) => panic!("render arguments should parse: {error}"),
        }
    }

    #[test]
    fn network_flags_override_the_saved_preference_both_ways() {
        assert!(render_args(&[]).network_blocked(true));
        assert!(!render_args(&[]).network_blocked(false));
        assert!(!render_args(&["--allow-network"]).network_blocked(true));
        assert!(render_args(&["--block-network"]).network_blocked(false));
        assert!(
            Cli::try_parse_from([
                "revela",
                "render",
                "page.html",
                "--allow-network",
                "--block-network",
            ])
            .is_err()
        );
    }

    #[test]
    fn rejects_unknown_modes() {
        assert!(Cli::try_parse_from(["revela", "render", "x.html", "--mode", "watch"]).is_err());
    }
}
