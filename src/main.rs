use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use coachmarks::cache::{Backend, KeyValueStore, NoticeCache};
use coachmarks::config::Config;
use coachmarks::logging;
use coachmarks::notice::{page_relative_path, ListClient};

#[derive(Parser, Debug)]
#[command(name = "coachmarks")]
#[command(about = "Onboarding notices for SharePoint sites")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/coachmarks/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List the notices that should be shown now
  Show {
    /// Only notices for this page (absolute URL or site-relative path)
    #[arg(short, long)]
    page: Option<String>,
  },
  /// Mark a notice as dismissed by the current user
  Ack {
    /// List item id of the notice
    id: i64,
  },
  /// Print what is cached for the configured site
  Status,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init();

  let config = Config::load(args.config.as_deref())?;
  let source = Arc::new(ListClient::new(&config)?);

  // An unusable cache directory degrades to uncached fetches
  let cache = NoticeCache::new(Backend::open(config.cache.enabled), source);
  run(args.command, &config, cache).await
}

async fn run<S: KeyValueStore + 'static>(
  command: Command,
  config: &Config,
  cache: NoticeCache<S>,
) -> Result<()> {
  let cache = cache
    .with_stale_time(config.stale_time())
    .with_always_refresh(config.cache.always_refresh);
  let scope = config.scope();

  match command {
    Command::Show { page } => {
      let notices = cache.current_notices(&scope).await?;
      let page = page.map(|p| page_relative_path(&p, &config.site.url).to_string());

      for notice in notices
        .iter()
        .filter(|n| n.visible)
        .filter(|n| page.as_deref().map_or(true, |p| n.applies_to_page(p)))
      {
        println!(
          "{:>6}  {:<6}  {}  [{}]",
          notice.id, notice.frequency, notice.title, notice.element_id
        );
      }
    }
    Command::Ack { id } => {
      let snapshot = cache.snapshot(&scope);
      match snapshot.notices.iter().find(|n| n.id == id) {
        Some(notice) => info!(
          notice = id,
          title = %notice.title,
          element_id = %notice.element_id,
          user = config.user.as_deref().unwrap_or_default(),
          "notice dismissed"
        ),
        None => warn!(notice = id, "acknowledging notice that is not cached"),
      }

      cache.acknowledge(&scope, id);
      println!("Acknowledged notice {}", id);
    }
    Command::Status => {
      let snapshot = cache.snapshot(&scope);
      match snapshot.loaded_at {
        Some(at) => println!("Loaded:   {}", at.to_rfc3339()),
        None => println!("Loaded:   never"),
      }
      println!(
        "Notices:  {} ({} enabled)",
        snapshot.notices.len(),
        snapshot.notices.iter().filter(|n| n.enabled).count()
      );
      for ack in &snapshot.acknowledgments {
        println!("  ack {:>6} at {}", ack.id, ack.acknowledged_at.to_rfc3339());
      }
    }
  }

  Ok(())
}
