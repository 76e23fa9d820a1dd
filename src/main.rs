use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use detectdesk::api::{ApiClient, PageRequest, Session};
use detectdesk::cache::{ListPage, ResourceKind, ResourceStore};
use detectdesk::config::Config;
use detectdesk::detail::DetailFetcher;
use detectdesk::session::SessionStore;
use detectdesk::sidebar::SidebarState;
use detectdesk::storage::{
  ClientStorage, SqliteStorage, ACCESS_TOKEN, LOGIN_USER, REFRESH_TOKEN,
};

#[derive(Parser, Debug)]
#[command(name = "detectdesk")]
#[command(about = "Command-line client for the disease-detection admin console")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/detectdesk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Store a credential pair and user blob obtained from a login
  ImportSession {
    #[arg(long)]
    access_token: String,
    #[arg(long)]
    refresh_token: String,
    /// JSON object with at least `user_id` and `role`
    #[arg(long)]
    user: String,
  },
  /// Show the signed-in user
  Whoami,
  /// List one page of a resource (media, model, detection, user, operation)
  List {
    kind: String,
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long, default_value_t = 5)]
    per_page: u32,
    /// Bypass the cache
    #[arg(long)]
    refresh: bool,
  },
  /// Show a single record
  Show { kind: String, id: u64 },
  /// Print or flip the sidebar state
  Sidebar {
    #[arg(long)]
    toggle: bool,
  },
  /// Forget the stored credentials
  Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  detectdesk::logging::init(&config.log_dir());

  let storage: Arc<dyn ClientStorage> = Arc::new(SqliteStorage::open(&config.storage_path()?)?);
  let client = ApiClient::from_config(&config, storage.clone())?;
  let store = ResourceStore::new(client.clone()).with_stale_time(config.cache.stale_time());
  let sessions = SessionStore::new(storage.clone(), client.notifier().clone());

  match args.command {
    Command::ImportSession {
      access_token,
      refresh_token,
      user,
    } => {
      let session: Session =
        serde_json::from_str(&user).map_err(|e| eyre!("Invalid user JSON: {}", e))?;
      storage.set(ACCESS_TOKEN, &access_token)?;
      storage.set(REFRESH_TOKEN, &refresh_token)?;
      storage.set(LOGIN_USER, &user)?;
      tracing::info!(user_id = session.user_id, "session imported");
    }
    Command::Whoami => {
      let session = current_session(&sessions)?;
      print_json(&session)?;
    }
    Command::List {
      kind,
      page,
      per_page,
      refresh,
    } => {
      let kind = parse_kind(&kind)?;
      let page = PageRequest::new(page, per_page);
      match kind {
        ResourceKind::Media => {
          let session = current_session(&sessions)?;
          print_page(store.fetch_media_list(&session, page, refresh).await)?
        }
        ResourceKind::Model => print_page(store.fetch_model_list(page, refresh).await)?,
        ResourceKind::Detection => {
          let session = current_session(&sessions)?;
          print_page(store.fetch_detection_list(&session, page, refresh).await)?
        }
        ResourceKind::User => {
          let session = current_session(&sessions)?;
          print_page(store.fetch_user_list(&session, page, refresh).await)?
        }
        ResourceKind::Operation => {
          let session = current_session(&sessions)?;
          print_page(store.fetch_operation_list(&session, page, refresh).await)?
        }
      }
    }
    Command::Show { kind, id } => {
      let details = DetailFetcher::new(client.clone());
      match parse_kind(&kind)? {
        ResourceKind::Media => print_json(&details.get_media_detail(id).await?)?,
        ResourceKind::Model => print_json(&details.get_model_detail(id).await?)?,
        ResourceKind::Detection => print_json(&details.get_detection_detail(id).await?)?,
        ResourceKind::User => print_json(&details.get_user_detail(id).await?)?,
        ResourceKind::Operation => print_json(&details.get_operation_detail(id).await?)?,
      }
    }
    Command::Sidebar { toggle } => {
      let mut sidebar = SidebarState::load(storage.clone())?;
      if toggle {
        sidebar.toggle()?;
      }
      println!(
        "{}",
        if sidebar.is_collapsed() {
          "collapsed"
        } else {
          "expanded"
        }
      );
    }
    Command::Logout => {
      client.logout()?;
      store.clear_cache();
      tracing::info!("logged out");
    }
  }

  Ok(())
}

fn parse_kind(kind: &str) -> Result<ResourceKind> {
  ResourceKind::parse(kind).ok_or_else(|| {
    eyre!(
      "Unknown resource kind '{}' (expected media, model, detection, user or operation)",
      kind
    )
  })
}

fn current_session(sessions: &SessionStore) -> Result<Session> {
  sessions
    .load_session()
    .ok_or_else(|| eyre!("Not logged in; run `detectdesk import-session` first"))
}

fn print_page<T: Serialize>(page: ListPage<T>) -> Result<()> {
  if let Some(err) = page.error {
    return Err(eyre!("{}", err));
  }
  if page.from_cache {
    tracing::info!("served from cache");
  }
  print_json(&serde_json::json!({ "items": page.items, "total": page.total }))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
