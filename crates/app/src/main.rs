use std::path::PathBuf;

use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use stadium_config::Config;
use stadium_models::{Role, TicketStatus, UserInput, Window, schema, table};
use stadium_server::auth::AuthKeys;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::OffsetTime;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const GIT_HASH: &str = env!("STADIUM_GIT_HASH");

fn version_string() -> String {
    format!("{VERSION} ({GIT_HASH})")
}

// --- CLI definition ---

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Parser)]
#[command(name = "stadium")]
#[command(about = "Stadium venue management backend")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("STADIUM_GIT_HASH"), ")"))]
struct Cli {
    /// Log level (default: config file / STADIUM_LOG_LEVEL, else info)
    #[arg(short, long, global = true)]
    log_level: Option<LogLevel>,

    /// Display log timestamps in UTC (default: local time)
    #[arg(long, global = true)]
    utc: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Database URL
    #[arg(long, global = true)]
    db_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,
        /// Serve the built frontend from this directory
        #[arg(long)]
        static_dir: Option<PathBuf>,
        /// Disable the websocket notification channel
        #[arg(long)]
        no_realtime: bool,
    },
    /// Create a user account (use --role admin for the first administrator)
    AddUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "user")]
        role: Role,
    },
    /// List all games
    ListGames,
    /// List tickets, optionally for one game
    ListTickets {
        /// Only tickets for this game id
        #[arg(long)]
        game: Option<i64>,
    },
}

impl Cli {
    /// Layer the global flags over the loaded config.
    fn apply(&self, config: &mut Config) {
        if let Some(level) = &self.log_level {
            config.log_level = level.to_string();
        }
        if self.utc {
            config.utc = true;
        }
        if self.log_json {
            config.log_json = true;
        }
        if let Some(url) = &self.db_url {
            config.db_url = url.clone();
        }
    }
}

// --- Logging ---

fn init_logging(config: &Config) {
    let filter = EnvFilter::new(&config.log_level);

    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_timer(OffsetTime::new(
                time::UtcOffset::UTC,
                time::macros::format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
                ),
            ))
            .init();
    } else if config.utc {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(OffsetTime::new(
                time::UtcOffset::UTC,
                time::macros::format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
                ),
            ))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(LocalTimer)
            .init();
    }
}

struct LocalTimer;

impl tracing_subscriber::fmt::time::FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

// --- Table output ---

fn print_table(columns: &[&str], rows: &serde_json::Value, upload_base: &str) {
    let cells = table::render_rows(columns, rows, upload_base);
    let rendered: Vec<Vec<String>> = cells
        .iter()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            rendered
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(name.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: Vec<&str>| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{v:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", line(columns.to_vec()));
    println!("{}", "-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
    for row in &rendered {
        println!("{}", line(row.iter().map(String::as_str).collect()));
    }
}

// --- Main ---

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load();
    cli.apply(&mut config);
    init_logging(&config);

    match cli.command {
        Commands::Serve { port, host, static_dir, no_realtime } => {
            if let Some(port) = port {
                config.port = port;
            }
            if host.is_some() {
                config.host = host;
            }
            if static_dir.is_some() {
                config.static_dir = static_dir;
            }
            if no_realtime {
                config.realtime = false;
            }
            info!("Stadium v{}", version_string());
            let pool = stadium_server::open_database(&config).await?;
            stadium_server::serve(&config, pool).await?;
        }
        Commands::AddUser { username, email, password, role } => {
            let payload = json!({ "username": username, "email": email, "password": password, "role": role });
            let input: UserInput = schema::parse(&schema::NEW_USER, &payload)?;
            let pool = stadium_server::open_database(&config).await?;
            let hash = AuthKeys::from_config(&config).hash_password(input.password).await?;
            let user = stadium_db::insert_user(&pool, &input.username, &input.email, &hash, input.role).await?;
            println!("Added user: {} <{}> role={} (id={})", user.username, user.email, user.role, user.id);
        }
        Commands::ListGames => {
            let pool = stadium_server::open_database(&config).await?;
            let page = stadium_db::list_games(&pool, Window::ALL).await?;
            if page.data.is_empty() {
                println!("No games found.");
            } else {
                let rows = serde_json::to_value(&page)?;
                print_table(&["id", "date", "name", "team.home", "team.visitor", "image"], &rows, &config.upload_base_url);
                println!("\n{} game(s) total", page.pagination.total);
            }
        }
        Commands::ListTickets { game } => {
            let pool = stadium_server::open_database(&config).await?;
            let page = stadium_db::list_tickets(&pool, game, Window::ALL).await?;
            if page.data.is_empty() {
                println!("No tickets found.");
            } else {
                let rows = serde_json::to_value(&page)?;
                print_table(
                    &["id", "game_id", "section", "row", "seat", "price", "status", "owner_id"],
                    &rows,
                    &config.upload_base_url,
                );
                let available = page.data.iter().filter(|t| t.status == TicketStatus::Available).count();
                println!("\n{available}/{} ticket(s) available", page.pagination.total);
            }
        }
    }

    Ok(())
}
