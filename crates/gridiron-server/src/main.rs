// Gridiron entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open the record store and the model client
// 4. Run the requested subcommand (serve by default)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use gridiron_app::jobs::{self, PopulateOptions};
use gridiron_app::AppContext;
use gridiron_core::config;
use gridiron_server::{router, AppState};

#[derive(Parser)]
#[command(name = "gridiron", version, about = "Fantasy football draft assistant")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the web page and REST API.
    Serve,

    /// Rebuild the player store from every configured source.
    Populate {
        /// Rankings PDF to include.
        #[arg(long)]
        pdf: Option<PathBuf>,

        /// Rankings CSV to include.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Extract PDF rankings with the language model.
        #[arg(long)]
        openai: bool,

        /// Skip consensus ADP.
        #[arg(long)]
        no_adp: bool,

        /// Ignore the records already in the store.
        #[arg(long)]
        fresh: bool,

        /// Skip the Sleeper player catalog.
        #[arg(long)]
        no_sleeper: bool,

        /// ESPN league to include; defaults to the configured league.
        #[arg(long, env = "ESPN_LEAGUE_ID")]
        espn_league_id: Option<String>,
    },

    /// Upsert the players of one ESPN league.
    PopulateEspn {
        #[arg(long, env = "ESPN_LEAGUE_ID")]
        league_id: Option<String>,
    },

    /// Re-validate, deduplicate and re-rank the stored players.
    Clean {
        #[arg(long)]
        no_adp: bool,
    },

    /// Mark the picks of a Sleeper draft as drafted.
    SyncDraft {
        #[arg(long, required_unless_present = "user")]
        draft_id: Option<String>,

        /// List this Sleeper user's drafts instead of syncing.
        #[arg(long)]
        user: Option<String>,
    },

    /// Print store statistics.
    Stats,

    /// Print the load and roster validation reports.
    Report,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Gridiron starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: season {}, {:?} backend, cache at {}",
        config.season(),
        config.storage.backend,
        config.cache_dir().display()
    );

    // 3. Open the record store and the model client
    let ctx = AppContext::open(config)?;
    info!("Record store opened ({})", ctx.store.backend_name());

    // 4. Run the requested subcommand
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(ctx).await?,
        Command::Populate {
            pdf,
            csv,
            openai,
            no_adp,
            fresh,
            no_sleeper,
            espn_league_id,
        } => {
            let opts = PopulateOptions {
                fresh,
                include_sleeper: !no_sleeper,
                espn_league_id,
                pdf,
                csv,
                use_llm: openai,
                with_adp: !no_adp,
            };
            let summary = jobs::populate(&ctx, &opts).await?;
            println!(
                "Reconciled {} raw rows into {} players (store held {} before)",
                summary.counts.raw, summary.counts.output, summary.before
            );
            println!(
                "Dropped: {} malformed, {} not on an active roster, {} not fantasy relevant; merged {} exact, {} fuzzy",
                summary.counts.malformed,
                summary.counts.rejected,
                summary.counts.irrelevant,
                summary.counts.merged_exact,
                summary.counts.merged_fuzzy
            );
            print!("{}", summary.report.render());
        }
        Command::PopulateEspn { league_id } => {
            let count = jobs::populate_espn(&ctx, league_id.as_deref()).await?;
            println!("Upserted {count} players from ESPN");
        }
        Command::Clean { no_adp } => {
            let report = jobs::clean(&ctx, !no_adp).await?;
            print!("{}", report.render());
        }
        Command::SyncDraft { draft_id, user } => {
            if let Some(draft_id) = draft_id {
                let summary = jobs::sync_draft(&ctx, &draft_id).await?;
                println!("Marked {}/{} picks as drafted", summary.marked, summary.picks);
                for name in &summary.unmatched {
                    println!("  not found: {name}");
                }
            } else if let Some(user) = user {
                let drafts = jobs::user_drafts(&ctx, &user).await?;
                if drafts.is_empty() {
                    println!("No drafts found for {user}");
                }
                for (id, status) in drafts {
                    println!("{id}  {status}");
                }
            }
        }
        Command::Stats => {
            print!("{}", jobs::database_stats(&ctx)?.render());
        }
        Command::Report => {
            let (load, validation) = jobs::report(&ctx).await?;
            print!("{}", load.render());
            println!(
                "Roster validation: {}/{} valid ({:.1}%) against {} active players",
                validation.valid_players,
                validation.total_players,
                validation.validation_rate,
                validation.active_nfl_count
            );
            for line in &validation.sample_invalid {
                println!("  invalid: {line}");
            }
            for line in &validation.team_issues {
                println!("  team issue: {line}");
            }
        }
    }

    Ok(())
}

async fn serve(ctx: AppContext) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port)
        .parse()
        .context("invalid server address")?;
    let app = router(Arc::new(AppState::new(ctx)));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Serving on http://{addr}");
    println!("Serving on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Ctrl+C received, shutting down");
        })
        .await
        .context("server error")?;
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("gridiron.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gridiron=info,gridiron_app=info,gridiron_server=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
