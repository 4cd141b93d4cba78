//! Gupsik terminal client
//!
//! Prints the board for the selected date and redraws it on every change.
//! Commands are read from stdin, one per line:
//!
//! ```text
//! date YYYY-MM-DD   show another date
//! dates             list selectable dates
//! like <code>       like a school's meal
//! sort score|likes  reorder now
//! reactions         reload like counts
//! visits            reload visitor counters
//! help              show the help guide
//! quit              exit
//! ```

use chrono::Local;
use gupsik_board::{format_date, selectable_dates, ReorderMode};
use gupsik_client::{App, ClientConfig, ClientIdentity, Error, LocalStore};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries the board
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gupsik=info,gupsik_client=info,gupsik_board=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!(server = %config.server_url, data_dir = %config.data_dir.display(), "Starting gupsik client");

    std::fs::create_dir_all(&config.data_dir)?;
    let store = Arc::new(LocalStore::open(&config.data_dir)?);
    let identity = ClientIdentity::load_or_create(&store)?;
    tracing::info!(client_id = %identity, "Client identity loaded");

    let app = App::new(config, store)?;
    app.connect(&identity);

    spawn_printers(&app);

    let today = Local::now().date_naive();
    let dates = selectable_dates(today);
    let start = if dates.contains(&today) {
        today
    } else {
        dates.first().copied().unwrap_or(today)
    };
    if let Err(e) = app.select_date(&format_date(start)).await {
        tracing::warn!("Initial date failed to load: {}", e);
    }
    if let Err(e) = app.refresh_visits().await {
        tracing::debug!("Visit counters unavailable: {}", e);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let result = match (words.next(), words.next()) {
            (None, _) => continue,
            (Some("quit" | "exit"), _) => break,
            (Some("date"), Some(date)) => app.select_date(date).await,
            (Some("dates"), _) => {
                for date in selectable_dates(Local::now().date_naive()) {
                    println!("{}", format_date(date));
                }
                Ok(())
            }
            (Some("like"), Some(code)) => app.react(code).await.map(|count| {
                println!("{code}: ♥ {}", count.likes);
            }),
            (Some("sort"), Some(mode)) => match mode.parse::<ReorderMode>() {
                Ok(mode) => {
                    app.reorder(mode).await;
                    Ok(())
                }
                Err(e) => Err(Error::InvalidInput(e)),
            },
            (Some("reactions"), _) => app.refresh_reactions().await.map(|n| {
                println!("{n} like counts updated");
            }),
            (Some("visits"), _) => app.refresh_visits().await,
            (Some("help"), _) => app.load_help().await.map(|guide| {
                println!("# {}\n{}", guide.title, guide.body);
            }),
            (Some(other), _) => {
                println!("unknown command: {other}");
                Ok(())
            }
        };

        match result {
            // Notices already reach the user
            Err(Error::RateLimitExceeded { .. }) => {}
            Err(e) => println!("error: {e}"),
            Ok(()) => {}
        }
    }

    app.close().await;
    tracing::info!("Bye");
    Ok(())
}

/// Print the board on every change and every notice as it arrives.
fn spawn_printers(app: &Arc<App>) {
    let board_app = Arc::clone(app);
    let mut changes = app.subscribe_changes();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            println!("{}", board_app.snapshot().await.render());
        }
    });

    let mut notices = app.notices();
    tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(notice) => println!("** {notice}"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
