//! Gupsik Client - Live School-Meal Review Board
//!
//! Connects to the meal backend, shows one card per school for a chosen
//! date and keeps the cards live: reviews reorder the board by score, likes
//! arrive over a WebSocket and the board periodically reorders by likes.
//!
//! # Architecture
//!
//! - **Config**: Environment-driven [`ClientConfig`]
//! - **Storage**: RocksDB-backed client id and like counters
//! - **API**: HTTP calls to the backend
//! - **WebSocket**: Auto-reconnecting [`ConnectionManager`] with a dispatch table
//! - **Limiter**: Per (date, school) like cap
//! - **App**: Date sessions, card store and board reconciliation
//!
//! # Example
//!
//! ```no_run
//! use gupsik_client::{App, ClientConfig, ClientIdentity, LocalStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::from_env()?;
//!     let store = Arc::new(LocalStore::open(&config.data_dir)?);
//!     let identity = ClientIdentity::load_or_create(&store)?;
//!     let app = App::new(config, store)?;
//!     let _connection = app.connect(&identity);
//!     app.select_date("2024-05-02").await?;
//!     println!("{}", app.snapshot().await.render());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod identity;
pub mod limiter;
pub mod session;
pub mod storage;
pub mod ws;

pub use api::ApiClient;
pub use app::{App, BoardSnapshot, Notice};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use identity::ClientIdentity;
pub use limiter::{ReactionLimiter, Reservation, DEFAULT_LIKE_CAP};
pub use session::{DateSession, SessionToken};
pub use storage::LocalStore;
pub use ws::{
    Backoff, ConnectionHandle, ConnectionManager, ConnectionState, Dispatcher, EventKind, Handler,
    ServerEvent,
};
