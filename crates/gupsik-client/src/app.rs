//! Application state.
//!
//! [`App`] is the single object that owns everything the board needs: the
//! API client, the reaction limiter, the card store and board, the header
//! counters and the active [`DateSession`]. It is created once at start-up
//! and shared as `Arc<App>`.
//!
//! # Flows
//!
//! - **Date selection**: end the old session, fetch meals, lay out cards,
//!   fetch one review per school concurrently, start the likes ticker.
//! - **Review arrival**: update that school's row, reorder by score.
//! - **Like click**: check the local cap, POST, show the server's count.
//! - **Push event**: update the connection counter or a school's likes.
//!
//! Every change bumps a revision on a `watch` channel so a front-end can
//! redraw; user-facing problems go out as [`Notice`]s.

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::identity::ClientIdentity;
use crate::limiter::ReactionLimiter;
use crate::session::{DateSession, SessionToken};
use crate::storage::LocalStore;
use crate::ws::{Backoff, ConnectionManager, Dispatcher, EventKind, ServerEvent};
use gupsik_board::{
    parse_date, render_board, Board, BoardHeader, CardStore, CardView, HelpGuide, ReactionCount,
    ReactionKind, ReorderMode, Review, ReviewSection, HIGHLIGHT_DURATION,
};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tracing::{debug, info, trace, warn};

/// Shown when the meal list of a date cannot be loaded.
pub const MEALS_FAILED_MESSAGE: &str = "데이터를 불러오는 중 오류가 발생했습니다.";

/// Shown when a reaction could not be saved.
pub const REACTION_FAILED_MESSAGE: &str = "반응을 저장하는 중 오류가 발생했습니다.";

/// Shown when the live connection has a problem.
pub const CONNECTION_PROBLEM_MESSAGE: &str =
    "실시간 연결에 문제가 발생했습니다. 잠시 후 다시 시도해주세요.";

/// User-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A request failed
    Error(String),
    /// Local like cap reached for a school
    RateLimited { school_name: String, cap: u32 },
    /// Live connection dropped or could not be opened
    ConnectionProblem(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Error(message) => f.write_str(message),
            Notice::RateLimited { school_name, cap } => write!(
                f,
                "{school_name}: 한 학교 급식에 대한 좋아요는 최대 {cap}회까지만 가능합니다."
            ),
            Notice::ConnectionProblem(_) => f.write_str(CONNECTION_PROBLEM_MESSAGE),
        }
    }
}

/// Everything shown on screen at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSnapshot {
    pub header: BoardHeader,
    pub banner: Option<String>,
    pub cards: Vec<CardView>,
}

impl BoardSnapshot {
    /// Render as plain text.
    pub fn render(&self) -> String {
        render_board(&self.header, self.banner.as_deref(), &self.cards)
    }
}

#[derive(Default)]
struct ViewState {
    store: CardStore,
    board: Board,
    header: BoardHeader,
    help: Option<HelpGuide>,
}

/// Application state shared by the front-end, timers and push handlers.
pub struct App {
    config: ClientConfig,
    api: ApiClient,
    limiter: ReactionLimiter,
    view: RwLock<ViewState>,
    session: Mutex<Option<DateSession>>,
    connection: Mutex<Option<Arc<ConnectionManager>>>,
    generation: AtomicU64,
    revision: watch::Sender<u64>,
    notices: broadcast::Sender<Notice>,
}

impl App {
    /// Create the application state.
    pub fn new(config: ClientConfig, store: Arc<LocalStore>) -> Result<Arc<Self>> {
        let api = ApiClient::new(&config)?;
        let limiter = ReactionLimiter::new(store, config.like_cap);
        let (revision, _) = watch::channel(0);
        let (notices, _) = broadcast::channel(64);

        Ok(Arc::new(Self {
            config,
            api,
            limiter,
            view: RwLock::new(ViewState::default()),
            session: Mutex::new(None),
            connection: Mutex::new(None),
            generation: AtomicU64::new(0),
            revision,
            notices,
        }))
    }

    /// Configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// API client in use.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Reaction limiter in use.
    pub fn limiter(&self) -> &ReactionLimiter {
        &self.limiter
    }

    /// Receive a new revision number after every visible change.
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Receive user-visible notifications.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Date currently selected.
    pub fn active_date(&self) -> Option<String> {
        self.lock_session().as_ref().map(|s| s.date().to_string())
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<DateSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, token: &SessionToken) -> bool {
        !token.is_cancelled() && self.generation.load(Ordering::SeqCst) == token.generation()
    }

    fn notify(&self, notice: Notice) {
        // No receivers is fine
        let _ = self.notices.send(notice);
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    /// Redraw after a highlight has run its course.
    fn schedule_highlight_clear(self: &Arc<Self>) {
        let app = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(HIGHLIGHT_DURATION).await;
            app.bump();
        });
    }

    /// Drain dirty rows and publish a new revision.
    fn flush(&self, view: &mut ViewState) {
        let dirty = view.store.take_dirty();
        if !dirty.is_empty() {
            for card in view.board.views_of(&dirty, &view.store, Instant::now()) {
                trace!(school_code = %card.school_code, likes = card.likes, total = card.total_score, "Card re-rendered");
            }
        }
        self.bump();
    }

    /// Show the cards of `date`.
    ///
    /// Ends the previous date's session, so its in-flight reviews and its
    /// likes ticker no longer touch the board. Returns once the meal list
    /// is laid out; reviews keep arriving in the background.
    pub async fn select_date(self: &Arc<Self>, date: &str) -> Result<()> {
        parse_date(date)?;

        let token = {
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let session = DateSession::new(date, generation);
            let token = session.token();
            // Dropping the previous session cancels it.
            *self.lock_session() = Some(session);
            token
        };
        info!(date, generation = token.generation(), "Date selected");

        {
            let mut view = self.view.write().await;
            if !self.is_current(&token) {
                return Ok(());
            }
            view.store.set_meal_set(date, &[]);
            view.board.clear();
            view.header.date = Some(date.to_string());
            view.store.take_dirty();
            self.bump();
        }

        let Some(fetched) = token.run_until_cancelled(self.api.meals(date)).await else {
            debug!(date, "Meal fetch superseded");
            return Ok(());
        };

        let codes = {
            let mut view = self.view.write().await;
            if !self.is_current(&token) {
                debug!(date, "Dropping stale meal list");
                return Ok(());
            }
            match fetched {
                Ok(meals) => {
                    view.store.set_meal_set(date, &meals);
                    let codes = view.board.render_meal_set(&meals);
                    self.flush(&mut view);
                    codes
                }
                Err(e) => {
                    warn!(date, "Failed to load meals: {}", e);
                    view.board.show_error(MEALS_FAILED_MESSAGE);
                    self.flush(&mut view);
                    self.notify(Notice::Error(MEALS_FAILED_MESSAGE.to_string()));
                    return Err(e);
                }
            }
        };
        info!(date, schools = codes.len(), "Meals rendered");

        for code in codes {
            let app = Arc::clone(self);
            let token = token.clone();
            tokio::spawn(async move {
                let fetched = token
                    .run_until_cancelled(app.api.review(token.date(), &code))
                    .await;
                if let Some(result) = fetched {
                    app.apply_review_result(&token, &code, result).await;
                }
            });
        }

        let app = Arc::clone(self);
        let ticker_token = token.clone();
        let period = self.config.like_reorder_interval;
        if let Some(session) = self.lock_session().as_mut() {
            if session.generation() == token.generation() {
                session.start_ticker(period, move || {
                    let app = Arc::clone(&app);
                    let token = ticker_token.clone();
                    async move {
                        app.reorder_for(&token, ReorderMode::Likes).await;
                    }
                });
            }
        }

        Ok(())
    }

    async fn apply_review_result(
        self: &Arc<Self>,
        token: &SessionToken,
        school_code: &str,
        result: Result<Option<Review>>,
    ) {
        let mut view = self.view.write().await;
        if !self.is_current(token) {
            debug!(school_code, date = token.date(), "Dropping stale review");
            return;
        }

        let section = match &result {
            Ok(Some(review)) => ReviewSection::Ready {
                text: review.review.clone(),
            },
            Ok(None) => ReviewSection::Missing,
            Err(e) => {
                warn!(school_code, "Failed to load review: {}", e);
                ReviewSection::Failed
            }
        };
        let review = result.ok().flatten();

        view.store.apply_review(school_code, review.as_ref());
        view.board.set_review_section(school_code, section);

        let ViewState { store, board, .. } = &mut *view;
        let pass = board.reconcile(ReorderMode::Score, store, Instant::now());
        self.flush(&mut view);
        drop(view);

        if pass.changed() {
            self.schedule_highlight_clear();
        }
    }

    async fn reorder_for(self: &Arc<Self>, token: &SessionToken, mode: ReorderMode) {
        let mut view = self.view.write().await;
        if !self.is_current(token) {
            return;
        }
        let ViewState { store, board, .. } = &mut *view;
        let pass = board.reconcile(mode, store, Instant::now());
        debug!(?mode, moved = pass.moved.len(), "Periodic reorder");
        self.flush(&mut view);
        drop(view);

        if pass.changed() {
            self.schedule_highlight_clear();
        }
    }

    /// Re-sort the current cards now.
    pub async fn reorder(self: &Arc<Self>, mode: ReorderMode) -> Vec<String> {
        let mut view = self.view.write().await;
        let ViewState { store, board, .. } = &mut *view;
        let pass = board.reconcile(mode, store, Instant::now());
        self.flush(&mut view);
        drop(view);

        if pass.changed() {
            self.schedule_highlight_clear();
        }
        pass.order
    }

    /// Like a school's meal on the active date.
    ///
    /// Refused locally once this client has liked the school
    /// [`ClientConfig::like_cap`] times that day; nothing is sent then. On
    /// success the card shows the server's count and the local counter
    /// goes up by one.
    pub async fn react(&self, school_code: &str) -> Result<ReactionCount> {
        let date = self
            .active_date()
            .ok_or_else(|| Error::InvalidInput("no date selected".into()))?;

        let school_name = {
            let view = self.view.read().await;
            let card = match view.store.date() {
                Some(shown) if shown == date => view.store.get(school_code),
                _ => None,
            };
            match card {
                Some(card) => card.school_name.clone(),
                None => {
                    warn!(date, school_code, "No card for school");
                    return Err(Error::NotFound(format!("school {school_code}")));
                }
            }
        };

        let Some(reservation) = self.limiter.try_reserve(&date, school_code)? else {
            info!(date, school_code, "Like cap reached, not sending");
            self.notify(Notice::RateLimited {
                school_name,
                cap: self.limiter.cap(),
            });
            return Err(Error::RateLimitExceeded {
                date,
                school_code: school_code.to_string(),
            });
        };

        let count = match self.api.react(&date, school_code, ReactionKind::Like).await {
            Ok(count) => count,
            Err(e) => {
                warn!(school_code, "Failed to send reaction: {}", e);
                self.notify(Notice::Error(REACTION_FAILED_MESSAGE.to_string()));
                return Err(e);
            }
        };

        reservation.commit()?;

        let mut view = self.view.write().await;
        if view.store.date() == Some(date.as_str()) {
            view.store.apply_reaction_update(school_code, count.likes);
            self.flush(&mut view);
        }
        Ok(count)
    }

    /// Apply a message pushed by the server.
    pub async fn handle_event(&self, event: ServerEvent) {
        let mut view = self.view.write().await;
        match event {
            ServerEvent::ConnectionCount { count } => {
                view.header.connections = Some(count);
            }
            ServerEvent::Reaction { school_code, likes } => {
                if !view.store.apply_reaction_update(&school_code, likes) {
                    debug!(school_code, "Reaction for a school not on screen");
                    return;
                }
            }
        }
        self.flush(&mut view);
    }

    /// Reload both visitor counters.
    pub async fn refresh_visits(&self) -> Result<()> {
        let total = self.api.total_visits().await;
        let today = self.api.today_visits().await;

        let mut view = self.view.write().await;
        if let Ok(total) = &total {
            view.header.total_visits = Some(*total);
        }
        if let Ok(today) = &today {
            view.header.today_visits = Some(*today);
        }
        self.flush(&mut view);
        drop(view);

        total.and(today).map(|_| ()).map_err(|e| {
            warn!("Failed to load visit counts: {}", e);
            e
        })
    }

    /// Reload every like count of the active date in one call.
    pub async fn refresh_reactions(&self) -> Result<usize> {
        let token = self
            .lock_session()
            .as_ref()
            .map(DateSession::token)
            .ok_or_else(|| Error::InvalidInput("no date selected".into()))?;

        let Some(fetched) = token
            .run_until_cancelled(self.api.reactions(token.date()))
            .await
        else {
            return Ok(0);
        };
        let counts = fetched?;

        let mut view = self.view.write().await;
        if !self.is_current(&token) {
            return Ok(0);
        }
        let mut applied = 0;
        for (code, count) in &counts {
            if view.store.apply_reaction_update(code, count.likes) {
                applied += 1;
            }
        }
        debug!(date = token.date(), applied, "Like counts refreshed");
        self.flush(&mut view);
        Ok(applied)
    }

    /// Load the help guide.
    pub async fn load_help(&self) -> Result<HelpGuide> {
        let guide = self.api.help_guide().await.map_err(|e| {
            warn!("Failed to load help guide: {}", e);
            e
        })?;
        self.view.write().await.help = Some(guide.clone());
        Ok(guide)
    }

    /// Help guide loaded so far.
    pub async fn help(&self) -> Option<HelpGuide> {
        self.view.read().await.help.clone()
    }

    /// Everything on screen right now.
    pub async fn snapshot(&self) -> BoardSnapshot {
        let view = self.view.read().await;
        BoardSnapshot {
            header: view.header.clone(),
            banner: view.board.banner().map(str::to_string),
            cards: view.board.views(&view.store, Instant::now()),
        }
    }

    /// Open the live connection and route its events into this app.
    ///
    /// Push events are applied in arrival order by one task; connection
    /// problems become [`Notice::ConnectionProblem`]. Later calls return the
    /// same manager and only nudge it to reconnect.
    pub fn connect(self: &Arc<Self>, identity: &ClientIdentity) -> Arc<ConnectionManager> {
        let mut connection = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(manager) = connection.as_ref() {
            manager.connect();
            return Arc::clone(manager);
        }

        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<ServerEvent>();
        let dispatcher = Arc::new(Dispatcher::new());
        for kind in [EventKind::ConnectionCount, EventKind::Reaction] {
            let events_tx = events_tx.clone();
            dispatcher.subscribe(
                kind,
                Box::new(move |event: &ServerEvent| {
                    let _ = events_tx.send(event.clone());
                }),
            );
        }

        let manager = ConnectionManager::new(
            self.config.ws_url(identity.as_str()),
            dispatcher,
            Backoff::new(self.config.reconnect_floor, self.config.reconnect_ceiling),
        );

        let app = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                app.handle_event(event).await;
            }
        });

        let app = Arc::clone(self);
        let mut problems = manager.problems();
        tokio::spawn(async move {
            loop {
                match problems.recv().await {
                    Ok(problem) => app.notify(Notice::ConnectionProblem(problem)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        manager.connect();
        *connection = Some(Arc::clone(&manager));
        manager
    }

    /// Live connection, once [`connect`](Self::connect) has been called.
    pub fn connection(&self) -> Option<Arc<ConnectionManager>> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// End the active date session and shut the live connection down.
    pub async fn close(&self) {
        if let Some(mut session) = self.lock_session().take() {
            session.end();
        }
        let connection = self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(manager) = connection {
            manager.shutdown().await;
        }
    }
}
