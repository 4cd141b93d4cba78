//! In-process fake of the meal backend.

#![allow(dead_code)]

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use gupsik_board::{Meal, Review, ReviewSection};
use gupsik_client::{App, ClientConfig, LocalStore};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Command for every open fake socket.
#[derive(Debug, Clone)]
pub enum Push {
    Text(String),
    Close,
}

pub struct FakeState {
    meals: Mutex<HashMap<String, Vec<Meal>>>,
    meal_delays: Mutex<HashMap<String, Duration>>,
    failing_dates: Mutex<HashSet<String>>,
    reviews: Mutex<HashMap<(String, String), (Review, Duration)>>,
    likes: Mutex<HashMap<(String, String), u32>>,
    pub reaction_posts: AtomicU32,
    pub ws_connections: AtomicU32,
    pub ws_client_ids: Mutex<Vec<String>>,
    push: broadcast::Sender<Push>,
}

impl FakeState {
    fn new() -> Self {
        let (push, _) = broadcast::channel(64);
        Self {
            meals: Mutex::new(HashMap::new()),
            meal_delays: Mutex::new(HashMap::new()),
            failing_dates: Mutex::new(HashSet::new()),
            reviews: Mutex::new(HashMap::new()),
            likes: Mutex::new(HashMap::new()),
            reaction_posts: AtomicU32::new(0),
            ws_connections: AtomicU32::new(0),
            ws_client_ids: Mutex::new(Vec::new()),
            push,
        }
    }
}

pub struct FakeBackend {
    pub addr: SocketAddr,
    pub state: Arc<FakeState>,
    task: JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::new());
        let router = Router::new()
            .route("/api/meals/:date", get(meals))
            .route("/api/review/:date/:code", get(review))
            .route("/api/reaction/:date/:code/:kind", post(react))
            .route("/api/reactions/:date", get(reactions))
            .route("/api/visits/total", get(|| async { Json(json!({ "count": 42 })) }))
            .route("/api/visits/today", get(|| async { Json(json!({ "count": 7 })) }))
            .route(
                "/api/dates",
                get(|| async {
                    Json(json!({
                        "dates": ["2024-05-01", "2024-05-02"],
                        "selected_date": "2024-05-02"
                    }))
                }),
            )
            .route(
                "/help/guide.md",
                get(|| async { "# 사용 방법\n날짜를 고르고 좋아요를 누르세요.\n" }),
            )
            .route("/ws", get(ws))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, state, task }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_meals(&self, date: &str, meals: &[(&str, &str)]) {
        let meals = meals
            .iter()
            .map(|(code, name)| Meal::new(*code, *name, format!("{name} 급식")))
            .collect();
        self.state.meals.lock().unwrap().insert(date.to_string(), meals);
    }

    pub fn delay_meals(&self, date: &str, delay: Duration) {
        self.state
            .meal_delays
            .lock()
            .unwrap()
            .insert(date.to_string(), delay);
    }

    pub fn fail_meals(&self, date: &str) {
        self.state.failing_dates.lock().unwrap().insert(date.to_string());
    }

    pub fn set_review(&self, date: &str, code: &str, review: Review) {
        self.set_review_after(date, code, review, Duration::ZERO);
    }

    pub fn set_review_after(&self, date: &str, code: &str, review: Review, delay: Duration) {
        self.state
            .reviews
            .lock()
            .unwrap()
            .insert((date.to_string(), code.to_string()), (review, delay));
    }

    pub fn set_likes(&self, date: &str, code: &str, likes: u32) {
        self.state
            .likes
            .lock()
            .unwrap()
            .insert((date.to_string(), code.to_string()), likes);
    }

    pub fn likes(&self, date: &str, code: &str) -> u32 {
        self.state
            .likes
            .lock()
            .unwrap()
            .get(&(date.to_string(), code.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn reaction_posts(&self) -> u32 {
        self.state.reaction_posts.load(Ordering::SeqCst)
    }

    pub fn ws_connections(&self) -> u32 {
        self.state.ws_connections.load(Ordering::SeqCst)
    }

    pub fn push(&self, event: Value) {
        let _ = self.state.push.send(Push::Text(event.to_string()));
    }

    pub fn push_raw(&self, text: &str) {
        let _ = self.state.push.send(Push::Text(text.to_string()));
    }

    pub fn close_sockets(&self) {
        let _ = self.state.push.send(Push::Close);
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn meals(
    State(state): State<Arc<FakeState>>,
    Path(date): Path<String>,
) -> Result<Json<Vec<Meal>>, StatusCode> {
    let delay = state.meal_delays.lock().unwrap().get(&date).copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if state.failing_dates.lock().unwrap().contains(&date) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    let meals = state.meals.lock().unwrap().get(&date).cloned();
    Ok(Json(meals.unwrap_or_default()))
}

async fn review(
    State(state): State<Arc<FakeState>>,
    Path((date, code)): Path<(String, String)>,
) -> Result<Json<Review>, StatusCode> {
    let found = state.reviews.lock().unwrap().get(&(date, code)).cloned();
    let (review, delay) = found.ok_or(StatusCode::NOT_FOUND)?;
    tokio::time::sleep(delay).await;
    Ok(Json(review))
}

async fn react(
    State(state): State<Arc<FakeState>>,
    Path((date, code, kind)): Path<(String, String, String)>,
) -> Result<Json<Value>, StatusCode> {
    if kind != "like" {
        return Err(StatusCode::BAD_REQUEST);
    }
    state.reaction_posts.fetch_add(1, Ordering::SeqCst);
    let likes = {
        let mut likes = state.likes.lock().unwrap();
        let entry = likes.entry((date, code)).or_insert(0);
        *entry += 1;
        *entry
    };
    Ok(Json(json!({ "likes": likes })))
}

async fn reactions(
    State(state): State<Arc<FakeState>>,
    Path(date): Path<String>,
) -> Json<HashMap<String, Value>> {
    let counts = state
        .likes
        .lock()
        .unwrap()
        .iter()
        .filter(|((d, _), _)| *d == date)
        .map(|((_, code), likes)| (code.clone(), json!({ "likes": likes })))
        .collect();
    Json(counts)
}

async fn ws(
    ws: WebSocketUpgrade,
    Query(query): Query<HashMap<String, String>>,
    State(state): State<Arc<FakeState>>,
) -> Response {
    if let Some(id) = query.get("client_id") {
        state.ws_client_ids.lock().unwrap().push(id.clone());
    }
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(mut socket: WebSocket, state: Arc<FakeState>) {
    let mut push = state.push.subscribe();
    let count = state.ws_connections.fetch_add(1, Ordering::SeqCst) + 1;
    let hello = json!({ "type": "connection_count", "count": count }).to_string();
    if socket.send(Message::Text(hello)).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            command = push.recv() => match command {
                Ok(Push::Text(text)) => {
                    if socket.send(Message::Text(text)).await.is_err() {
                        return;
                    }
                }
                Ok(Push::Close) | Err(_) => {
                    let _ = socket.send(Message::Close(None)).await;
                    return;
                }
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(_)) => {}
                _ => return,
            },
        }
    }
}

/// Client wired to `backend` with a fresh local store.
pub fn client(backend: &FakeBackend) -> (tempfile::TempDir, Arc<App>) {
    client_with(backend, |_| {})
}

pub fn client_with(
    backend: &FakeBackend,
    tweak: impl FnOnce(&mut ClientConfig),
) -> (tempfile::TempDir, Arc<App>) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ClientConfig::default()
        .with_server_url(backend.url())
        .with_data_dir(dir.path());
    config.reconnect_floor = Duration::from_millis(50);
    config.reconnect_ceiling = Duration::from_millis(400);
    config.like_reorder_interval = Duration::from_secs(3600);
    config.request_timeout = Duration::from_secs(5);
    tweak(&mut config);

    let store = Arc::new(LocalStore::open(dir.path()).unwrap());
    let app = App::new(config, store).unwrap();
    (dir, app)
}

/// Poll `check` until it holds, failing after five seconds.
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let reached = tokio::time::timeout(Duration::from_secs(5), async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "timed out waiting for {what}");
}

/// School codes in on-screen order.
pub async fn order(app: &App) -> Vec<String> {
    app.snapshot()
        .await
        .cards
        .into_iter()
        .map(|card| card.school_code)
        .collect()
}

/// Wait until no card is still loading its review.
pub async fn reviews_settled(app: &App) {
    eventually("reviews to settle", || async {
        app.snapshot()
            .await
            .cards
            .iter()
            .all(|card| card.review != ReviewSection::Loading)
    })
    .await;
}
