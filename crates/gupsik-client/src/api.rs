//! HTTP API client for the meal backend.
//!
//! | call | endpoint |
//! |---|---|
//! | [`ApiClient::meals`] | `GET /api/meals/{date}` |
//! | [`ApiClient::review`] | `GET /api/review/{date}/{school_code}` |
//! | [`ApiClient::react`] | `POST /api/reaction/{date}/{school_code}/{kind}` |
//! | [`ApiClient::reactions`] | `GET /api/reactions/{date}` |
//! | [`ApiClient::total_visits`] | `GET /api/visits/total` |
//! | [`ApiClient::today_visits`] | `GET /api/visits/today` |
//! | [`ApiClient::dates`] | `GET /api/dates` |
//! | [`ApiClient::help_guide`] | `GET /help/guide.md` |

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use gupsik_board::{
    parse_date, DateRange, HelpGuide, Meal, ReactionCount, ReactionKind, Review, VisitCount,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Request/response client for the backend.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the configured backend.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            base_url: config.server_url.clone(),
        })
    }

    /// Base URL requests go to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(path, "GET");
        let response = self.http.get(self.url(path)).send().await?;
        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }

    /// Meals of every school for `date`.
    pub async fn meals(&self, date: &str) -> Result<Vec<Meal>> {
        parse_date(date)?;
        self.get_json(&format!("/api/meals/{date}")).await
    }

    /// Review of one school, `None` when the backend has none yet.
    ///
    /// A `404`, an empty body and a JSON `null` all mean "no review".
    pub async fn review(&self, date: &str, school_code: &str) -> Result<Option<Review>> {
        parse_date(date)?;
        let path = format!("/api/review/{date}/{school_code}");
        debug!(path, "GET");

        let response = self.http.get(self.url(&path)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(date, school_code, "No review available");
            return Ok(None);
        }
        let body = response.error_for_status()?.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Send a reaction; returns the authoritative like count.
    pub async fn react(
        &self,
        date: &str,
        school_code: &str,
        kind: ReactionKind,
    ) -> Result<ReactionCount> {
        parse_date(date)?;
        let path = format!("/api/reaction/{date}/{school_code}/{kind}");
        debug!(path, "POST");

        let response = self.http.post(self.url(&path)).send().await?;
        let response = response.error_for_status()?;
        let count: ReactionCount = response.json().await?;
        Ok(count)
    }

    /// Like counts of every school that has reactions on `date`.
    pub async fn reactions(&self, date: &str) -> Result<HashMap<String, ReactionCount>> {
        parse_date(date)?;
        self.get_json(&format!("/api/reactions/{date}")).await
    }

    /// Total visitor count.
    pub async fn total_visits(&self) -> Result<u64> {
        let visits: VisitCount = self.get_json("/api/visits/total").await?;
        Ok(visits.count)
    }

    /// Visitor count of today.
    pub async fn today_visits(&self) -> Result<u64> {
        let visits: VisitCount = self.get_json("/api/visits/today").await?;
        Ok(visits.count)
    }

    /// Date range offered by the backend.
    pub async fn dates(&self) -> Result<DateRange> {
        self.get_json("/api/dates").await
    }

    /// Help guide, split into title and body.
    pub async fn help_guide(&self) -> Result<HelpGuide> {
        let response = self.http.get(self.url("/help/guide.md")).send().await?;
        let text = response.error_for_status()?.text().await?;
        HelpGuide::parse(&text).map_err(|e| {
            warn!("Help guide is malformed: {}", e);
            Error::from(e)
        })
    }
}
