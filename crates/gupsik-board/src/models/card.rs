//! Per-school card row.

use super::{Meal, Review};
use serde::{Deserialize, Serialize};

/// Upper bound of each sub-score.
pub const MAX_SCORE: f64 = 5.0;

/// One school's row in the card store.
///
/// `total_score` is always `nutri_score + pref_score`, and all three are
/// zero until a review arrives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealCard {
    pub school_code: String,
    pub school_name: String,
    pub lunch_menu: String,
    pub nutri_score: f64,
    pub pref_score: f64,
    pub likes: u32,
    pub total_score: f64,
    pub has_review: bool,
}

impl MealCard {
    /// Create a card with no review yet.
    pub fn from_meal(meal: &Meal) -> Self {
        Self {
            school_code: meal.school_code.clone(),
            school_name: meal.school_name.clone(),
            lunch_menu: meal.lunch_menu.clone(),
            nutri_score: 0.0,
            pref_score: 0.0,
            likes: 0,
            total_score: 0.0,
            has_review: false,
        }
    }

    /// Apply a review, or clear scores when none exists.
    pub fn apply_review(&mut self, review: Option<&Review>) {
        match review {
            Some(review) => {
                self.nutri_score = clamp_score(review.nutri_score);
                self.pref_score = clamp_score(review.pref_score);
                self.likes = review.reactions.likes;
                self.has_review = true;
            }
            None => {
                self.nutri_score = 0.0;
                self.pref_score = 0.0;
                self.likes = 0;
                self.has_review = false;
            }
        }
        self.total_score = self.nutri_score + self.pref_score;
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, MAX_SCORE)
    } else {
        0.0
    }
}

/// What the review area of a card shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReviewSection {
    /// Fetch in flight
    Loading,
    /// Review text available
    Ready { text: String },
    /// Backend has no review yet
    Missing,
    /// Fetch failed
    Failed,
}

impl ReviewSection {
    /// Message shown when the backend has no review.
    pub const MISSING_MESSAGE: &'static str = "리뷰가 존재하지 않습니다.";

    /// Message shown when the review fetch failed.
    pub const FAILED_MESSAGE: &'static str = "리뷰를 불러오는 중 오류가 발생했습니다.";

    /// Message shown while the review is generated.
    pub const LOADING_MESSAGE: &'static str = "리뷰 생성 중...";

    /// Text to display for this section.
    pub fn message(&self) -> &str {
        match self {
            ReviewSection::Loading => Self::LOADING_MESSAGE,
            ReviewSection::Ready { text } => text,
            ReviewSection::Missing => Self::MISSING_MESSAGE,
            ReviewSection::Failed => Self::FAILED_MESSAGE,
        }
    }
}
