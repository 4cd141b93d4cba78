//! Card views and their text rendering.

use crate::models::{MealCard, ReviewSection, MAX_SCORE};
use serde::Serialize;
use std::fmt::Write;

const FULL_STAR: char = '★';
const HALF_STAR: char = '⯪';
const EMPTY_STAR: char = '☆';

/// Render a 0-5 score as five star glyphs followed by the score.
///
/// Each whole point is a full star; a fractional part of at least one half
/// adds a half star; the rest are empty.
pub fn stars(score: f64) -> String {
    let score = if score.is_finite() {
        score.clamp(0.0, MAX_SCORE)
    } else {
        0.0
    };
    let full = score.floor() as usize;
    let half = score.fract() >= 0.5;

    let mut out = String::with_capacity(24);
    for i in 0..MAX_SCORE as usize {
        let glyph = if i < full {
            FULL_STAR
        } else if i == full && half {
            HALF_STAR
        } else {
            EMPTY_STAR
        };
        out.push(glyph);
    }
    let _ = write!(out, " {score:.1}");
    out
}

/// Immutable view of one card, ready to display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    pub school_code: String,
    pub school_name: String,
    pub lunch_menu: String,
    pub review: ReviewSection,
    /// Star strings, present once a review exists
    pub nutri_stars: Option<String>,
    pub pref_stars: Option<String>,
    pub total_score: f64,
    pub likes: u32,
    /// Like button shown in the active style
    pub liked: bool,
    /// Transient reorder highlight
    pub moving: bool,
}

impl CardView {
    /// Build a view from a store row and its review area.
    pub fn new(card: &MealCard, review: ReviewSection, moving: bool) -> Self {
        let (nutri_stars, pref_stars) = if card.has_review {
            (Some(stars(card.nutri_score)), Some(stars(card.pref_score)))
        } else {
            (None, None)
        };

        Self {
            school_code: card.school_code.clone(),
            school_name: card.school_name.clone(),
            lunch_menu: card.lunch_menu.clone(),
            review,
            nutri_stars,
            pref_stars,
            total_score: card.total_score,
            likes: card.likes,
            liked: card.likes > 0,
            moving,
        }
    }
}

/// Counters shown above the cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoardHeader {
    pub date: Option<String>,
    pub connections: Option<u64>,
    pub total_visits: Option<u64>,
    pub today_visits: Option<u64>,
}

fn counter(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Render the whole board as plain text.
pub fn render_board(header: &BoardHeader, banner: Option<&str>, cards: &[CardView]) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "== {} ==  접속자 {}  |  방문 {} (오늘 {})",
        header.date.as_deref().unwrap_or("-"),
        counter(header.connections),
        counter(header.total_visits),
        counter(header.today_visits),
    );

    if let Some(message) = banner {
        let _ = writeln!(out, "!! {message}");
        return out;
    }

    for card in cards {
        let marker = if card.moving { "»" } else { " " };
        let thumb = if card.liked { "👍" } else { "·" };
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{marker} [{}] {}  {thumb} {}",
            card.school_code, card.school_name, card.likes
        );
        if !card.lunch_menu.is_empty() {
            let _ = writeln!(out, "    {}", card.lunch_menu.replace('\n', "\n    "));
        }
        if let (Some(nutri), Some(pref)) = (&card.nutri_stars, &card.pref_stars) {
            let _ = writeln!(out, "    영양 {nutri}   선호 {pref}");
        }
        let _ = writeln!(out, "    {}", card.review.message());
    }

    out
}
