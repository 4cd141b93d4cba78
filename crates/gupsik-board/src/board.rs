//! Card renderer and reconciler.
//!
//! The board owns the on-screen order of cards for the active date, the
//! state of each card's review area, and the transient "moving" highlight
//! that signals a reorder. Scores and likes live in the [`CardStore`]; the
//! board only reads them.
//!
//! # Ordering
//!
//! - On a new meal set, cards are laid out by school name (Korean
//!   collation), school code breaking ties.
//! - [`ReorderMode::Score`] sorts by total score, descending.
//! - [`ReorderMode::Likes`] sorts by displayed likes, descending.
//!
//! Reconciliation uses a stable sort over the current order, so equal keys
//! keep their current relative positions and running the same pass twice
//! changes nothing.
//!
//! Highlights are deadlines checked against a caller-supplied instant. A
//! reorder never waits for a highlight to end.

use crate::collation;
use crate::models::{Meal, ReviewSection};
use crate::store::CardStore;
use crate::view::CardView;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::debug;

/// How long a moved card stays highlighted.
pub const HIGHLIGHT_DURATION: Duration = Duration::from_millis(500);

/// Ordering policy of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderMode {
    /// Total score, highest first
    Score,
    /// Displayed like count, highest first
    Likes,
}

impl std::str::FromStr for ReorderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "score" => Ok(ReorderMode::Score),
            "likes" => Ok(ReorderMode::Likes),
            other => Err(format!("unknown reorder mode: {other}")),
        }
    }
}

/// Result of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPass {
    pub mode: ReorderMode,
    /// School codes in their new order
    pub order: Vec<String>,
    /// School codes whose position changed
    pub moved: Vec<String>,
}

impl ReorderPass {
    /// Whether the pass changed anything.
    pub fn changed(&self) -> bool {
        !self.moved.is_empty()
    }
}

/// Rendered card set for the active date.
#[derive(Debug, Default)]
pub struct Board {
    order: Vec<String>,
    sections: HashMap<String, ReviewSection>,
    highlights: HashMap<String, Instant>,
    banner: Option<String>,
}

impl Board {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay out a new meal set, sorted by school name.
    ///
    /// Replaces every card of the previous set. Each card starts with its
    /// review section loading. Returns the school codes in layout order;
    /// the caller fetches one review per code.
    pub fn render_meal_set(&mut self, meals: &[Meal]) -> Vec<String> {
        let mut unique: HashMap<&str, &Meal> = HashMap::new();
        for meal in meals {
            unique.insert(meal.school_code.as_str(), meal);
        }

        let mut laid_out: Vec<&Meal> = unique.into_values().collect();
        laid_out.sort_by(|a, b| {
            collation::compare(&a.school_name, &b.school_name)
                .then_with(|| a.school_code.cmp(&b.school_code))
        });

        self.order = laid_out.iter().map(|m| m.school_code.clone()).collect();
        self.sections = self
            .order
            .iter()
            .map(|code| (code.clone(), ReviewSection::Loading))
            .collect();
        self.highlights.clear();
        self.banner = None;

        debug!(cards = self.order.len(), "Meal set rendered");
        self.order.clone()
    }

    /// Remove every card, e.g. while a new date loads.
    pub fn clear(&mut self) {
        self.order.clear();
        self.sections.clear();
        self.highlights.clear();
        self.banner = None;
    }

    /// Show a board-wide error message in place of the cards.
    pub fn show_error(&mut self, message: impl Into<String>) {
        self.clear();
        self.banner = Some(message.into());
    }

    /// Board-wide message, if any.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Update the review area of one card. Unknown codes are ignored.
    pub fn set_review_section(&mut self, school_code: &str, section: ReviewSection) -> bool {
        match self.sections.get_mut(school_code) {
            Some(slot) => {
                *slot = section;
                true
            }
            None => false,
        }
    }

    /// Review area of one card.
    pub fn review_section(&self, school_code: &str) -> Option<&ReviewSection> {
        self.sections.get(school_code)
    }

    /// Current on-screen order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Re-sort all cards under `mode` and highlight the ones that moved.
    pub fn reconcile(&mut self, mode: ReorderMode, store: &CardStore, now: Instant) -> ReorderPass {
        let previous = self.order.clone();

        match mode {
            ReorderMode::Score => {
                let score = |code: &String| store.get(code).map_or(0.0, |c| c.total_score);
                self.order.sort_by(|a, b| score(b).total_cmp(&score(a)));
            }
            ReorderMode::Likes => {
                let likes = |code: &String| store.get(code).map_or(0, |c| c.likes);
                self.order.sort_by(|a, b| likes(b).cmp(&likes(a)));
            }
        }

        let moved: Vec<String> = self
            .order
            .iter()
            .zip(previous.iter())
            .filter(|(now_at, was_at)| now_at != was_at)
            .map(|(code, _)| code.clone())
            .collect();

        let until = now + HIGHLIGHT_DURATION;
        for code in &moved {
            self.highlights.insert(code.clone(), until);
        }
        self.highlights.retain(|_, deadline| *deadline > now);

        if !moved.is_empty() {
            debug!(?mode, moved = moved.len(), "Cards reordered");
        }

        ReorderPass {
            mode,
            order: self.order.clone(),
            moved,
        }
    }

    /// Whether a card is highlighted at `now`.
    pub fn is_moving(&self, school_code: &str, now: Instant) -> bool {
        self.highlights
            .get(school_code)
            .is_some_and(|deadline| *deadline > now)
    }

    /// Latest highlight deadline, if any highlight is still pending.
    pub fn highlight_deadline(&self) -> Option<Instant> {
        self.highlights.values().max().copied()
    }

    /// Build views for every card in on-screen order.
    pub fn views(&self, store: &CardStore, now: Instant) -> Vec<CardView> {
        self.order
            .iter()
            .filter_map(|code| {
                let card = store.get(code)?;
                let section = self
                    .sections
                    .get(code)
                    .cloned()
                    .unwrap_or(ReviewSection::Loading);
                Some(CardView::new(card, section, self.is_moving(code, now)))
            })
            .collect()
    }

    /// Build views for the given codes only, in on-screen order.
    pub fn views_of(&self, codes: &[String], store: &CardStore, now: Instant) -> Vec<CardView> {
        let wanted: HashSet<&str> = codes.iter().map(String::as_str).collect();
        self.views(store, now)
            .into_iter()
            .filter(|v| wanted.contains(v.school_code.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Review;
    use proptest::prelude::*;

    const DATE: &str = "2024-05-02";

    fn setup(meals: &[Meal]) -> (CardStore, Board) {
        let mut store = CardStore::new();
        let mut board = Board::new();
        store.set_meal_set(DATE, meals);
        board.render_meal_set(meals);
        (store, board)
    }

    fn two_schools() -> Vec<Meal> {
        vec![Meal::new("B", "나", "국"), Meal::new("A", "가", "밥")]
    }

    #[test]
    fn render_sorts_by_school_name() {
        let (_, board) = setup(&[
            Meal::new("C", "다솜초", ""),
            Meal::new("A", "가람초", ""),
            Meal::new("B", "나래초", ""),
        ]);
        assert_eq!(board.order(), ["A", "B", "C"]);
    }

    #[test]
    fn render_produces_one_card_per_school() {
        let meals = vec![
            Meal::new("A", "가", "old"),
            Meal::new("B", "나", ""),
            Meal::new("A", "가", "new"),
        ];
        let (store, board) = setup(&meals);
        let views = board.views(&store, Instant::now());
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].lunch_menu, "new");
    }

    #[test]
    fn new_cards_start_loading() {
        let (_, board) = setup(&two_schools());
        assert_eq!(board.review_section("A"), Some(&ReviewSection::Loading));
    }

    #[test]
    fn score_ties_without_reviews_are_stable() {
        let (store, mut board) = setup(&two_schools());
        let now = Instant::now();

        let pass = board.reconcile(ReorderMode::Score, &store, now);
        assert_eq!(pass.order, ["A", "B"]);
        assert!(!pass.changed());

        let again = board.reconcile(ReorderMode::Score, &store, now);
        assert_eq!(again.order, pass.order);
    }

    #[test]
    fn later_higher_review_moves_ahead() {
        let (mut store, mut board) = setup(&[
            Meal::new("B", "가", ""),
            Meal::new("A", "나", ""),
        ]);
        let now = Instant::now();

        store.apply_review("B", Some(&Review::new("b", 1.0, 1.0)));
        board.reconcile(ReorderMode::Score, &store, now);
        store.apply_review("A", Some(&Review::new("a", 4.5, 3.0)));
        let pass = board.reconcile(ReorderMode::Score, &store, now);

        assert_eq!(pass.order, ["A", "B"]);
        assert!(pass.changed());
        assert!(board.is_moving("A", now));
    }

    #[test]
    fn likes_mode_sorts_by_likes() {
        let (mut store, mut board) = setup(&two_schools());
        store.apply_review("A", Some(&Review::new("a", 5.0, 5.0).with_likes(1)));
        store.apply_reaction_update("B", 3);

        let pass = board.reconcile(ReorderMode::Likes, &store, Instant::now());
        assert_eq!(pass.order, ["B", "A"]);
    }

    #[test]
    fn highlight_expires() {
        let (mut store, mut board) = setup(&two_schools());
        let now = Instant::now();
        store.apply_reaction_update("B", 1);
        board.reconcile(ReorderMode::Likes, &store, now);

        assert!(board.is_moving("B", now));
        assert!(!board.is_moving("B", now + HIGHLIGHT_DURATION));
    }

    #[test]
    fn error_banner_replaces_cards() {
        let (store, mut board) = setup(&two_schools());
        board.show_error("boom");
        assert_eq!(board.banner(), Some("boom"));
        assert!(board.views(&store, Instant::now()).is_empty());
    }

    #[test]
    fn review_section_for_unknown_school_is_ignored() {
        let (_, mut board) = setup(&two_schools());
        assert!(!board.set_review_section("Z", ReviewSection::Missing));
    }

    #[test]
    fn mode_from_str() {
        assert_eq!("score".parse::<ReorderMode>(), Ok(ReorderMode::Score));
        assert_eq!("likes".parse::<ReorderMode>(), Ok(ReorderMode::Likes));
        assert!("name".parse::<ReorderMode>().is_err());
    }

    fn arb_cards() -> impl Strategy<Value = Vec<(f64, f64, u32)>> {
        prop::collection::vec((0.0f64..=5.0, 0.0f64..=5.0, 0u32..50), 0..20)
    }

    fn build(cards: &[(f64, f64, u32)]) -> (CardStore, Board) {
        let meals: Vec<Meal> = (0..cards.len())
            .map(|i| Meal::new(format!("S{i}"), format!("학교{i}"), ""))
            .collect();
        let (mut store, board) = setup(&meals);
        for (i, (nutri, pref, likes)) in cards.iter().enumerate() {
            let code = format!("S{i}");
            store.apply_review(&code, Some(&Review::new("", *nutri, *pref).with_likes(*likes)));
        }
        (store, board)
    }

    proptest! {
        #[test]
        fn score_pass_is_non_increasing(cards in arb_cards()) {
            let (store, mut board) = build(&cards);
            let pass = board.reconcile(ReorderMode::Score, &store, Instant::now());
            let scores: Vec<f64> = pass.order.iter().map(|c| store.get(c).unwrap().total_score).collect();
            prop_assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        }

        #[test]
        fn likes_pass_is_non_increasing(cards in arb_cards()) {
            let (store, mut board) = build(&cards);
            let pass = board.reconcile(ReorderMode::Likes, &store, Instant::now());
            let likes: Vec<u32> = pass.order.iter().map(|c| store.get(c).unwrap().likes).collect();
            prop_assert!(likes.windows(2).all(|w| w[0] >= w[1]));
        }

        #[test]
        fn reconcile_is_idempotent(cards in arb_cards()) {
            let (store, mut board) = build(&cards);
            let now = Instant::now();
            let first = board.reconcile(ReorderMode::Score, &store, now);
            let second = board.reconcile(ReorderMode::Score, &store, now);
            prop_assert_eq!(&first.order, &second.order);
            prop_assert!(!second.changed());
        }
    }
}
