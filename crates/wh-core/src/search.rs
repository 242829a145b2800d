//! # Search & Sort
//!
//! A search is described by a [`SearchPlan`]: an optional free-text needle
//! plus a [`SortKey`]. The plan is storage agnostic; it can be applied to
//! in-memory listings with [`SearchPlan::apply`] and repositories compile
//! the same semantics to their query language.

use std::cmp::Ordering;

use crate::error::Result;
use crate::models::BirdListing;
use crate::pagination::{Page, PageRequest};
use crate::traits::BirdRepo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Birds with at least one approved comment, most approved comments first.
    MostApprovedComments,
    /// Most seed rows first.
    MostSeeds,
    /// Species, ascending.
    Species,
    /// Photographer username, ascending.
    Photographer,
    /// Newest bird first.
    #[default]
    Newest,
}

impl SortKey {
    /// Maps the raw `order_by` value. Keys are recognised by substring, in
    /// the order comment, seed, species, photographer.
    pub fn from_order_by(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Newest;
        };
        if raw.contains("comment") {
            Self::MostApprovedComments
        } else if raw.contains("seed") {
            Self::MostSeeds
        } else if raw.contains("species") {
            Self::Species
        } else if raw.contains("photographer") {
            Self::Photographer
        } else {
            Self::Newest
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPlan {
    /// Case-insensitive substring matched against username, species,
    /// photographer comment and location.
    pub text: Option<String>,
    pub sort: SortKey,
}

impl SearchPlan {
    /// Everything, newest first.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(query: Option<&str>, order_by: Option<&str>) -> Self {
        Self {
            text: query.filter(|q| !q.is_empty()).map(str::to_string),
            sort: SortKey::from_order_by(order_by),
        }
    }

    /// Whether the sort key also narrows the candidate set.
    pub fn requires_approved_comment(&self) -> bool {
        self.sort == SortKey::MostApprovedComments
    }

    pub fn matches(&self, listing: &BirdListing) -> bool {
        if self.requires_approved_comment() && listing.approved_comments == 0 {
            return false;
        }
        let Some(text) = &self.text else {
            return true;
        };
        let needle = text.to_ascii_lowercase();
        [
            listing.photographer.as_str(),
            listing.bird.species.as_str(),
            listing.bird.photographer_comment.as_str(),
            listing.bird.location.as_str(),
        ]
        .iter()
        .any(|field| field.to_ascii_lowercase().contains(&needle))
    }

    /// Total order used for results; ties fall back to newest first, then id.
    pub fn compare(&self, a: &BirdListing, b: &BirdListing) -> Ordering {
        let primary = match self.sort {
            SortKey::MostApprovedComments => b.approved_comments.cmp(&a.approved_comments),
            SortKey::MostSeeds => b.seeds.cmp(&a.seeds),
            SortKey::Species => a.bird.species.cmp(&b.bird.species),
            SortKey::Photographer => a.photographer.cmp(&b.photographer),
            SortKey::Newest => Ordering::Equal,
        };
        primary
            .then_with(|| b.bird.created_at.cmp(&a.bird.created_at))
            .then_with(|| b.bird.id.cmp(&a.bird.id))
    }

    pub fn apply(&self, listings: impl IntoIterator<Item = BirdListing>) -> Vec<BirdListing> {
        let mut hits: Vec<_> = listings.into_iter().filter(|l| self.matches(l)).collect();
        hits.sort_by(|a, b| self.compare(a, b));
        hits
    }
}

/// Runs a plan against the repository and cuts out the requested page.
pub async fn search(
    repo: &dyn BirdRepo,
    plan: &SearchPlan,
    page: PageRequest,
    page_size: i64,
) -> Result<Page<BirdListing>> {
    let total = repo.count_birds(plan).await?;
    let number = page.resolve(total, page_size)?;
    let items = repo
        .search_birds(plan, page_size, Page::<BirdListing>::offset(number, page_size))
        .await?;
    log::debug!(
        "search text={:?} sort={:?} page={} total={}",
        plan.text,
        plan.sort,
        number,
        total
    );
    Ok(Page {
        items,
        number,
        page_size,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Bird;
    use crate::traits::MockBirdRepo;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn listing(
        photographer: &str,
        species: &str,
        location: &str,
        comment: &str,
        age_minutes: i64,
        approved_comments: i64,
        seeds: i64,
    ) -> BirdListing {
        let mut bird = Bird::new(
            Uuid::now_v7(),
            species.into(),
            location.into(),
            "bird/x.jpg".into(),
            comment.into(),
        );
        bird.created_at = Utc::now() - Duration::minutes(age_minutes);
        BirdListing {
            bird,
            photographer: photographer.into(),
            approved_comments,
            seeds,
        }
    }

    fn fixtures() -> Vec<BirdListing> {
        vec![
            listing("ana", "Grey Heron", "Tagus", "early morning", 50, 3, 0),
            listing("rui", "Kingfisher", "Heronsgate", "fast", 40, 0, 2),
            listing("heron_fan", "Robin", "Porto", "garden", 30, 1, 5),
            listing("zoe", "Sparrow", "Faro", "a sneaky HERON behind", 20, 0, 0),
            listing("bea", "Blackbird", "Braga", "singing", 10, 0, 1),
        ]
    }

    fn species(hits: &[BirdListing]) -> Vec<&str> {
        hits.iter().map(|l| l.bird.species.as_str()).collect()
    }

    #[test]
    fn order_by_is_matched_by_substring() {
        assert_eq!(SortKey::from_order_by(Some("-comments")), SortKey::MostApprovedComments);
        assert_eq!(SortKey::from_order_by(Some("seeds")), SortKey::MostSeeds);
        assert_eq!(SortKey::from_order_by(Some("species")), SortKey::Species);
        assert_eq!(SortKey::from_order_by(Some("photographer")), SortKey::Photographer);
        assert_eq!(SortKey::from_order_by(Some("rating")), SortKey::Newest);
        assert_eq!(SortKey::from_order_by(None), SortKey::Newest);
    }

    #[test]
    fn empty_query_means_no_filter() {
        assert_eq!(SearchPlan::new(Some(""), None).text, None);
    }

    #[test]
    fn text_matches_any_of_four_fields_case_insensitively() {
        let plan = SearchPlan::new(Some("Heron"), None);
        let hits = plan.apply(fixtures());
        assert_eq!(species(&hits), vec!["Sparrow", "Robin", "Kingfisher", "Grey Heron"]);
    }

    #[test]
    fn unmatched_birds_are_excluded() {
        let plan = SearchPlan::new(Some("albatross"), None);
        assert!(plan.apply(fixtures()).is_empty());
    }

    #[test]
    fn comment_sort_keeps_only_birds_with_approved_comments() {
        let plan = SearchPlan::new(None, Some("comment"));
        let hits = plan.apply(fixtures());
        assert_eq!(species(&hits), vec!["Grey Heron", "Robin"]);
    }

    #[test]
    fn seed_sort_keeps_zero_seed_birds_at_the_tail() {
        let plan = SearchPlan::new(None, Some("seed"));
        let hits = plan.apply(fixtures());
        assert_eq!(
            species(&hits),
            vec!["Robin", "Kingfisher", "Blackbird", "Sparrow", "Grey Heron"]
        );
    }

    #[test]
    fn alphabetical_sorts() {
        let by_species = SearchPlan::new(None, Some("species")).apply(fixtures());
        assert_eq!(by_species.first().unwrap().bird.species, "Blackbird");
        let by_photographer = SearchPlan::new(None, Some("photographer")).apply(fixtures());
        assert_eq!(by_photographer.first().unwrap().photographer, "ana");
        assert_eq!(by_photographer.last().unwrap().photographer, "zoe");
    }

    #[test]
    fn filter_and_sort_combine() {
        let plan = SearchPlan::new(Some("heron"), Some("comment"));
        assert_eq!(species(&plan.apply(fixtures())), vec!["Grey Heron", "Robin"]);
    }

    #[tokio::test]
    async fn search_counts_then_fetches_the_resolved_page() {
        let mut repo = MockBirdRepo::new();
        repo.expect_count_birds().returning(|_| Ok(23));
        repo.expect_search_birds()
            .withf(|plan, limit, offset| plan.sort == SortKey::MostSeeds && *limit == 10 && *offset == 20)
            .returning(|_, _, _| Ok(Vec::new()));

        let plan = SearchPlan::new(None, Some("seed"));
        let page = search(&repo, &plan, PageRequest::Last, 10).await.unwrap();
        assert_eq!(page.number, 3);
        assert_eq!(page.total, 23);
        assert!(!page.has_next());
    }

    #[tokio::test]
    async fn pages_past_the_end_are_not_found() {
        let mut repo = MockBirdRepo::new();
        repo.expect_count_birds().returning(|_| Ok(5));
        repo.expect_search_birds().never();

        let err = search(&repo, &SearchPlan::all(), PageRequest::Number(2), 9)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::AppError::NotFound(..)));
    }
}
