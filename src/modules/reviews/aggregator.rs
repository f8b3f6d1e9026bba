//! Keeps each book's `avgRating` and `ratingsCount` in step with its reviews.
//!
//! Every review mutation triggers a full rescan of the book's reviews
//! followed by one write onto the book. There is no running counter to
//! drift: whichever recompute lands last reflects a real snapshot of the
//! review set. Failures are logged and swallowed; the review mutation that
//! triggered the refresh has already committed and stays committed, and the
//! next mutation on the same book repairs the aggregates.

use std::fmt;
use std::sync::Arc;

use bookreview_db::{BookId, RatingStats, RatingStore, RatingSummary, StoreError};
use thiserror::Error;

/// Which review mutation caused a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewMutation {
    Created,
    Updated,
    Deleted,
}

impl fmt::Display for ReviewMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReviewMutation::Created => "created",
            ReviewMutation::Updated => "updated",
            ReviewMutation::Deleted => "deleted",
        })
    }
}

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("rating aggregation query failed: {0}")]
    Query(#[source] StoreError),

    #[error("writing rating aggregates failed: {0}")]
    Persist(#[source] StoreError),
}

/// Result of a best-effort refresh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefreshOutcome {
    Updated(RatingSummary),
    /// The book was deleted; nothing to write.
    BookMissing,
    /// Logged; the book keeps its previous aggregates.
    Failed,
}

#[derive(Clone)]
pub struct RatingAggregator {
    store: Arc<dyn RatingStore>,
}

impl RatingAggregator {
    pub fn new(store: Arc<dyn RatingStore>) -> Self {
        Self { store }
    }

    /// Recompute and persist the aggregates for `book`. `Ok(None)` means the
    /// book no longer exists.
    pub async fn recompute(&self, book: BookId) -> Result<Option<RatingSummary>, AggregationError> {
        let stats = self
            .store
            .summarize_ratings(book)
            .await
            .map_err(AggregationError::Query)?;
        let summary = summarize(stats);

        let written = self
            .store
            .set_rating_summary(book, summary)
            .await
            .map_err(AggregationError::Persist)?;

        Ok(written.then_some(summary))
    }

    /// Post-mutation hook. Never fails; the outcome is informational.
    pub async fn refresh(&self, book: BookId, cause: ReviewMutation) -> RefreshOutcome {
        match self.recompute(book).await {
            Ok(Some(summary)) => {
                tracing::debug!(
                    book_id = %book,
                    cause = %cause,
                    avg_rating = summary.avg_rating,
                    ratings_count = summary.ratings_count,
                    "rating aggregates refreshed"
                );
                RefreshOutcome::Updated(summary)
            }
            Ok(None) => {
                tracing::warn!(
                    book_id = %book,
                    cause = %cause,
                    "book no longer exists; rating aggregates not written"
                );
                RefreshOutcome::BookMissing
            }
            Err(e) => {
                tracing::error!(
                    book_id = %book,
                    cause = %cause,
                    error = %e,
                    "rating aggregates left stale"
                );
                RefreshOutcome::Failed
            }
        }
    }
}

/// Turn raw stats into the persisted summary: zero reviews resets both
/// fields, otherwise the mean is rounded to one decimal place.
pub fn summarize(stats: RatingStats) -> RatingSummary {
    if stats.count == 0 {
        return RatingSummary::default();
    }

    RatingSummary {
        avg_rating: round_to_tenth(stats.average),
        ratings_count: stats.count,
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
