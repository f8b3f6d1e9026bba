use bookreview_db::{BookId, Review, ReviewId, ReviewPatch, UserId};
use garde::Validate;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::modules::books::models::BookSummary;
use crate::modules::users::models::UserSummary;
use crate::utils::trimmed;

/// Ratings arrive as any JSON number so that `4.0` counts as four stars and
/// out-of-range values reach validation instead of failing the parse.
fn whole_stars(value: &f64, _ctx: &()) -> garde::Result {
    if value.fract() == 0.0 {
        Ok(())
    } else {
        Err(garde::Error::new("must be a whole number"))
    }
}

fn optional_whole_stars(value: &Option<f64>, ctx: &()) -> garde::Result {
    value.as_ref().map_or(Ok(()), |v| whole_stars(v, ctx))
}

/// Only meaningful once the value passed validation.
fn stars(value: f64) -> u8 {
    value as u8
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReview {
    #[serde(default)]
    #[garde(range(min = 1.0, max = 5.0), custom(whole_stars))]
    pub rating: f64,
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 1000))]
    pub comment: String,
}

impl CreateReview {
    pub fn normalized(self) -> Self {
        Self {
            comment: self.comment.trim().to_string(),
            ..self
        }
    }

    pub fn stars(&self) -> u8 {
        stars(self.rating)
    }
}

/// Only the fields that are present change. A blank comment counts as
/// absent.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateReview {
    #[serde(default)]
    #[garde(range(min = 1.0, max = 5.0), custom(optional_whole_stars))]
    pub rating: Option<f64>,
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 1000))]
    pub comment: Option<String>,
}

impl UpdateReview {
    pub fn normalized(self) -> Self {
        Self {
            comment: trimmed(self.comment),
            ..self
        }
    }
}

impl From<UpdateReview> for ReviewPatch {
    fn from(update: UpdateReview) -> Self {
        Self {
            rating: update.rating.map(stars),
            comment: update.comment,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReviewsParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// A review as rendered to clients, with its author and (in per-user
/// listings) its book resolved. References to deleted documents render as
/// `null`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub id: ReviewId,
    pub rating: u8,
    pub comment: String,
    pub book_id: BookId,
    pub user_id: UserId,
    pub user: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<BookSummary>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ReviewView {
    pub fn new(review: Review, user: Option<UserSummary>, book: Option<BookSummary>) -> Self {
        Self {
            id: review.id,
            rating: review.rating,
            comment: review.comment,
            book_id: review.book,
            user_id: review.user,
            user,
            book,
            created_at: review.created_at,
            updated_at: review.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewEnvelope {
    pub message: String,
    pub review: ReviewView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListEnvelope {
    pub message: String,
    pub reviews: Vec<ReviewView>,
    pub page: u64,
    pub pages: u64,
    pub total_reviews: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validate;

    #[test]
    fn rating_outside_one_to_five_is_invalid() {
        for rating in [0.0, 6.0, 300.0, -1.0] {
            let input = CreateReview {
                rating,
                comment: "fine".to_string(),
            };
            assert!(validate(&input).is_err(), "rating {rating}");
        }
        for rating in 1..=5u8 {
            let input = CreateReview {
                rating: f64::from(rating),
                comment: "fine".to_string(),
            };
            assert!(validate(&input).is_ok(), "rating {rating}");
            assert_eq!(input.stars(), rating);
        }
    }

    #[test]
    fn whitespace_comment_is_missing_on_create() {
        let input = CreateReview {
            rating: 4.0,
            comment: "   ".to_string(),
        }
        .normalized();
        assert!(validate(&input).is_err());
    }

    #[test]
    fn missing_rating_deserializes_to_invalid_zero() {
        let input: CreateReview = serde_json::from_str(r#"{"comment":"great"}"#).unwrap();
        assert_eq!(input.rating, 0.0);
        assert!(validate(&input).is_err());
    }

    #[test]
    fn integral_float_rating_is_accepted() {
        let input: CreateReview = serde_json::from_str(r#"{"rating":4.0,"comment":"great"}"#).unwrap();
        assert!(validate(&input).is_ok());
        assert_eq!(input.stars(), 4);
    }

    #[test]
    fn fractional_rating_is_invalid() {
        let input: CreateReview = serde_json::from_str(r#"{"rating":4.5,"comment":"great"}"#).unwrap();
        assert!(validate(&input).is_err());

        let update: UpdateReview = serde_json::from_str(r#"{"rating":2.5}"#).unwrap();
        assert!(validate(&update).is_err());
    }

    #[test]
    fn out_of_range_rating_reaches_validation() {
        let input: CreateReview = serde_json::from_str(r#"{"rating":300,"comment":"loud"}"#).unwrap();
        let err = validate(&input).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn blank_comment_on_update_is_ignored() {
        let update = UpdateReview {
            rating: Some(2.0),
            comment: Some("  ".to_string()),
        }
        .normalized();
        assert!(validate(&update).is_ok());

        let patch = ReviewPatch::from(update);
        assert_eq!(patch.rating, Some(2));
        assert_eq!(patch.comment, None);
    }

    #[test]
    fn comment_length_is_capped() {
        let update = UpdateReview {
            rating: None,
            comment: Some("x".repeat(1001)),
        };
        assert!(validate(&update).is_err());
    }
}
