//! Helpers shared by the feature modules.

use bookreview_db::PageRequest;
use bookreview_http::AppError;
use garde::Validate;
use serde_json::json;

/// Run `garde` validation and turn the report into a `422` with one
/// `{field, error}` detail per violation.
pub fn validate<T>(value: &T) -> Result<(), AppError>
where
    T: Validate,
    T::Context: Default,
{
    value.validate().map_err(|report| {
        let details: Vec<_> = report
            .iter()
            .map(|(path, error)| json!({ "field": path.to_string(), "error": error.to_string() }))
            .collect();
        AppError::validation(details, "invalid input data")
    })
}

/// Trim, and treat whitespace-only input as absent.
pub fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Argon2 is CPU-bound; hash off the async workers.
pub async fn hash_password(plain: String) -> Result<String, AppError> {
    let hash = tokio::task::spawn_blocking(move || bookreview_authz::hash_password(&plain))
        .await
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("password hashing task failed")))??;
    Ok(hash)
}

/// Counterpart of [`hash_password`] for login.
pub async fn verify_password(plain: String, stored: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bookreview_authz::verify_password(&plain, &stored))
        .await
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("password check task failed")))
}

/// Resolve optional `page` / `pageSize` query values against configured
/// defaults.
pub fn page_request(page: Option<u64>, page_size: Option<u64>, default_size: u64, max_size: u64) -> PageRequest {
    let size = page_size.filter(|s| *s > 0).unwrap_or(default_size).min(max_size);
    PageRequest::new(page.unwrap_or(1), size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Probe {
        #[garde(length(chars, min = 1, max = 3))]
        name: String,
        #[garde(range(min = 1, max = 5))]
        rating: u8,
    }

    #[test]
    fn validation_report_lists_each_field() {
        let probe = Probe {
            name: String::new(),
            rating: 9,
        };
        let err = validate(&probe).unwrap_err();

        match err {
            AppError::Validation { details, .. } => {
                let fields: Vec<_> = details.iter().map(|d| d["field"].as_str().unwrap()).collect();
                assert!(fields.contains(&"name"));
                assert!(fields.contains(&"rating"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_input_passes() {
        let probe = Probe {
            name: "ok".to_string(),
            rating: 5,
        };
        assert!(validate(&probe).is_ok());
    }

    #[test]
    fn trimmed_drops_blank_values() {
        assert_eq!(trimmed(Some("  hi ".to_string())), Some("hi".to_string()));
        assert_eq!(trimmed(Some("   ".to_string())), None);
        assert_eq!(trimmed(None), None);
    }

    #[tokio::test]
    async fn hashing_runs_off_the_runtime() {
        let hash = hash_password("s3cret!".to_string()).await.unwrap();
        assert!(verify_password("s3cret!".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong".to_string(), hash).await.unwrap());
    }

    #[test]
    fn page_request_applies_defaults_and_cap() {
        assert_eq!(page_request(None, None, 10, 100), PageRequest::new(1, 10));
        assert_eq!(page_request(Some(3), Some(0), 5, 100), PageRequest::new(3, 5));
        assert_eq!(page_request(Some(2), Some(500), 10, 100), PageRequest::new(2, 100));
    }
}
