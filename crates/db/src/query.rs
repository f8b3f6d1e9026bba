use std::str::FromStr;

use serde::Serialize;

/// One-based page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// Number of items before this page.
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    fn offset(&self) -> usize {
        usize::try_from(self.skip()).unwrap_or(usize::MAX)
    }

    fn limit(&self) -> usize {
        usize::try_from(self.page_size).unwrap_or(usize::MAX)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub pages: u64,
    pub total: u64,
}

impl<T> Page<T> {
    /// A page whose items were already cut by the backend.
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            page: request.page,
            pages: total.div_ceil(request.page_size),
            total,
        }
    }

    /// Cut one page out of an already filtered and ordered result set.
    pub fn slice(items: Vec<T>, request: PageRequest) -> Self {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(request.offset())
            .take(request.limit())
            .collect();

        Self::new(items, request, total)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            pages: self.pages,
            total: self.total,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookSortField {
    #[default]
    CreatedAt,
    Title,
    Author,
    AvgRating,
    RatingsCount,
    PublishedDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BookSort {
    pub field: BookSortField,
    pub direction: SortDirection,
}

impl FromStr for BookSort {
    type Err = String;

    /// Parses `<field>_<asc|desc>`, e.g. `avgRating_desc`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (field, direction) = raw
            .split_once('_')
            .ok_or_else(|| format!("expected <field>_<asc|desc>, got '{raw}'"))?;

        let field = match field {
            "createdAt" => BookSortField::CreatedAt,
            "title" => BookSortField::Title,
            "author" => BookSortField::Author,
            "avgRating" => BookSortField::AvgRating,
            "ratingsCount" => BookSortField::RatingsCount,
            "publishedDate" => BookSortField::PublishedDate,
            other => return Err(format!("unsupported sort field '{other}'")),
        };
        let direction = match direction {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            other => return Err(format!("unsupported sort direction '{other}'")),
        };

        Ok(Self { field, direction })
    }
}

/// Filters and ordering for the book listing.
#[derive(Debug, Clone, Default)]
pub struct BookQuery {
    /// Case-insensitive match against title, author and genre.
    pub search: Option<String>,
    /// Case-insensitive match against genre only.
    pub genre: Option<String>,
    pub sort: BookSort,
    pub page: PageRequest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_reports_total_and_page_count() {
        let page = Page::slice((1..=12).collect::<Vec<_>>(), PageRequest::new(2, 5));
        assert_eq!(page.items, vec![6, 7, 8, 9, 10]);
        assert_eq!(page.total, 12);
        assert_eq!(page.pages, 3);
        assert_eq!(page.page, 2);
    }

    #[test]
    fn slice_past_the_end_is_empty() {
        let page = Page::slice(vec![1, 2, 3], PageRequest::new(4, 5));
        assert!(page.items.is_empty());
        assert_eq!(page.pages, 1);
    }

    #[test]
    fn skip_counts_items_before_the_page() {
        assert_eq!(PageRequest::new(1, 10).skip(), 0);
        assert_eq!(PageRequest::new(3, 10).skip(), 20);
    }

    #[test]
    fn page_request_clamps_zero_values() {
        let request = PageRequest::new(0, 0);
        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, 1);
    }

    #[test]
    fn sort_parses_field_and_direction() {
        let sort: BookSort = "avgRating_asc".parse().unwrap();
        assert_eq!(sort.field, BookSortField::AvgRating);
        assert_eq!(sort.direction, SortDirection::Asc);

        assert!("rating".parse::<BookSort>().is_err());
        assert!("title_sideways".parse::<BookSort>().is_err());
        assert!("isbn_asc".parse::<BookSort>().is_err());
    }
}
