//! Query requests: criteria, ordering and paging in one serializable bundle.
//!
//! A [`QueryRequest<T>`] is what a client hands to a repository. Over an
//! in-memory slice it can be executed directly; a persistence layer would
//! translate the compiled parts instead.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compile::Predicate;
use crate::criteria::Criteria;
use crate::error::{Result, SiftError};
use crate::ordering::{Comparator, SortSpec};
use crate::resolver::FieldResolver;
use crate::schema::Entity;

/// One page of results. Page numbers start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page_number: usize,
    pub items_per_page: usize,
}

impl Pagination {
    /// Creates a page request.
    pub fn new(page_number: usize, items_per_page: usize) -> Self {
        Pagination {
            page_number,
            items_per_page,
        }
    }

    /// Fails if the page number or size is zero.
    pub fn validate(&self) -> Result<()> {
        if self.page_number == 0 || self.items_per_page == 0 {
            return Err(SiftError::InvalidPage {
                page_number: self.page_number,
                items_per_page: self.items_per_page,
            });
        }
        Ok(())
    }

    /// Number of items before this page.
    pub fn offset(&self) -> usize {
        self.page_number
            .saturating_sub(1)
            .saturating_mul(self.items_per_page)
    }

    /// Number of pages needed for `total` items.
    pub fn page_count(&self, total: usize) -> usize {
        if self.items_per_page == 0 {
            return 0;
        }
        total.div_ceil(self.items_per_page)
    }
}

/// Criteria, optional ordering, optional paging and included paths for `T`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct QueryRequest<T> {
    pub criteria: Criteria<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec<T>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    /// Related members to load alongside each entity.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,
}

impl<T> Clone for QueryRequest<T> {
    fn clone(&self) -> Self {
        QueryRequest {
            criteria: self.criteria.clone(),
            sort: self.sort.clone(),
            pagination: self.pagination,
            includes: self.includes.clone(),
        }
    }
}

impl<T> fmt::Debug for QueryRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRequest")
            .field("criteria", &self.criteria)
            .field("sort", &self.sort)
            .field("pagination", &self.pagination)
            .field("includes", &self.includes)
            .finish()
    }
}

impl<T> QueryRequest<T> {
    /// Creates a request with no ordering, paging or includes.
    pub fn new(criteria: Criteria<T>) -> Self {
        QueryRequest {
            criteria,
            sort: None,
            pagination: None,
            includes: Vec::new(),
        }
    }

    /// Sets the ordering.
    pub fn sorted_by(mut self, sort: SortSpec<T>) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Requests one page.
    pub fn paged(mut self, page_number: usize, items_per_page: usize) -> Self {
        self.pagination = Some(Pagination::new(page_number, items_per_page));
        self
    }

    /// Adds a related member path to load.
    pub fn include(mut self, path: impl Into<String>) -> Self {
        self.includes.push(path.into());
        self
    }
}

impl<T: Entity> QueryRequest<T> {
    /// Retypes every part for a structurally identical type `U`.
    pub fn cast<U: Entity>(&self) -> QueryRequest<U> {
        QueryRequest {
            criteria: self.criteria.cast::<U>(),
            sort: self.sort.as_ref().map(|sort| sort.cast::<U>()),
            pagination: self.pagination,
            includes: self.includes.clone(),
        }
    }

    /// Filters and, when a sort is present, orders `items`.
    pub fn select<'a>(&self, items: &'a [T]) -> Result<Vec<&'a T>> {
        let (predicate, comparator) = self.compile()?;
        let mut selected = predicate.filter(items);
        if let Some(comparator) = comparator {
            selected.sort_by(|a, b| comparator.compare(a, b));
        }
        Ok(selected)
    }

    /// Returns the requested page of the filtered, ordered items.
    ///
    /// Paging without an ordering is rejected, since the page contents
    /// would depend on storage order.
    pub fn select_page<'a>(&self, items: &'a [T]) -> Result<Vec<&'a T>> {
        let entity = || T::schema().name().to_string();
        if self.sort.as_ref().map_or(true, |sort| sort.is_empty()) {
            return Err(SiftError::SortRequired { entity: entity() });
        }
        let page = self
            .pagination
            .ok_or_else(|| SiftError::PaginationRequired { entity: entity() })?;
        page.validate()?;

        let selected = self.select(items)?;
        Ok(selected
            .into_iter()
            .skip(page.offset())
            .take(page.items_per_page)
            .collect())
    }

    /// Counts the items matching the criteria.
    pub fn count(&self, items: &[T]) -> Result<usize> {
        Ok(self.criteria.compile()?.count(items))
    }

    /// Number of pages the matching items span.
    pub fn page_count(&self, items: &[T]) -> Result<usize> {
        let page = self.pagination.ok_or_else(|| SiftError::PaginationRequired {
            entity: T::schema().name().to_string(),
        })?;
        page.validate()?;
        Ok(page.page_count(self.count(items)?))
    }

    fn compile(&self) -> Result<(Predicate<T>, Option<Comparator<T>>)> {
        let resolver = FieldResolver::of::<T>();
        for path in &self.includes {
            resolver.resolve(path)?;
        }
        let predicate = self.criteria.compile()?;
        let comparator = self.sort.as_ref().map(|sort| sort.compile()).transpose()?;
        Ok((predicate, comparator))
    }
}
