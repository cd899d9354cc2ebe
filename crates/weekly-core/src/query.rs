//! # Query Engine
//!
//! Filters reports with a conjunction of optional criteria and pages the
//! result.
//!
//! Visibility is applied before any filter: a non-admin requester only ever
//! sees reports it owns, whatever `user_id` the filter asks for.

use crate::primitives::{PAGE_SIZE, PAGE_WINDOW};
use crate::report_store::{ReportStore, sort_newest_first};
use crate::{Identity, RecordId, Report, ReportStatus};
use chrono::NaiveDate;
use std::ops::{Range, RangeInclusive};

/// Report criteria. Unset fields match everything; set fields are AND-ed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub user_id: Option<RecordId>,
    pub domain_id: Option<RecordId>,
    pub brand_id: Option<RecordId>,
    pub model_id: Option<RecordId>,
    pub baseline_id: Option<RecordId>,
    pub status: Option<ReportStatus>,
    /// Reports starting before this date are excluded.
    pub start_date: Option<NaiveDate>,
    /// Reports ending after this date are excluded.
    pub end_date: Option<NaiveDate>,
}

fn field_matches(wanted: Option<&RecordId>, actual: Option<&RecordId>) -> bool {
    wanted.is_none_or(|w| actual == Some(w))
}

impl ReportFilter {
    /// True when `report` satisfies every set criterion.
    ///
    /// A report without a start (end) date is not excluded by the start (end)
    /// bound.
    #[must_use]
    pub fn matches(&self, report: &Report) -> bool {
        let s = &report.selection;
        field_matches(self.user_id.as_ref(), Some(&report.user_id))
            && field_matches(self.domain_id.as_ref(), s.domain_id.as_ref())
            && field_matches(self.brand_id.as_ref(), s.brand_id.as_ref())
            && field_matches(self.model_id.as_ref(), s.model_id.as_ref())
            && field_matches(self.baseline_id.as_ref(), s.baseline_id.as_ref())
            && self.status.is_none_or(|st| report.status == st)
            && match (self.start_date, report.start_date) {
                (Some(bound), Some(start)) => start >= bound,
                _ => true,
            }
            && match (self.end_date, report.end_date) {
                (Some(bound), Some(end)) => end <= bound,
                _ => true,
            }
    }

    /// Pin the owner criterion for non-admin requesters.
    #[must_use]
    pub fn scoped_to(mut self, requester: &Identity) -> Self {
        if !requester.is_admin() {
            self.user_id = Some(requester.user_id.clone());
        }
        self
    }
}

/// Stateless filter runner.
pub struct QueryEngine;

impl QueryEngine {
    /// Reports matching every predicate of `filter`, in input order.
    pub fn filter<'a>(
        reports: impl IntoIterator<Item = &'a Report>,
        filter: &ReportFilter,
    ) -> Vec<&'a Report> {
        reports.into_iter().filter(|r| filter.matches(r)).collect()
    }

    /// Reports visible to the requester that match the filter, most
    /// recently updated first.
    #[must_use]
    pub fn run<'a>(
        store: &'a ReportStore,
        requester: &Identity,
        filter: &ReportFilter,
    ) -> Vec<&'a Report> {
        let scoped = filter.clone().scoped_to(requester);
        let mut hits = Self::filter(store.visible_to(requester), &scoped);
        sort_newest_first(&mut hits);
        hits
    }
}

// =============================================================================
// PAGINATION
// =============================================================================

/// 1-based pager over a fixed number of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    total_items: usize,
    page_size: usize,
    current_page: usize,
}

impl Paginator {
    /// A pager on page 1 with the default page size.
    #[must_use]
    pub fn new(total_items: usize) -> Self {
        Self::with_page_size(total_items, PAGE_SIZE)
    }

    /// A pager with a custom page size (minimum 1).
    #[must_use]
    pub fn with_page_size(total_items: usize, page_size: usize) -> Self {
        Self {
            total_items,
            page_size: page_size.max(1),
            current_page: 1,
        }
    }

    #[must_use]
    pub fn total_items(&self) -> usize {
        self.total_items
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.total_items.div_ceil(self.page_size)
    }

    /// Move to `page`. Out-of-range pages are ignored; returns whether the
    /// page changed.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        if page < 1 || page > self.total_pages() || page == self.current_page {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.current_page + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        self.current_page > 1 && self.go_to_page(self.current_page - 1)
    }

    /// Item indices of the current page.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        let start = ((self.current_page - 1) * self.page_size).min(self.total_items);
        let end = (start + self.page_size).min(self.total_items);
        start..end
    }

    /// Slice `items` down to the current page.
    #[must_use]
    pub fn page<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let range = self.range();
        let end = range.end.min(items.len());
        items.get(range.start.min(end)..end).unwrap_or_default()
    }

    /// Page numbers to show as links: up to five, centred on the current page
    /// where possible.
    #[must_use]
    pub fn window(&self) -> RangeInclusive<usize> {
        let total = self.total_pages();
        if total == 0 {
            return 1..=0;
        }
        let half = PAGE_WINDOW / 2;
        let mut start = self.current_page.saturating_sub(half).max(1);
        let end = (start + PAGE_WINDOW - 1).min(total);
        if end + 1 - start < PAGE_WINDOW {
            start = (end + 1).saturating_sub(PAGE_WINDOW).max(1);
        }
        start..=end
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::{ContentEntry, Role, Selection};
    use chrono::Utc;

    fn report(id: &str, owner: &str, domain: &str, status: ReportStatus, start: u32) -> Report {
        let now = Utc::now();
        let day = NaiveDate::from_ymd_opt(2024, 6, start).unwrap();
        Report {
            id: RecordId::new(id),
            user_id: RecordId::new(owner),
            selection: Selection {
                domain_id: Some(RecordId::new(domain)),
                ..Selection::default()
            },
            start_date: Some(day),
            end_date: Some(day),
            content: vec![ContentEntry::new("m", "work")],
            status,
            created_at: now,
            updated_at: now,
        }
    }

    fn identity(id: &str, role: Role) -> Identity {
        Identity {
            user_id: RecordId::new(id),
            username: id.to_string(),
            name: id.to_string(),
            role,
        }
    }

    fn store() -> ReportStore {
        ReportStore::from_records(vec![
            report("r1", "amy", "phones", ReportStatus::Draft, 3),
            report("r2", "amy", "watches", ReportStatus::Submitted, 10),
            report("r3", "bob", "phones", ReportStatus::Submitted, 17),
        ])
        .unwrap()
    }

    #[test]
    fn empty_filter_returns_everything_for_admin() {
        let store = store();
        let admin = identity("root", Role::Admin);
        assert_eq!(
            QueryEngine::run(&store, &admin, &ReportFilter::default()).len(),
            3
        );
    }

    #[test]
    fn non_admin_user_filter_is_overridden() {
        let store = store();
        let amy = identity("amy", Role::User);
        let filter = ReportFilter {
            user_id: Some(RecordId::new("bob")),
            ..ReportFilter::default()
        };
        let hits = QueryEngine::run(&store, &amy, &filter);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|r| r.user_id.as_str() == "amy"));
    }

    #[test]
    fn criteria_are_conjunctive() {
        let store = store();
        let admin = identity("root", Role::Admin);
        let filter = ReportFilter {
            domain_id: Some(RecordId::new("phones")),
            status: Some(ReportStatus::Submitted),
            ..ReportFilter::default()
        };
        let hits = QueryEngine::run(&store, &admin, &filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_str(), "r3");
    }

    #[test]
    fn results_are_newest_first() {
        let mut records = vec![
            report("r1", "amy", "phones", ReportStatus::Draft, 3),
            report("r2", "amy", "phones", ReportStatus::Draft, 4),
            report("r3", "amy", "phones", ReportStatus::Draft, 5),
        ];
        let base = records[0].updated_at;
        records[0].updated_at = base + chrono::Duration::minutes(5);
        records[1].updated_at = base - chrono::Duration::minutes(5);
        records[2].updated_at = base;
        let store = ReportStore::from_records(records).unwrap();

        let hits = QueryEngine::run(&store, &identity("amy", Role::User), &ReportFilter::default());
        let ids: Vec<&str> = hits.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["r1", "r3", "r2"]);
    }

    #[test]
    fn plain_filter_ignores_ownership() {
        let store = store();
        let filter = ReportFilter {
            user_id: Some(RecordId::new("bob")),
            ..ReportFilter::default()
        };
        let hits = QueryEngine::filter(store.records(), &filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_str(), "r3");
    }

    #[test]
    fn date_bounds_require_containment() {
        let store = store();
        let admin = identity("root", Role::Admin);
        let filter = ReportFilter {
            start_date: NaiveDate::from_ymd_opt(2024, 6, 5),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 12),
            ..ReportFilter::default()
        };
        let hits = QueryEngine::run(&store, &admin, &filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_str(), "r2");
    }

    #[test]
    fn undated_report_survives_date_bounds() {
        let mut undated = report("r4", "amy", "phones", ReportStatus::Draft, 1);
        undated.start_date = None;
        undated.end_date = None;
        let filter = ReportFilter {
            start_date: NaiveDate::from_ymd_opt(2024, 6, 5),
            ..ReportFilter::default()
        };
        assert!(filter.matches(&undated));
    }

    #[test]
    fn pagination_basics() {
        let mut pager = Paginator::new(23);
        assert_eq!(pager.total_pages(), 3);
        assert_eq!(pager.range(), 0..10);
        assert!(pager.go_to_page(3));
        assert_eq!(pager.range(), 20..23);
        assert!(!pager.go_to_page(4));
        assert!(!pager.go_to_page(0));
        assert_eq!(pager.current_page(), 3);
        assert!(!pager.next_page());
        assert!(pager.prev_page());
        assert_eq!(pager.current_page(), 2);
    }

    #[test]
    fn empty_result_has_no_pages() {
        let mut pager = Paginator::new(0);
        assert_eq!(pager.total_pages(), 0);
        assert_eq!(pager.range(), 0..0);
        assert!(!pager.go_to_page(1));
        assert!(pager.window().is_empty());
        let items: [u8; 0] = [];
        assert!(pager.page(&items).is_empty());
    }

    #[test]
    fn window_is_at_most_five_pages() {
        let mut pager = Paginator::new(95);
        assert_eq!(pager.window(), 1..=5);
        pager.go_to_page(6);
        assert_eq!(pager.window(), 4..=8);
        pager.go_to_page(10);
        assert_eq!(pager.window(), 6..=10);
        assert_eq!(Paginator::new(25).window(), 1..=3);
    }

    #[test]
    fn page_slices_items() {
        let items: Vec<usize> = (0..12).collect();
        let mut pager = Paginator::new(items.len());
        pager.next_page();
        assert_eq!(pager.page(&items), &[10, 11]);
    }
}
