/*
 * ghharvest
 *
 * ghharvest is free software; you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation; either version 2 of the License, or
 * (at your option) any later version.
 *
 * ghharvest is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with ghharvest.  If not, see <http://www.gnu.org/licenses/>.
 *
 */

use std::iter::FusedIterator;

use log::{debug, trace};
use serde_json::{Map, Value};

use crate::error::HarvestResult;
use crate::github::ResourceKind;

/// One issue, pull request or commit, exactly as the API returned it.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    /// Whether the `Link` header advertised a next page, `None` without a header.
    pub has_next: Option<bool>,
}

impl Page {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            has_next: None,
        }
    }

    pub fn with_next(mut self, has_next: bool) -> Self {
        self.has_next = Some(has_next);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True when no page can follow this one.
    pub fn is_last(&self, per_page: u32) -> bool {
        self.records.len() < per_page as usize || self.has_next == Some(false)
    }
}

/// Anything able to serve one numbered page of a resource listing.
pub trait PageSource {
    fn fetch_page(&self, kind: ResourceKind, page: u32, per_page: u32) -> HarvestResult<Page>;
}

/// Lazy sequence of pages for one resource kind, starting at page 1.
///
/// The sequence ends after a short page, an empty page, a page whose `Link`
/// header has no next relation, or the first error.
pub struct Pages<'a, S: PageSource + ?Sized> {
    source: &'a S,
    kind: ResourceKind,
    per_page: u32,
    next_page: u32,
    done: bool,
}

impl<'a, S: PageSource + ?Sized> Pages<'a, S> {
    pub fn new(source: &'a S, kind: ResourceKind, per_page: u32) -> Self {
        Self {
            source,
            kind,
            per_page,
            next_page: 1,
            done: false,
        }
    }

    /// Number of the page the next call to `next` will request.
    pub fn next_page(&self) -> u32 {
        self.next_page
    }

    pub fn restart(&mut self) {
        self.next_page = 1;
        self.done = false;
    }
}

impl<S: PageSource + ?Sized> Iterator for Pages<'_, S> {
    type Item = HarvestResult<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let number = self.next_page;
        trace!("Requesting {} page {}", self.kind, number);

        let page = match self.source.fetch_page(self.kind, number, self.per_page) {
            Ok(page) => page,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };

        if page.is_empty() {
            debug!("{} page {} is empty, end of data", self.kind, number);
            self.done = true;
            return None;
        }

        if page.is_last(self.per_page) {
            debug!("{} page {} is the last one", self.kind, number);
            self.done = true;
        } else {
            self.next_page += 1;
        }
        Some(Ok(page))
    }
}

impl<S: PageSource + ?Sized> FusedIterator for Pages<'_, S> {}

/// Collects every record of `kind`, in API order.
///
/// Records fetched before a failing page are discarded along with the error.
pub fn fetch_all<S: PageSource + ?Sized>(
    source: &S,
    kind: ResourceKind,
    per_page: u32,
    max_items: Option<usize>,
) -> HarvestResult<Vec<Record>> {
    fetch_all_with(source, kind, per_page, max_items, |_, _| {})
}

/// Like `fetch_all`, calling `on_page(page_number, total_so_far)` after each page.
pub fn fetch_all_with<S, F>(
    source: &S,
    kind: ResourceKind,
    per_page: u32,
    max_items: Option<usize>,
    mut on_page: F,
) -> HarvestResult<Vec<Record>>
where
    S: PageSource + ?Sized,
    F: FnMut(u32, usize),
{
    let mut records: Vec<Record> = Vec::new();
    let mut pages = Pages::new(source, kind, per_page);

    loop {
        let number = pages.next_page();
        let page = match pages.next() {
            Some(page) => page?,
            None => break,
        };

        records.extend(page.records);
        on_page(number, records.len());

        if let Some(limit) = max_items {
            if records.len() >= limit {
                debug!("Limit of {} {} reached, stopping", limit, kind);
                records.truncate(limit);
                break;
            }
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarvestError;
    use serde_json::json;
    use std::cell::RefCell;

    fn record(n: usize) -> Record {
        match json!({ "number": n }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    /// Serves `total` records in slices of `per_page`; optionally with Link hints.
    struct Fixture {
        total: usize,
        link_hints: bool,
        fail_on: Option<u32>,
        requested: RefCell<Vec<u32>>,
    }

    impl Fixture {
        fn new(total: usize) -> Self {
            Self {
                total,
                link_hints: false,
                fail_on: None,
                requested: RefCell::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<u32> {
            self.requested.borrow().clone()
        }
    }

    impl PageSource for Fixture {
        fn fetch_page(&self, _kind: ResourceKind, page: u32, per_page: u32) -> HarvestResult<Page> {
            self.requested.borrow_mut().push(page);
            if self.fail_on == Some(page) {
                return Err(HarvestError::RateLimit { reset: None });
            }
            let start = ((page - 1) * per_page) as usize;
            let end = (start + per_page as usize).min(self.total);
            let records = (start.min(end)..end).map(record).collect();
            let page = Page::new(records);
            if self.link_hints {
                Ok(page.with_next(end < self.total))
            } else {
                Ok(page)
            }
        }
    }

    #[test]
    fn stops_after_short_page() {
        let fixture = Fixture::new(250);
        let records = fetch_all(&fixture, ResourceKind::Issues, 100, None).unwrap();
        assert_eq!(records.len(), 250);
        assert_eq!(fixture.requests(), vec![1, 2, 3]);
    }

    #[test]
    fn exact_multiple_needs_trailing_empty_page_without_hints() {
        let fixture = Fixture::new(200);
        let records = fetch_all(&fixture, ResourceKind::Commits, 100, None).unwrap();
        assert_eq!(records.len(), 200);
        assert_eq!(fixture.requests(), vec![1, 2, 3]);
    }

    #[test]
    fn link_hint_avoids_trailing_request() {
        let mut fixture = Fixture::new(200);
        fixture.link_hints = true;
        let records = fetch_all(&fixture, ResourceKind::Commits, 100, None).unwrap();
        assert_eq!(records.len(), 200);
        assert_eq!(fixture.requests(), vec![1, 2]);
    }

    #[test]
    fn empty_listing_yields_nothing() {
        let fixture = Fixture::new(0);
        let mut pages = Pages::new(&fixture, ResourceKind::PullRequests, 30);
        assert!(pages.next().is_none());
        assert!(pages.next().is_none());
        assert_eq!(fixture.requests(), vec![1]);
    }

    #[test]
    fn preserves_source_order() {
        let fixture = Fixture::new(7);
        let records = fetch_all(&fixture, ResourceKind::Issues, 3, None).unwrap();
        let numbers: Vec<u64> = records
            .iter()
            .map(|r| r["number"].as_u64().unwrap())
            .collect();
        assert_eq!(numbers, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn error_fuses_the_sequence() {
        let mut fixture = Fixture::new(500);
        fixture.fail_on = Some(2);
        let mut pages = Pages::new(&fixture, ResourceKind::Issues, 100);
        assert!(pages.next().unwrap().is_ok());
        assert!(matches!(
            pages.next(),
            Some(Err(HarvestError::RateLimit { .. }))
        ));
        assert!(pages.next().is_none());
        assert_eq!(fixture.requests(), vec![1, 2]);
    }

    #[test]
    fn failure_discards_partial_results() {
        let mut fixture = Fixture::new(500);
        fixture.fail_on = Some(3);
        let result = fetch_all(&fixture, ResourceKind::Issues, 100, None);
        assert!(matches!(result, Err(HarvestError::RateLimit { .. })));
        assert_eq!(fixture.requests(), vec![1, 2, 3]);
    }

    #[test]
    fn restart_begins_again_at_page_one() {
        let fixture = Fixture::new(15);
        let mut pages = Pages::new(&fixture, ResourceKind::Issues, 10);
        assert_eq!(pages.by_ref().count(), 2);
        pages.restart();
        assert_eq!(pages.next_page(), 1);
        assert_eq!(pages.count(), 2);
        assert_eq!(fixture.requests(), vec![1, 2, 1, 2]);
    }

    #[test]
    fn max_items_truncates_and_stops_requesting() {
        let fixture = Fixture::new(1000);
        let records = fetch_all(&fixture, ResourceKind::Issues, 100, Some(150)).unwrap();
        assert_eq!(records.len(), 150);
        assert_eq!(fixture.requests(), vec![1, 2]);
    }

    #[test]
    fn progress_callback_sees_running_totals() {
        let fixture = Fixture::new(25);
        let mut seen = Vec::new();
        fetch_all_with(&fixture, ResourceKind::Issues, 10, None, |page, total| {
            seen.push((page, total))
        })
        .unwrap();
        assert_eq!(seen, vec![(1, 10), (2, 20), (3, 25)]);
    }
}
