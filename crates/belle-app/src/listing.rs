// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Client-side narrowing, ordering and paging of the appointment collection.
//!
//! Every stage is a pure function over borrowed data. [`AppointmentList`]
//! holds the criteria the user picked and recomputes the visible page from
//! the fetched collection on demand.

use std::cmp::Ordering;
use time::{Date, UtcOffset};

use crate::{Appointment, Loadable, SortDirection, SortField};

pub const DEFAULT_PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub date: Option<Date>,
    pub service: Option<String>,
}

impl FilterCriteria {
    pub fn new(date: Option<Date>, service: &str) -> Self {
        Self {
            date,
            service: normalize_service_query(service),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.service.is_none()
    }

    fn matches(&self, appointment: &Appointment, offset: UtcOffset) -> bool {
        if let Some(date) = self.date
            && appointment.starts_at.to_offset(offset).date() != date
        {
            return false;
        }
        if let Some(service) = &self.service
            && !appointment
                .service
                .to_lowercase()
                .contains(&service.to_lowercase())
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortCriteria {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortCriteria {
    fn compare(&self, left: &Appointment, right: &Appointment) -> Ordering {
        let ordering = match self.field {
            SortField::StartsAt => left.starts_at.cmp(&right.starts_at),
            SortField::Service => left
                .service
                .to_lowercase()
                .cmp(&right.service.to_lowercase()),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Items whose local calendar day and service name satisfy `criteria`.
/// Both criteria apply together; an absent criterion matches everything.
pub fn filter_appointments<'a>(
    items: &'a [Appointment],
    criteria: &FilterCriteria,
    offset: UtcOffset,
) -> Vec<&'a Appointment> {
    items
        .iter()
        .filter(|appointment| criteria.matches(appointment, offset))
        .collect()
}

/// Stable sort: appointments with equal keys keep their input order in
/// either direction.
pub fn sort_appointments<'a>(
    items: &[&'a Appointment],
    criteria: SortCriteria,
) -> Vec<&'a Appointment> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|left, right| criteria.compare(left, right));
    sorted
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// Slice `[(page-1)*size, page*size)` of `items`, clipped to its bounds.
pub fn page_slice<T>(items: &[T], page_size: usize, page: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: usize,
    page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub const fn page(&self) -> usize {
        self.page
    }

    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self, len: usize) -> bool {
        self.page < total_pages(len, self.page_size)
    }

    /// Returns whether the page moved; a no-op on the last page.
    pub fn next(&mut self, len: usize) -> bool {
        if !self.has_next(len) {
            return false;
        }
        self.page += 1;
        true
    }

    /// Returns whether the page moved; a no-op on page 1.
    pub fn previous(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.page -= 1;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListCommand {
    SetDate(Option<Date>),
    SetService(String),
    ClearFilters,
    SetSortField(SortField),
    ToggleSortField,
    ToggleDirection,
    NextPage,
    PreviousPage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    CriteriaChanged,
    PageChanged(usize),
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentList {
    pub items: Loadable<Vec<Appointment>>,
    pub filter: FilterCriteria,
    pub sort: SortCriteria,
    pub pagination: Pagination,
    pub offset: UtcOffset,
}

impl Default for AppointmentList {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, UtcOffset::UTC)
    }
}

impl AppointmentList {
    pub fn new(page_size: usize, offset: UtcOffset) -> Self {
        Self {
            items: Loadable::Idle,
            filter: FilterCriteria::default(),
            sort: SortCriteria::default(),
            pagination: Pagination::new(page_size),
            offset,
        }
    }

    pub fn begin_load(&mut self) {
        self.items = Loadable::Loading;
    }

    /// Replaces the whole collection. Criteria survive a refetch; the page
    /// resets because the items it referred to may be gone.
    pub fn finish_load(&mut self, result: Result<Vec<Appointment>, String>) {
        self.items = match result {
            Ok(items) => Loadable::Loaded(items),
            Err(message) => Loadable::Failed(message),
        };
        self.pagination.reset();
    }

    pub fn discard(&mut self) {
        self.items = Loadable::Idle;
        self.pagination.reset();
    }

    pub fn dispatch(&mut self, command: ListCommand) -> ListEvent {
        match command {
            ListCommand::SetDate(date) => {
                self.filter.date = date;
                self.criteria_changed()
            }
            ListCommand::SetService(service) => {
                self.filter.service = normalize_service_query(&service);
                self.criteria_changed()
            }
            ListCommand::ClearFilters => {
                self.filter = FilterCriteria::default();
                self.criteria_changed()
            }
            ListCommand::SetSortField(field) => {
                self.sort.field = field;
                self.criteria_changed()
            }
            ListCommand::ToggleSortField => {
                self.sort.field = self.sort.field.toggled();
                self.criteria_changed()
            }
            ListCommand::ToggleDirection => {
                self.sort.direction = self.sort.direction.reversed();
                self.criteria_changed()
            }
            ListCommand::NextPage => {
                let len = self.visible_len();
                if self.pagination.next(len) {
                    ListEvent::PageChanged(self.pagination.page())
                } else {
                    ListEvent::Unchanged
                }
            }
            ListCommand::PreviousPage => {
                if self.pagination.previous() {
                    ListEvent::PageChanged(self.pagination.page())
                } else {
                    ListEvent::Unchanged
                }
            }
        }
    }

    pub fn ordered(&self) -> Vec<&Appointment> {
        let Some(items) = self.items.loaded() else {
            return Vec::new();
        };
        let filtered = filter_appointments(items, &self.filter, self.offset);
        sort_appointments(&filtered, self.sort)
    }

    pub fn presentation(&self) -> ListPresentation<'_> {
        let items = match &self.items {
            Loadable::Idle | Loadable::Loading => return ListPresentation::Loading,
            Loadable::Failed(message) => return ListPresentation::Failed(message),
            Loadable::Loaded(items) => items,
        };

        let ordered = self.ordered();
        let filtered = !self.filter.is_empty();
        if ordered.is_empty() {
            return ListPresentation::Empty { filtered };
        }

        let page_size = self.pagination.page_size();
        let page = self.pagination.page();
        ListPresentation::Page(PageView {
            items: page_slice(&ordered, page_size, page).to_vec(),
            page,
            total_pages: total_pages(ordered.len(), page_size),
            shown: ordered.len(),
            total: items.len(),
            filtered,
            has_previous: self.pagination.has_previous(),
            has_next: self.pagination.has_next(ordered.len()),
        })
    }

    fn visible_len(&self) -> usize {
        self.ordered().len()
    }

    fn criteria_changed(&mut self) -> ListEvent {
        self.pagination.reset();
        ListEvent::CriteriaChanged
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListPresentation<'a> {
    Loading,
    Failed(&'a str),
    Empty { filtered: bool },
    Page(PageView<'a>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView<'a> {
    pub items: Vec<&'a Appointment>,
    pub page: usize,
    pub total_pages: usize,
    /// Items left after filtering.
    pub shown: usize,
    /// Items in the fetched collection.
    pub total: usize,
    pub filtered: bool,
    pub has_previous: bool,
    pub has_next: bool,
}

fn normalize_service_query(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
