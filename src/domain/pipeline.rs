//! Filter, sort and paginate stages shared by every list page.
//!
//! A [`ListView`] is the static per-page configuration, a [`ListState`] holds
//! the user-controlled parameters. Evaluation is a pure function of both plus
//! the collection snapshot.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

pub type FieldAccessor<T> = fn(&T) -> &str;

pub struct SortKey<T> {
    pub name: &'static str,
    pub compare: fn(&T, &T) -> Ordering,
}

pub struct ListView<T> {
    pub page_size: usize,
    /// Fixed predicate applied before any user filter (e.g. only field accounts).
    pub base: Option<fn(&T) -> bool>,
    pub kind: Option<FieldAccessor<T>>,
    pub scope: Option<FieldAccessor<T>>,
    pub search_fields: Vec<FieldAccessor<T>>,
    pub sort_keys: Vec<SortKey<T>>,
    pub default_sort: (&'static str, SortOrder),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Only(trimmed.to_string())
        }
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            Self::All => true,
            // admin logs send `in`/`out`, field logs `IN`/`OUT`
            Self::Only(expected) => expected.eq_ignore_ascii_case(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListState {
    kind: Selection,
    scope: Selection,
    search: String,
    sort_key: &'static str,
    sort_order: SortOrder,
    page: usize,
}

impl ListState {
    pub fn for_view<T>(view: &ListView<T>) -> Self {
        Self {
            kind: Selection::All,
            scope: Selection::All,
            search: String::new(),
            sort_key: view.default_sort.0,
            sort_order: view.default_sort.1,
            page: 1,
        }
    }

    pub fn kind(&self) -> &Selection {
        &self.kind
    }

    pub fn scope(&self) -> &Selection {
        &self.scope
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn sort(&self) -> (&'static str, SortOrder) {
        (self.sort_key, self.sort_order)
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_kind(&mut self, kind: Selection) {
        if self.kind != kind {
            self.kind = kind;
            self.page = 1;
        }
    }

    pub fn set_scope(&mut self, scope: Selection) {
        if self.scope != scope {
            self.scope = scope;
            self.page = 1;
        }
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        let search = search.into();
        if self.search != search {
            self.search = search;
            self.page = 1;
        }
    }

    /// Clicking the active column flips its order, another column starts descending.
    pub fn toggle_sort(&mut self, key: &'static str) {
        if self.sort_key == key {
            self.sort_order = self.sort_order.flipped();
        } else {
            self.sort_key = key;
            self.sort_order = SortOrder::Desc;
        }
    }

    pub fn set_sort(&mut self, key: &'static str, order: SortOrder) {
        self.sort_key = key;
        self.sort_order = order;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    /// Forces a page reset, e.g. after a date-range refetch.
    pub fn reset_page(&mut self) {
        self.page = 1;
    }

    /// Stores the clamped page so a later evaluation never starts from a stale index.
    pub fn clamp_page(&mut self, total_pages: usize) {
        self.page = clamp_page(self.page, total_pages);
    }
}

#[derive(Debug)]
pub struct PageView<'a, T> {
    pub rows: Vec<&'a T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

pub fn filter<'a, T>(view: &ListView<T>, state: &ListState, items: &'a [T]) -> Vec<&'a T> {
    let needle = state.search.trim().to_lowercase();

    items
        .iter()
        .filter(|item| view.base.is_none_or(|base| base(item)))
        .filter(|item| view.kind.is_none_or(|kind| state.kind.matches(kind(item))))
        .filter(|item| {
            view.scope
                .is_none_or(|scope| state.scope.matches(scope(item)))
        })
        .filter(|item| {
            needle.is_empty()
                || view
                    .search_fields
                    .iter()
                    .any(|field| field(item).to_lowercase().contains(&needle))
        })
        .collect()
}

pub fn sort<T>(view: &ListView<T>, state: &ListState, rows: &mut [&T]) {
    let Some(key) = view
        .sort_keys
        .iter()
        .find(|key| key.name == state.sort_key)
    else {
        tracing::debug!(sort_key = state.sort_key, "unknown sort key, keeping input order");
        return;
    };

    match state.sort_order {
        SortOrder::Asc => rows.sort_by(|a, b| (key.compare)(a, b)),
        SortOrder::Desc => rows.sort_by(|a, b| (key.compare)(b, a)),
    }
}

/// Filtered and sorted sequence before pagination; this is what exports receive.
pub fn ordered<'a, T>(view: &ListView<T>, state: &ListState, items: &'a [T]) -> Vec<&'a T> {
    let mut rows = filter(view, state, items);
    sort(view, state, &mut rows);
    rows
}

pub fn evaluate<'a, T>(view: &ListView<T>, state: &ListState, items: &'a [T]) -> PageView<'a, T> {
    paginate(ordered(view, state, items), state.page, view.page_size)
}

pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    total_items.div_ceil(page_size).max(1)
}

fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

pub fn paginate<T>(rows: Vec<&T>, page: usize, page_size: usize) -> PageView<'_, T> {
    let page_size = page_size.max(1);
    let total_items = rows.len();
    let total_pages = total_pages(total_items, page_size);
    let page = clamp_page(page, total_pages);
    let start = (page - 1) * page_size;

    let rows = rows.into_iter().skip(start).take(page_size).collect();

    PageView {
        rows,
        page,
        total_pages,
        total_items,
    }
}
