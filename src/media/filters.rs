//! Tab, search and sort view over a customer's media.
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::model::{Media, MediaType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MediaTab {
    #[default]
    All,
    Only(MediaType),
}

impl MediaTab {
    pub const ALL_TABS: [MediaTab; 5] = [
        MediaTab::All,
        MediaTab::Only(MediaType::Logo),
        MediaTab::Only(MediaType::Photo),
        MediaTab::Only(MediaType::Video),
        MediaTab::Only(MediaType::Document),
    ];

    pub fn matches(&self, media: &Media) -> bool {
        match self {
            MediaTab::All => true,
            MediaTab::Only(kind) => media.media_type == *kind,
        }
    }
}

impl fmt::Display for MediaTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaTab::All => f.write_str("ALL"),
            MediaTab::Only(kind) => kind.fmt(f),
        }
    }
}

impl FromStr for MediaTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(MediaTab::All);
        }
        s.parse::<MediaType>().map(MediaTab::Only)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortBy {
    NameAsc,
    NameDesc,
    SizeAsc,
    SizeDesc,
    DateAsc,
    #[default]
    DateDesc,
}

impl SortBy {
    pub const ALL: [SortBy; 6] = [
        SortBy::NameAsc,
        SortBy::NameDesc,
        SortBy::SizeAsc,
        SortBy::SizeDesc,
        SortBy::DateAsc,
        SortBy::DateDesc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::NameAsc => "name-asc",
            SortBy::NameDesc => "name-desc",
            SortBy::SizeAsc => "size-asc",
            SortBy::SizeDesc => "size-desc",
            SortBy::DateAsc => "date-asc",
            SortBy::DateDesc => "date-desc",
        }
    }

    fn compare(&self, a: &Media, b: &Media) -> Ordering {
        match self {
            SortBy::NameAsc => compare_names(a, b),
            SortBy::NameDesc => compare_names(b, a),
            SortBy::SizeAsc => a.file_size.cmp(&b.file_size),
            SortBy::SizeDesc => b.file_size.cmp(&a.file_size),
            SortBy::DateAsc => a.uploaded_at.cmp(&b.uploaded_at),
            SortBy::DateDesc => b.uploaded_at.cmp(&a.uploaded_at),
        }
    }
}

/// Case-insensitive, with the raw name breaking ties between names that only
/// differ in case.
fn compare_names(a: &Media, b: &Media) -> Ordering {
    a.original_file_name
        .to_lowercase()
        .cmp(&b.original_file_name.to_lowercase())
        .then_with(|| a.original_file_name.cmp(&b.original_file_name))
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SortBy::ALL
            .into_iter()
            .find(|sort| sort.as_str() == wanted)
            .ok_or_else(|| format!("unknown sort '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabCounts {
    pub all: usize,
    pub logo: usize,
    pub photo: usize,
    pub video: usize,
    pub document: usize,
}

impl TabCounts {
    pub fn of(media: &[Media]) -> Self {
        let mut counts = TabCounts {
            all: media.len(),
            ..Default::default()
        };
        for item in media {
            match item.media_type {
                MediaType::Logo => counts.logo += 1,
                MediaType::Photo => counts.photo += 1,
                MediaType::Video => counts.video += 1,
                MediaType::Document => counts.document += 1,
            }
        }
        counts
    }

    pub fn get(&self, tab: MediaTab) -> usize {
        match tab {
            MediaTab::All => self.all,
            MediaTab::Only(MediaType::Logo) => self.logo,
            MediaTab::Only(MediaType::Photo) => self.photo,
            MediaTab::Only(MediaType::Video) => self.video,
            MediaTab::Only(MediaType::Document) => self.document,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaFilters {
    pub active_tab: MediaTab,
    pub search_query: String,
    pub sort_by: SortBy,
}

impl MediaFilters {
    /// Tab filter, then text filter, then a stable sort.
    pub fn apply(&self, media: &[Media]) -> Vec<Media> {
        let needle = self.search_query.trim().to_lowercase();
        let mut out: Vec<Media> = media
            .iter()
            .filter(|m| self.active_tab.matches(m))
            .filter(|m| needle.is_empty() || m.original_file_name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        out.sort_by(|a, b| self.sort_by.compare(a, b));
        out
    }
}

/// Memoized filtered view. The filtered list is rebuilt lazily after the
/// media list or any filter input changes.
#[derive(Debug, Default)]
pub struct MediaView {
    all: Vec<Media>,
    filters: MediaFilters,
    filtered: Option<Vec<Media>>,
}

impl MediaView {
    pub fn new(all: Vec<Media>) -> Self {
        Self {
            all,
            ..Default::default()
        }
    }

    pub fn all(&self) -> &[Media] {
        &self.all
    }

    pub fn filters(&self) -> &MediaFilters {
        &self.filters
    }

    pub fn set_media(&mut self, all: Vec<Media>) {
        self.all = all;
        self.filtered = None;
    }

    pub fn set_tab(&mut self, tab: MediaTab) {
        if self.filters.active_tab != tab {
            self.filters.active_tab = tab;
            self.filtered = None;
        }
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        let query = query.into();
        if self.filters.search_query != query {
            self.filters.search_query = query;
            self.filtered = None;
        }
    }

    pub fn set_sort(&mut self, sort: SortBy) {
        if self.filters.sort_by != sort {
            self.filters.sort_by = sort;
            self.filtered = None;
        }
    }

    pub fn set_filters(&mut self, filters: MediaFilters) {
        if self.filters != filters {
            self.filters = filters;
            self.filtered = None;
        }
    }

    pub fn filtered(&mut self) -> &[Media] {
        let Self {
            all,
            filters,
            filtered,
        } = self;
        filtered.get_or_insert_with(|| filters.apply(all))
    }

    /// Counts per tab over the unfiltered list.
    pub fn tab_counts(&self) -> TabCounts {
        TabCounts::of(&self.all)
    }

    pub fn total_size(&self) -> u64 {
        self.all.iter().map(|m| m.file_size).sum()
    }
}
