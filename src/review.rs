use crate::error::ReviewError;
use crate::models::Marker;

pub const NO_PROBLEMS: &str = "No problems found.";
pub const NO_DETAIL: &str = "No detailed explanation provided";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerReviewEntry {
    pub index: usize,
    pub marker: Marker,
    pub expanded: bool,
}

/// What the problems pane draws, one row per entry or a single placeholder.
#[derive(Debug, PartialEq, Eq)]
pub enum ReviewRow<'a> {
    NoProblems,
    Entry(&'a MarkerReviewEntry),
}

/// The markers of one session plus their expand/collapse state.
///
/// Expansion is per entry; several entries may be open at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerReviewList {
    entries: Vec<MarkerReviewEntry>,
}

impl MarkerReviewList {
    pub fn build(markers: &[Marker]) -> Self {
        Self {
            entries: build(markers),
        }
    }

    pub fn entries(&self) -> &[MarkerReviewEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&MarkerReviewEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn toggle(&self, index: usize) -> Result<Self, ReviewError> {
        Ok(Self {
            entries: toggle(&self.entries, index)?,
        })
    }

    pub fn rows(&self) -> Vec<ReviewRow<'_>> {
        if self.entries.is_empty() {
            vec![ReviewRow::NoProblems]
        } else {
            self.entries.iter().map(ReviewRow::Entry).collect()
        }
    }
}

pub fn build(markers: &[Marker]) -> Vec<MarkerReviewEntry> {
    markers
        .iter()
        .enumerate()
        .map(|(index, marker)| MarkerReviewEntry {
            index,
            marker: marker.clone(),
            expanded: false,
        })
        .collect()
}

/// Returns a copy of `entries` with entry `index` flipped.
pub fn toggle(
    entries: &[MarkerReviewEntry],
    index: usize,
) -> Result<Vec<MarkerReviewEntry>, ReviewError> {
    if index >= entries.len() {
        return Err(ReviewError::IndexOutOfRange {
            index,
            len: entries.len(),
        });
    }
    let mut next = entries.to_vec();
    next[index].expanded = !next[index].expanded;
    Ok(next)
}

pub fn render_label(entry: &MarkerReviewEntry) -> String {
    match entry.marker.summary.as_deref() {
        Some(summary) if !summary.trim().is_empty() => summary.to_string(),
        _ => format!("Problem {}", entry.index + 1),
    }
}

pub fn render_detail(entry: &MarkerReviewEntry) -> &str {
    match entry.marker.detail.as_deref() {
        Some(detail) if !detail.trim().is_empty() => detail,
        _ => NO_DETAIL,
    }
}
