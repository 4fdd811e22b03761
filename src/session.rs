use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::error::ReviewError;
use crate::highlight::{Highlighted, anchor_id, highlight};
use crate::history::{HistoryStore, SlotStore};
use crate::models::{FileRef, RawAnalysis, Session, Side};
use crate::review::MarkerReviewList;
use crate::selection::SelectionState;

// "Chapter 12", "ch_03", "Sec.4", "part-2"
static SECTION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z])(chapter|chap|ch|section|sec|part|episode|ep)[\s._-]*0*(\d+)")
        .unwrap()
});
// a file name that starts with a number, e.g. "07 - The Storm.txt"
static LEADING_NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0*(\d+)\b").unwrap());

/// Derives a short history label from the source file name.
pub fn derive_label(file_name: &str) -> String {
    if let Some(caps) = SECTION_REGEX.captures(file_name) {
        let kind = match caps[1].to_lowercase().as_str() {
            "section" | "sec" => "Section",
            "part" => "Part",
            "episode" | "ep" => "Episode",
            _ => "Chapter",
        };
        return format!("{} {}", kind, &caps[2]);
    }
    if let Some(caps) = LEADING_NUMBER_REGEX.captures(file_name) {
        return format!("Chapter {}", &caps[1]);
    }
    file_name.to_string()
}

/// Turns a raw analysis reply into a session for the given pair of files.
pub fn complete_analysis(
    raw: RawAnalysis,
    source: &FileRef,
    target: &FileRef,
) -> Result<Session, ReviewError> {
    let source_text = raw
        .source_text
        .ok_or_else(|| malformed("the source text is missing"))?;
    let target_text = raw
        .target_text
        .ok_or_else(|| malformed("the target text is missing"))?;
    let markers = raw
        .markers
        .ok_or_else(|| malformed("the marker list is missing"))?;

    Ok(Session {
        id: Uuid::new_v4().to_string(),
        created_at: Utc::now(),
        label: derive_label(&source.name),
        source_file_name: source.name.clone(),
        target_file_name: target.name.clone(),
        source_text,
        target_text,
        markers,
    })
}

fn malformed(what: &str) -> ReviewError {
    ReviewError::RemoteCallFailed(format!("malformed response: {}", what))
}

/// A session on screen: its markers, their expansion state and which marker
/// currently highlights the two texts.
#[derive(Debug, Clone)]
pub struct ActiveReview {
    session: Session,
    list: MarkerReviewList,
    highlighted: Option<usize>,
    pub cursor: usize,
}

impl ActiveReview {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn list(&self) -> &MarkerReviewList {
        &self.list
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    /// Flips entry `index` and moves the highlight in both texts to it,
    /// whichever way the entry flipped.
    pub fn toggle(&mut self, index: usize) -> Result<(), ReviewError> {
        self.list = self.list.toggle(index)?;
        self.highlighted = Some(index);
        self.cursor = index;
        Ok(())
    }

    /// Highlights the active marker in one of the texts, always starting
    /// from the session's pristine copy.
    pub fn view(&self, side: Side) -> Highlighted<'_> {
        let text = self.session.text(side);
        match self.highlighted.and_then(|i| self.list.get(i)) {
            Some(entry) => highlight(text, entry.marker.span(side), &anchor_id(side, entry.index)),
            None => Highlighted::plain(text),
        }
    }
}

/// Builds a fresh, fully collapsed review for a session. Fresh results and
/// history loads both come through here.
pub fn rehydrate(session: Session) -> ActiveReview {
    let list = MarkerReviewList::build(&session.markers);
    ActiveReview {
        session,
        list,
        highlighted: None,
        cursor: 0,
    }
}

/// Ties selection, review and history together for one interactive run.
pub struct SessionController<S: SlotStore> {
    pub selection: SelectionState,
    history: HistoryStore<S>,
    review: Option<ActiveReview>,
    in_flight: Option<(FileRef, FileRef)>,
}

impl<S: SlotStore> SessionController<S> {
    pub fn new(history: HistoryStore<S>) -> Self {
        Self {
            selection: SelectionState::new(),
            history,
            review: None,
            in_flight: None,
        }
    }

    pub fn history(&self) -> &HistoryStore<S> {
        &self.history
    }

    pub fn review(&self) -> Option<&ActiveReview> {
        self.review.as_ref()
    }

    pub fn review_mut(&mut self) -> Option<&mut ActiveReview> {
        self.review.as_mut()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The verify action is available: both files chosen, nothing running.
    pub fn can_verify(&self) -> bool {
        self.selection.is_ready() && !self.is_busy()
    }

    /// Claims the analysis slot and returns the files to send.
    pub fn begin_analysis(&mut self) -> Result<(FileRef, FileRef), ReviewError> {
        if self.is_busy() {
            return Err(ReviewError::AnalysisInFlight);
        }
        let pair = self
            .selection
            .chosen_pair()
            .ok_or(ReviewError::SelectionIncomplete)?;
        self.in_flight = Some(pair.clone());
        Ok(pair)
    }

    /// Releases the analysis slot and applies the outcome. On failure nothing
    /// else changes; on success the session is saved and put on screen.
    pub fn finish_analysis(
        &mut self,
        outcome: Result<RawAnalysis, ReviewError>,
    ) -> Result<&ActiveReview, ReviewError> {
        let (source, target) = self.in_flight.take().ok_or_else(|| {
            ReviewError::RemoteCallFailed("no verification was running".into())
        })?;
        let session = complete_analysis(outcome?, &source, &target)?;
        tracing::info!(
            "verification {} finished with {} markers",
            session.id,
            session.markers.len()
        );
        self.history.insert(session.clone());
        Ok(self.review.insert(rehydrate(session)))
    }

    pub fn load_history(&mut self, id: &str) -> Result<&ActiveReview, ReviewError> {
        let session = self
            .history
            .get(id)
            .cloned()
            .ok_or_else(|| ReviewError::SessionNotFound(id.to_string()))?;
        Ok(self.review.insert(rehydrate(session)))
    }

    pub fn delete_history(&mut self, id: &str) -> &[Session] {
        self.history.delete(id)
    }

    pub fn clear_history(&mut self) -> &[Session] {
        self.history.clear_all()
    }

    pub fn toggle(&mut self, index: usize) -> Result<(), ReviewError> {
        match self.review.as_mut() {
            Some(review) => review.toggle(index),
            None => Err(ReviewError::IndexOutOfRange { index, len: 0 }),
        }
    }
}
