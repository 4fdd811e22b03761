use std::path::PathBuf;

use arboard::Clipboard;

use crate::config::{self, Settings};
use crate::error::ReviewError;
use crate::history::{FileSlotStore, SlotStore};
use crate::models::{FileRef, FocusArea, Popup, RawAnalysis, Side};
use crate::network::AnalysisRequest;
use crate::review::{MarkerReviewEntry, render_detail, render_label};
use crate::selection::{ExtensionFilter, scan_folder};
use crate::session::SessionController;
use crate::utils::step;

/// Everything the terminal UI shows, around the session controller.
pub struct App<S: SlotStore = FileSlotStore> {
    pub settings: Settings,
    pub controller: SessionController<S>,
    pub filter: ExtensionFilter,
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    /// User config file the API key is written to; `None` keeps it in memory.
    pub credential_path: Option<PathBuf>,

    pub focus: FocusArea,
    pub source_cursor: usize,
    pub target_cursor: usize,
    pub history_cursor: usize,
    pub source_scroll: u16,
    pub target_scroll: u16,
    /// Set after a toggle; the next draw scrolls both texts to the highlight.
    pub follow_highlight: bool,
    pub popup: Popup,
    pub popup_is_error: bool,
    /// `Some` while the API key is being edited.
    pub api_key_input: Option<String>,
    pub status: String,
}

impl<S: SlotStore> App<S> {
    pub fn new(
        settings: Settings,
        controller: SessionController<S>,
        source_dir: PathBuf,
        target_dir: PathBuf,
    ) -> Self {
        let filter = ExtensionFilter::new(&settings.source_extensions, &settings.target_extensions);
        Self {
            settings,
            controller,
            filter,
            source_dir,
            target_dir,
            credential_path: None,
            focus: FocusArea::SourceFiles,
            source_cursor: 0,
            target_cursor: 0,
            history_cursor: 0,
            source_scroll: 0,
            target_scroll: 0,
            follow_highlight: false,
            popup: Popup::hidden(),
            popup_is_error: false,
            api_key_input: None,
            status: String::new(),
        }
    }

    /// Re-reads both folders. Both choices are cleared.
    pub fn rescan(&mut self) {
        for side in [Side::Source, Side::Target] {
            let dir = match side {
                Side::Source => self.source_dir.clone(),
                Side::Target => self.target_dir.clone(),
            };
            match scan_folder(&dir) {
                Ok(files) => {
                    let files = self.filter.filter(side, files);
                    tracing::debug!("{} candidates in {}: {}", side, dir.display(), files.len());
                    self.controller.selection.set_candidates(side, files);
                }
                Err(e) => {
                    tracing::warn!("cannot scan {}: {}", dir.display(), e);
                    self.controller.selection.set_candidates(side, vec![]);
                    self.show_error("Folder scan failed", format!("{}: {}", dir.display(), e));
                }
            }
        }
        self.source_cursor = 0;
        self.target_cursor = 0;
    }

    pub fn move_cursor(&mut self, delta: isize) {
        match self.focus {
            FocusArea::SourceFiles => {
                let len = self.controller.selection.candidates(Side::Source).len();
                self.source_cursor = step(self.source_cursor, delta, len);
            }
            FocusArea::TargetFiles => {
                let len = self.controller.selection.candidates(Side::Target).len();
                self.target_cursor = step(self.target_cursor, delta, len);
            }
            FocusArea::History => {
                let len = self.controller.history().sessions().len();
                self.history_cursor = step(self.history_cursor, delta, len);
            }
            FocusArea::Problems => {
                if let Some(review) = self.controller.review_mut() {
                    review.cursor = step(review.cursor, delta, review.list().len());
                }
            }
            FocusArea::SourceText => {
                self.source_scroll = self.source_scroll.saturating_add_signed(delta as i16);
            }
            FocusArea::TargetText => {
                self.target_scroll = self.target_scroll.saturating_add_signed(delta as i16);
            }
        }
    }

    /// Enter/Space on the focused pane.
    pub fn activate(&mut self) {
        match self.focus {
            FocusArea::SourceFiles => self.choose_at(Side::Source, self.source_cursor),
            FocusArea::TargetFiles => self.choose_at(Side::Target, self.target_cursor),
            FocusArea::Problems => {
                if let Some(cursor) = self.controller.review().map(|r| r.cursor) {
                    self.toggle_problem(cursor);
                }
            }
            FocusArea::History => self.load_history_at(self.history_cursor),
            FocusArea::SourceText | FocusArea::TargetText => {}
        }
    }

    pub fn choose_at(&mut self, side: Side, index: usize) {
        let Some(file) = self.controller.selection.candidates(side).get(index).cloned() else {
            return;
        };
        self.choose(side, &file);
    }

    pub fn choose(&mut self, side: Side, file: &FileRef) {
        match self.controller.selection.choose(side, file) {
            Ok(()) => {
                self.status = if self.controller.selection.is_ready() {
                    "Ready: press v to verify".into()
                } else {
                    format!("{} file: {}", side, file.name)
                };
            }
            Err(e) => self.report(e),
        }
    }

    pub fn toggle_problem(&mut self, index: usize) {
        match self.controller.toggle(index) {
            Ok(()) => self.follow_highlight = true,
            Err(e) => self.report(e),
        }
    }

    pub fn load_history_at(&mut self, index: usize) {
        let Some(id) = self.controller.history().sessions().get(index).map(|s| s.id.clone()) else {
            return;
        };
        match self.controller.load_history(&id) {
            Ok(review) => {
                self.status = format!("Loaded {}", review.session().label);
                self.source_scroll = 0;
                self.target_scroll = 0;
                self.focus = FocusArea::Problems;
            }
            Err(e) => self.report(e),
        }
    }

    pub fn delete_history_at(&mut self, index: usize) {
        let Some(id) = self.controller.history().sessions().get(index).map(|s| s.id.clone()) else {
            return;
        };
        let remaining = self.controller.delete_history(&id).len();
        self.history_cursor = step(self.history_cursor, 0, remaining);
        self.status = "History entry deleted".into();
    }

    pub fn clear_history(&mut self) {
        self.controller.clear_history();
        self.history_cursor = 0;
        self.status = "History cleared".into();
    }

    /// Claims the analysis slot and builds the request, or explains why not.
    pub fn start_analysis(&mut self) -> Option<AnalysisRequest> {
        match self.controller.begin_analysis() {
            Ok((source, target)) => {
                self.status = "Verifying...".into();
                Some(AnalysisRequest {
                    source,
                    target,
                    api_key: self.settings.api_key.clone().unwrap_or_default(),
                    model: self.settings.model.clone(),
                })
            }
            Err(ReviewError::AnalysisInFlight) => None,
            Err(e) => {
                self.status = e.to_string();
                None
            }
        }
    }

    pub fn finish_analysis(&mut self, outcome: Result<RawAnalysis, ReviewError>) {
        match self.controller.finish_analysis(outcome) {
            Ok(review) => {
                let count = review.list().len();
                self.status = match count {
                    0 => "No problems found".into(),
                    1 => "1 problem found".into(),
                    n => format!("{} problems found", n),
                };
                self.source_scroll = 0;
                self.target_scroll = 0;
                self.history_cursor = 0;
                self.focus = FocusArea::Problems;
            }
            Err(e) => {
                tracing::error!("verification failed: {}", e);
                self.status = "Verification failed".into();
                self.show_error("Verification failed", e.to_string());
            }
        }
    }

    pub fn cycle_model(&mut self) {
        self.settings.model = self.settings.next_model();
        self.status = format!("Model: {}", self.settings.model);
    }

    pub fn begin_api_key_edit(&mut self) {
        self.api_key_input = Some(self.settings.api_key.clone().unwrap_or_default());
    }

    pub fn end_api_key_edit(&mut self) {
        self.api_key_input = None;
    }

    pub fn push_api_key_char(&mut self, c: char) {
        if let Some(input) = self.api_key_input.as_mut() {
            input.push(c);
        }
        self.store_api_key();
    }

    pub fn pop_api_key_char(&mut self) {
        if let Some(input) = self.api_key_input.as_mut() {
            input.pop();
        }
        self.store_api_key();
    }

    // Every edit is written through, like a form field bound to storage.
    fn store_api_key(&mut self) {
        let Some(input) = self.api_key_input.clone() else {
            return;
        };
        if let Some(path) = &self.credential_path {
            if let Err(e) = config::save_api_key_to(path, &input) {
                tracing::warn!("could not save API key: {}", e);
            }
        }
        self.settings.api_key = if input.is_empty() { None } else { Some(input) };
    }

    pub fn focused_problem(&self) -> Option<&MarkerReviewEntry> {
        let review = self.controller.review()?;
        review.list().get(review.cursor)
    }

    pub fn copy_focused_problem(&mut self) {
        let Some(text) = self.focused_problem().map(problem_clipboard_text) else {
            return;
        };
        match Clipboard::new().and_then(|mut cb| cb.set_text(text)) {
            Ok(()) => self.status = "Problem copied to clipboard".into(),
            Err(e) => {
                tracing::warn!("clipboard unavailable: {}", e);
                self.status = "Clipboard unavailable".into();
            }
        }
    }

    pub fn show_error(&mut self, title: &str, text: impl Into<String>) {
        self.popup.show(title, text);
        self.popup_is_error = true;
    }

    pub fn close_popup(&mut self) {
        self.popup.visible = false;
        self.popup_is_error = false;
    }

    // Caller bugs are logged and ignored; everything else is shown.
    fn report(&mut self, e: ReviewError) {
        if e.is_programmer_error() {
            tracing::error!("ignored invalid UI action: {}", e);
        } else if e.is_storage() {
            tracing::warn!("{}", e);
        } else {
            self.show_error("Error", e.to_string());
        }
    }
}

pub fn problem_clipboard_text(entry: &MarkerReviewEntry) -> String {
    format!(
        "{}\nSource: \"{}\"\nTarget: \"{}\"\n\n{}",
        render_label(entry),
        entry.marker.source_span,
        entry.marker.target_span,
        render_detail(entry)
    )
}
