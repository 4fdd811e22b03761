use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FocusArea {
    SourceFiles,
    TargetFiles,
    History,
    Problems,
    SourceText,
    TargetText,
}

impl FocusArea {
    const ORDER: [FocusArea; 6] = [
        FocusArea::SourceFiles,
        FocusArea::TargetFiles,
        FocusArea::Problems,
        FocusArea::SourceText,
        FocusArea::TargetText,
        FocusArea::History,
    ];

    pub fn next(self) -> Self {
        let pos = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(pos + 1) % Self::ORDER.len()]
    }

    pub fn previous(self) -> Self {
        let pos = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(pos + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

/// Which of the two parallel texts something belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Side {
    Source,
    Target,
}

impl Side {
    pub fn anchor_prefix(self) -> &'static str {
        match self {
            Side::Source => "src",
            Side::Target => "tgt",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Target => write!(f, "target"),
        }
    }
}

/// One flagged discrepancy between the two texts.
///
/// The input aliases cover the field names the verification server has
/// historically emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    #[serde(alias = "source_span", alias = "english_marker")]
    pub source_span: String,
    #[serde(alias = "target_span", alias = "vietnamese_marker")]
    pub target_span: String,
    #[serde(
        default,
        alias = "explanation",
        alias = "explaination",
        skip_serializing_if = "Option::is_none"
    )]
    pub summary: Option<String>,
    #[serde(
        default,
        alias = "detailed_explanation",
        skip_serializing_if = "Option::is_none"
    )]
    pub detail: Option<String>,
}

impl Marker {
    #[cfg(test)]
    pub fn new(source_span: impl Into<String>, target_span: impl Into<String>) -> Self {
        Self {
            source_span: source_span.into(),
            target_span: target_span.into(),
            summary: None,
            detail: None,
        }
    }

    #[cfg(test)]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    #[cfg(test)]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn span(&self, side: Side) -> &str {
        match side {
            Side::Source => &self.source_span,
            Side::Target => &self.target_span,
        }
    }
}

/// A completed verification run as kept in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub label: String,
    pub source_file_name: String,
    pub target_file_name: String,
    pub source_text: String,
    pub target_text: String,
    pub markers: Vec<Marker>,
}

impl Session {
    pub fn text(&self, side: Side) -> &str {
        match side {
            Side::Source => &self.source_text,
            Side::Target => &self.target_text,
        }
    }
}

/// A file offered for selection, found by scanning a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub name: String,
    pub relative_path: PathBuf,
    pub path: PathBuf,
}

impl FileRef {
    pub fn new(root: &std::path::Path, path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let relative_path = path.strip_prefix(root).map(PathBuf::from).unwrap_or_else(|_| path.clone());
        Self {
            name,
            relative_path,
            path,
        }
    }
}

/// Body of a successful reply from the verification endpoint, before it has
/// been checked for completeness.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnalysis {
    #[serde(default, alias = "source_text", alias = "english_text")]
    pub source_text: Option<String>,
    #[serde(default, alias = "target_text", alias = "vietnamese_text")]
    pub target_text: Option<String>,
    #[serde(default)]
    pub markers: Option<Vec<Marker>>,
}

pub struct Popup {
    pub visible: bool,
    pub title: String,
    pub text: String,
}

impl Popup {
    pub fn hidden() -> Self {
        Self {
            visible: false,
            title: String::new(),
            text: String::new(),
        }
    }

    pub fn show(&mut self, title: impl Into<String>, text: impl Into<String>) {
        self.visible = true;
        self.title = title.into();
        self.text = text.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_accepts_legacy_field_names() {
        let json = r#"{
            "english_marker": "the quick brown",
            "vietnamese_marker": "con cáo nhanh",
            "explaination": "very bad semantic error follows"
        }"#;
        let marker: Marker = serde_json::from_str(json).unwrap();
        assert_eq!(marker.source_span, "the quick brown");
        assert_eq!(marker.target_span, "con cáo nhanh");
        assert_eq!(marker.summary.as_deref(), Some("very bad semantic error follows"));
        assert_eq!(marker.detail, None);
    }

    #[test]
    fn marker_serializes_camel_case() {
        let marker = Marker::new("a", "b").with_detail("longer");
        let value = serde_json::to_value(&marker).unwrap();
        assert_eq!(value["sourceSpan"], "a");
        assert_eq!(value["targetSpan"], "b");
        assert_eq!(value["detail"], "longer");
        assert!(value.get("summary").is_none());
    }

    #[test]
    fn raw_analysis_accepts_language_named_fields() {
        let body = r#"{"english_text": "Hello", "vietnamese_text": "Xin chào", "markers": []}"#;
        let raw: RawAnalysis = serde_json::from_str(body).unwrap();
        assert_eq!(raw.source_text.as_deref(), Some("Hello"));
        assert_eq!(raw.target_text.as_deref(), Some("Xin chào"));
        assert_eq!(raw.markers, Some(vec![]));
    }

    #[test]
    fn file_ref_keeps_path_relative_to_root() {
        let root = std::path::Path::new("/data/chapters");
        let file = FileRef::new(root, PathBuf::from("/data/chapters/book1/ch01.txt"));
        assert_eq!(file.name, "ch01.txt");
        assert_eq!(file.relative_path, PathBuf::from("book1/ch01.txt"));
    }

    #[test]
    fn focus_cycles_both_ways() {
        let mut focus = FocusArea::SourceFiles;
        for _ in 0..6 {
            focus = focus.next();
        }
        assert_eq!(focus, FocusArea::SourceFiles);
        assert_eq!(FocusArea::SourceFiles.previous(), FocusArea::History);
    }
}
