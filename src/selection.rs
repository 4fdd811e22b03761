use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::error::ReviewError;
use crate::models::{FileRef, Side};

/// Allowed filename suffixes per side, applied once when candidates are
/// gathered.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    source: Vec<String>,
    target: Vec<String>,
}

impl ExtensionFilter {
    pub fn new(source: &[String], target: &[String]) -> Self {
        Self {
            source: source.iter().map(|e| normalize_extension(e)).collect(),
            target: target.iter().map(|e| normalize_extension(e)).collect(),
        }
    }

    pub fn accepts(&self, side: Side, name: &str) -> bool {
        let allowed = match side {
            Side::Source => &self.source,
            Side::Target => &self.target,
        };
        let name = name.to_lowercase();
        allowed.iter().any(|ext| name.ends_with(ext.as_str()))
    }

    pub fn filter(&self, side: Side, files: Vec<FileRef>) -> Vec<FileRef> {
        files.into_iter().filter(|f| self.accepts(side, &f.name)).collect()
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::new(&[".txt".into()], &[".txt".into(), ".docx".into()])
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') { ext } else { format!(".{}", ext) }
}

/// Recursively lists every file below `root`, sorted by relative path.
pub fn scan_folder(root: &Path) -> Result<Vec<FileRef>> {
    let mut paths = vec![];
    collect_files(root, &mut paths)?;
    let mut files: Vec<FileRef> = paths.into_iter().map(|p| FileRef::new(root, p)).collect();
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}

// Linked directories are never followed. Unreadable subfolders are skipped.
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("skipping an entry of {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if let Err(e) = collect_files(&path, out) {
                tracing::warn!("skipping {}: {}", path.display(), e);
            }
        } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
            out.push(path);
        }
    }
    Ok(())
}

/// The two candidate lists and the file chosen from each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    source_candidates: Vec<FileRef>,
    target_candidates: Vec<FileRef>,
    chosen_source: Option<FileRef>,
    chosen_target: Option<FileRef>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn candidates(&self, side: Side) -> &[FileRef] {
        match side {
            Side::Source => &self.source_candidates,
            Side::Target => &self.target_candidates,
        }
    }

    pub fn chosen(&self, side: Side) -> Option<&FileRef> {
        match side {
            Side::Source => self.chosen_source.as_ref(),
            Side::Target => self.chosen_target.as_ref(),
        }
    }

    /// Replaces one side's candidates. The choice on that side is always
    /// cleared, even when the chosen file is still in the new list.
    pub fn set_candidates(&mut self, side: Side, files: Vec<FileRef>) {
        match side {
            Side::Source => {
                self.source_candidates = files;
                self.chosen_source = None;
            }
            Side::Target => {
                self.target_candidates = files;
                self.chosen_target = None;
            }
        }
    }

    pub fn choose(&mut self, side: Side, file: &FileRef) -> Result<(), ReviewError> {
        if !self.candidates(side).contains(file) {
            return Err(ReviewError::InvalidSelection {
                side,
                file: file.relative_path.display().to_string(),
            });
        }
        let slot = match side {
            Side::Source => &mut self.chosen_source,
            Side::Target => &mut self.chosen_target,
        };
        *slot = Some(file.clone());
        Ok(())
    }

    /// Both sides have a chosen file; gates the verify action.
    pub fn is_ready(&self) -> bool {
        self.chosen_source.is_some() && self.chosen_target.is_some()
    }

    pub fn chosen_pair(&self) -> Option<(FileRef, FileRef)> {
        match (&self.chosen_source, &self.chosen_target) {
            (Some(source), Some(target)) => Some((source.clone(), target.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn file(name: &str) -> FileRef {
        FileRef::new(Path::new("/in"), PathBuf::from(format!("/in/{}", name)))
    }

    fn ready_state() -> SelectionState {
        let mut state = SelectionState::new();
        state.set_candidates(Side::Source, vec![file("ch01.txt"), file("ch02.txt")]);
        state.set_candidates(Side::Target, vec![file("ch01.docx")]);
        state.choose(Side::Source, &file("ch01.txt")).unwrap();
        state.choose(Side::Target, &file("ch01.docx")).unwrap();
        state
    }

    #[test]
    fn ready_only_with_both_choices() {
        let mut state = SelectionState::new();
        state.set_candidates(Side::Source, vec![file("a.txt")]);
        state.set_candidates(Side::Target, vec![file("b.txt")]);
        assert!(!state.is_ready());
        state.choose(Side::Source, &file("a.txt")).unwrap();
        assert!(!state.is_ready());
        state.choose(Side::Target, &file("b.txt")).unwrap();
        assert!(state.is_ready());
        assert_eq!(state.chosen_pair(), Some((file("a.txt"), file("b.txt"))));
    }

    #[test]
    fn choosing_a_non_candidate_fails() {
        let mut state = SelectionState::new();
        state.set_candidates(Side::Source, vec![file("a.txt")]);
        let err = state.choose(Side::Source, &file("x.txt")).unwrap_err();
        assert!(matches!(err, ReviewError::InvalidSelection { side: Side::Source, .. }));
        assert_eq!(state.chosen(Side::Source), None);
        assert!(!state.is_ready());
    }

    #[test]
    fn sides_are_independent() {
        let mut state = SelectionState::new();
        state.set_candidates(Side::Source, vec![file("a.txt")]);
        assert!(state.choose(Side::Target, &file("a.txt")).is_err());
    }

    #[test]
    fn replacing_candidates_clears_that_side_only() {
        let mut state = ready_state();
        state.set_candidates(Side::Source, vec![file("ch01.txt"), file("ch02.txt")]);
        assert_eq!(state.chosen(Side::Source), None);
        assert_eq!(state.chosen(Side::Target), Some(&file("ch01.docx")));
        assert!(!state.is_ready());
    }

    #[test]
    fn extension_filter_per_side() {
        let filter = ExtensionFilter::default();
        assert!(filter.accepts(Side::Source, "Chapter1.TXT"));
        assert!(!filter.accepts(Side::Source, "chapter1.docx"));
        assert!(filter.accepts(Side::Target, "chapter1.docx"));
        assert!(filter.accepts(Side::Target, "chapter1.txt"));
        assert!(!filter.accepts(Side::Target, "notes.md"));

        let kept = filter.filter(Side::Source, vec![file("a.txt"), file("b.pdf")]);
        assert_eq!(kept, vec![file("a.txt")]);
    }

    #[test]
    fn extensions_without_dot_are_normalized() {
        let filter = ExtensionFilter::new(&["md".into()], &[" .RTF ".into()]);
        assert!(filter.accepts(Side::Source, "notes.md"));
        assert!(filter.accepts(Side::Target, "notes.rtf"));
    }

    #[test]
    fn scan_folder_recurses_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("b/ch02.txt"), "two").unwrap();
        fs::write(dir.path().join("ch01.txt"), "one").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let files = scan_folder(dir.path()).unwrap();
        let rel: Vec<_> = files.iter().map(|f| f.relative_path.clone()).collect();
        assert_eq!(
            rel,
            vec![PathBuf::from("a.txt"), PathBuf::from("b/ch02.txt"), PathBuf::from("ch01.txt")]
        );
        assert_eq!(files[1].name, "ch02.txt");
    }

    #[cfg(unix)]
    #[test]
    fn linked_directories_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ch01.txt"), "one").unwrap();
        fs::write(dir.path().join("elsewhere.txt"), "two").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("elsewhere.txt"), dir.path().join("link.txt")).unwrap();

        let files = scan_folder(dir.path()).unwrap();
        let rel: Vec<_> = files.iter().map(|f| f.relative_path.clone()).collect();
        assert_eq!(
            rel,
            vec![PathBuf::from("ch01.txt"), PathBuf::from("elsewhere.txt"), PathBuf::from("link.txt")]
        );
    }
}
