use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::SessionError;

/// Caps and exclusions for workspace walks. Owned by the session, not part
/// of the persisted settings file.
#[derive(Debug, Clone)]
pub struct ContextLimits {
    pub max_file_bytes: u64,
    pub max_total_bytes: u64,
    pub max_files: usize,
    pub max_depth: usize,
    pub deny: Vec<String>,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 100 * 1024,
            max_total_bytes: 512 * 1024,
            max_files: 200,
            max_depth: 10,
            deny: [".git", "node_modules", "target", ".idea", ".vscode"]
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

impl ContextLimits {
    /// Hidden entries and deny-listed names are excluded from every walk.
    pub fn is_denied(&self, name: &str) -> bool {
        name.starts_with('.') || self.deny.iter().any(|deny| deny == name)
    }
}

/// One file captured for the backend. `byte_size` is the on-disk size;
/// `content` may be shorter when the per-file cap truncated it.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub path: String,
    pub content: String,
    pub byte_size: u64,
    pub truncated: bool,
}

/// The textual packaging of workspace information for one chat turn:
/// either a set of file contents or a directory-tree rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextBundle {
    pub root: String,
    pub files: Vec<FileEntry>,
    pub tree: Option<String>,
    pub partial: bool,
    pub skipped: Vec<String>,
}

impl ContextBundle {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|file| file.byte_size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.tree.is_none()
    }

    /// The text prepended to the next user turn.
    pub fn render(&self) -> String {
        if let Some(tree) = &self.tree {
            return format!("Directory tree for {}:\n{tree}", self.root);
        }
        let mut out = String::new();
        out.push_str("Here's the current workspace context:\n");
        out.push_str(&format!("Here are the files in the workspace ({}):\n\n", self.root));
        for file in &self.files {
            if file.truncated {
                out.push_str(&format!("File: {} (truncated)\n", file.path));
            } else {
                out.push_str(&format!("File: {}\n", file.path));
            }
            out.push_str(&format!("```\n{}\n```\n\n", file.content));
        }
        if self.partial {
            out.push_str("(workspace context is partial; some entries were omitted)\n");
        }
        out.trim_end().to_string()
    }
}

/// Collects file contents under `root`. A file root yields a single-entry
/// bundle; a directory root is walked depth-first in deterministic order
/// until a cap is hit. Individual unreadable or binary files are recorded
/// as skipped, never fatal.
pub fn gather(root: &Path, limits: &ContextLimits) -> Result<ContextBundle, SessionError> {
    let meta = fs::metadata(root).map_err(|err| SessionError::fs(root, err))?;
    if meta.is_file() {
        let text = read_text(root).map_err(|err| SessionError::fs(root, err))?;
        let Some(text) = text else {
            return Err(SessionError::fs(
                root,
                io::Error::new(io::ErrorKind::InvalidData, "binary or non-text file"),
            ));
        };
        let (content, truncated) = truncate_on_char_boundary(text, limits.max_file_bytes);
        let name = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        return Ok(ContextBundle {
            root: root.display().to_string(),
            files: vec![FileEntry { path: name, content, byte_size: meta.len(), truncated }],
            tree: None,
            partial: false,
            skipped: Vec::new(),
        });
    }
    if !meta.is_dir() {
        return Err(SessionError::fs(
            root,
            io::Error::new(io::ErrorKind::InvalidInput, "not a regular file or directory"),
        ));
    }

    let mut walk = Walk {
        root,
        limits,
        files: Vec::new(),
        skipped: Vec::new(),
        content_total: 0,
        partial: false,
        full: false,
        visited: BTreeSet::new(),
    };
    if let Ok(canon) = fs::canonicalize(root) {
        walk.visited.insert(canon);
    }
    walk.dir(root, 1);
    Ok(ContextBundle {
        root: root.display().to_string(),
        files: walk.files,
        tree: None,
        partial: walk.partial,
        skipped: walk.skipped,
    })
}

/// Renders the directory structure under `root` as a branch drawing, up to
/// the depth cap. Repeated directories (symlink cycles) are marked instead
/// of descended into.
pub fn tree(root: &Path, limits: &ContextLimits) -> Result<ContextBundle, SessionError> {
    let meta = fs::metadata(root).map_err(|err| SessionError::fs(root, err))?;
    if !meta.is_dir() {
        return Err(SessionError::fs(
            root,
            io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
        ));
    }
    let name = root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());
    let mut out = format!("{name}/\n");
    let mut visited = BTreeSet::new();
    if let Ok(canon) = fs::canonicalize(root) {
        visited.insert(canon);
    }
    render_children(root, "", 1, limits, &mut visited, &mut out);
    Ok(ContextBundle {
        root: root.display().to_string(),
        files: Vec::new(),
        tree: Some(out.trim_end().to_string()),
        partial: false,
        skipped: Vec::new(),
    })
}

struct Walk<'a> {
    root: &'a Path,
    limits: &'a ContextLimits,
    files: Vec<FileEntry>,
    skipped: Vec<String>,
    content_total: u64,
    partial: bool,
    full: bool,
    visited: BTreeSet<PathBuf>,
}

impl Walk<'_> {
    fn dir(&mut self, dir: &Path, depth: usize) {
        let entries = match read_dir_sorted(dir) {
            Ok(entries) => entries,
            Err(_) => {
                self.skip(dir, "unreadable");
                return;
            }
        };
        let entries: Vec<DirEntryInfo> = entries
            .into_iter()
            .filter(|entry| !self.limits.is_denied(&entry.name))
            .collect();

        for entry in entries.iter().filter(|entry| !entry.is_dir) {
            if self.full {
                return;
            }
            self.file(&entry.path);
        }
        for entry in entries.iter().filter(|entry| entry.is_dir) {
            if self.full {
                return;
            }
            let canon = match fs::canonicalize(&entry.path) {
                Ok(canon) => canon,
                Err(_) => {
                    self.skip(&entry.path, "unreadable");
                    continue;
                }
            };
            if !self.visited.insert(canon) {
                self.skip(&entry.path, "cycle");
                continue;
            }
            if depth + 1 > self.limits.max_depth {
                if dir_has_visible_entries(&entry.path, self.limits) {
                    self.skip(&entry.path, "depth limit");
                    self.partial = true;
                }
            } else {
                self.dir(&entry.path, depth + 1);
            }
        }
    }

    fn file(&mut self, path: &Path) {
        if self.files.len() >= self.limits.max_files {
            self.partial = true;
            self.full = true;
            return;
        }
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(_) => {
                self.skip(path, "unreadable");
                return;
            }
        };
        let text = match read_text(path) {
            Ok(Some(text)) => text,
            Ok(None) => {
                self.skip(path, "binary");
                return;
            }
            Err(_) => {
                self.skip(path, "unreadable");
                return;
            }
        };
        let (content, truncated) = truncate_on_char_boundary(text, self.limits.max_file_bytes);
        let len = content.len() as u64;
        // The first file always goes in, even when it alone exceeds the cap.
        if !self.files.is_empty() && self.content_total + len > self.limits.max_total_bytes {
            self.partial = true;
            self.full = true;
            return;
        }
        self.content_total += len;
        self.files.push(FileEntry {
            path: self.rel(path),
            content,
            byte_size: meta.len(),
            truncated,
        });
    }

    fn rel(&self, path: &Path) -> String {
        path.strip_prefix(self.root).unwrap_or(path).display().to_string()
    }

    fn skip(&mut self, path: &Path, reason: &str) {
        self.skipped.push(format!("{} ({reason})", self.rel(path)));
    }
}

fn render_children(
    dir: &Path,
    prefix: &str,
    depth: usize,
    limits: &ContextLimits,
    visited: &mut BTreeSet<PathBuf>,
    out: &mut String,
) {
    let entries = match read_dir_sorted(dir) {
        Ok(entries) => entries,
        Err(_) => {
            out.push_str(&format!("{prefix}└── (unreadable)\n"));
            return;
        }
    };
    let (dirs, files): (Vec<DirEntryInfo>, Vec<DirEntryInfo>) = entries
        .into_iter()
        .filter(|entry| !limits.is_denied(&entry.name))
        .partition(|entry| entry.is_dir);
    let mut ordered = dirs;
    ordered.extend(files);

    let last = ordered.len().saturating_sub(1);
    for (i, entry) in ordered.iter().enumerate() {
        let connector = if i == last { "└── " } else { "├── " };
        let child_prefix = if i == last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}│   ")
        };
        if !entry.is_dir {
            out.push_str(&format!("{prefix}{connector}{}\n", entry.name));
            continue;
        }
        let canon = match fs::canonicalize(&entry.path) {
            Ok(canon) => canon,
            Err(_) => {
                out.push_str(&format!("{prefix}{connector}{}/ (unreadable)\n", entry.name));
                continue;
            }
        };
        if !visited.insert(canon) {
            out.push_str(&format!("{prefix}{connector}{}/ (cycle)\n", entry.name));
            continue;
        }
        out.push_str(&format!("{prefix}{connector}{}/\n", entry.name));
        if depth + 1 > limits.max_depth {
            if dir_has_visible_entries(&entry.path, limits) {
                out.push_str(&format!("{child_prefix}└── ...\n"));
            }
        } else {
            render_children(&entry.path, &child_prefix, depth + 1, limits, visited, out);
        }
    }
}

struct DirEntryInfo {
    path: PathBuf,
    name: String,
    is_dir: bool,
}

fn read_dir_sorted(dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = fs::metadata(&path).map(|meta| meta.is_dir()).unwrap_or(false);
        entries.push(DirEntryInfo { path, name, is_dir });
    }
    entries.sort_by_key(|entry| (entry.name.to_lowercase(), entry.name.clone()));
    Ok(entries)
}

fn dir_has_visible_entries(dir: &Path, limits: &ContextLimits) -> bool {
    match fs::read_dir(dir) {
        Ok(mut entries) => entries.any(|entry| {
            entry
                .map(|entry| !limits.is_denied(&entry.file_name().to_string_lossy()))
                .unwrap_or(false)
        }),
        Err(_) => false,
    }
}

/// `None` means the bytes are not text (NUL bytes or invalid UTF-8).
fn read_text(path: &Path) -> io::Result<Option<String>> {
    let bytes = fs::read(path)?;
    if bytes.contains(&0) {
        return Ok(None);
    }
    let (text, _, had_errors) = encoding_rs::UTF_8.decode(&bytes);
    if had_errors {
        return Ok(None);
    }
    Ok(Some(text.into_owned()))
}

fn truncate_on_char_boundary(mut text: String, max: u64) -> (String, bool) {
    let max = max as usize;
    if text.len() <= max {
        return (text, false);
    }
    let mut cut = max;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    (text, true)
}
