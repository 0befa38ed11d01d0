use std::collections::BTreeSet;

/// Extensions accepted for upload: images, documents, spreadsheets and videos.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", // images
    ".pdf", ".doc", ".docx", // documents
    ".xls", ".xlsx", // spreadsheets
    ".mp4", ".avi", ".mov", ".mkv", // videos
];

/// Extract the lower-cased extension (with its leading dot) from a client filename.
///
/// Only the last path segment is considered, with either `/` or `\` as separator,
/// so `C:\photos\a.PNG` yields `.png`. Returns an empty string when the name has
/// no dot.
pub fn extension_of(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    match base.rfind('.') {
        Some(idx) => base[idx..].to_lowercase(),
        None => String::new(),
    }
}

/// Fixed set of accepted extensions.
///
/// Built once from configuration and handed to the pipeline at construction;
/// entries are normalized to lower case with a leading dot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllowList {
    extensions: BTreeSet<String>,
}

impl AllowList {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().to_lowercase())
            .filter(|e| !e.is_empty() && e != ".")
            .map(|e| {
                if e.starts_with('.') {
                    e
                } else {
                    format!(".{}", e)
                }
            })
            .collect();

        Self { extensions }
    }

    /// `extension` must be in the form produced by [`extension_of`].
    pub fn contains(&self, extension: &str) -> bool {
        !extension.is_empty() && self.extensions.contains(&extension.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn join(&self, sep: &str) -> String {
        self.iter().collect::<Vec<_>>().join(sep)
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_EXTENSIONS)
    }
}
