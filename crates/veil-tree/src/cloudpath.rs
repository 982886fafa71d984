//! The three-segment cloud address: `{appPrefix}/{dirPrefix}/{fileName}`.
//!
//! The same logical node owns two remote objects distinguished only by
//! extension: `.rcrd` (metadata record) and `.data` (content blob).
//! Everything here is pure string manipulation; no I/O, no state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Extension of the node metadata record object.
pub const RECORD_EXT: &str = "rcrd";
/// Extension of the content blob object.
pub const CONTENT_EXT: &str = "data";

/// Which file-name variant a comparison considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    WithExt,
    WithoutExt,
}

/// Explicit component selection for comparisons. The two file-name
/// variants are mutually exclusive, which the `Option<NameMatch>` shape
/// makes unrepresentable rather than merely invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Components {
    pub app_prefix: bool,
    pub dir_prefix: bool,
    pub file_name: Option<NameMatch>,
}

impl Components {
    pub const ALL_WITH_EXT: Components = Components {
        app_prefix: true,
        dir_prefix: true,
        file_name: Some(NameMatch::WithExt),
    };

    pub const ALL_WITHOUT_EXT: Components = Components {
        app_prefix: true,
        dir_prefix: true,
        file_name: Some(NameMatch::WithoutExt),
    };

    pub const FILE_NAME_WITH_EXT: Components = Components {
        app_prefix: false,
        dir_prefix: false,
        file_name: Some(NameMatch::WithExt),
    };

    pub const FILE_NAME_WITHOUT_EXT: Components = Components {
        app_prefix: false,
        dir_prefix: false,
        file_name: Some(NameMatch::WithoutExt),
    };
}

/// A parsed cloud path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CloudPath {
    pub app_prefix: String,
    pub dir_prefix: String,
    /// The (obfuscated) file name, with or without an extension.
    pub file_name: String,
}

impl CloudPath {
    pub fn new(
        app_prefix: impl Into<String>,
        dir_prefix: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        CloudPath {
            app_prefix: app_prefix.into(),
            dir_prefix: dir_prefix.into(),
            file_name: file_name.into(),
        }
    }

    /// Parse a `/`-separated path. `None` on anything but exactly three
    /// non-empty segments.
    pub fn parse(path: &str) -> Option<CloudPath> {
        let mut parts = path.split('/');
        let app_prefix = parts.next()?;
        let dir_prefix = parts.next()?;
        let file_name = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        if app_prefix.is_empty() || dir_prefix.is_empty() || file_name.is_empty() {
            return None;
        }
        Some(CloudPath::new(app_prefix, dir_prefix, file_name))
    }

    /// The full path in string form.
    pub fn path(&self) -> String {
        format!("{}/{}/{}", self.app_prefix, self.dir_prefix, self.file_name)
    }

    /// The file name's extension, if it has one (e.g. "rcrd" or "data").
    pub fn extension(&self) -> Option<&str> {
        extension_of(&self.file_name)
    }

    /// The file name stripped of any extension.
    pub fn file_name_without_ext(&self) -> &str {
        stem_of(&self.file_name)
    }

    /// A copy with the file name's extension replaced (or removed).
    pub fn with_extension(&self, ext: Option<&str>) -> CloudPath {
        CloudPath {
            app_prefix: self.app_prefix.clone(),
            dir_prefix: self.dir_prefix.clone(),
            file_name: set_extension(&self.file_name, ext),
        }
    }

    /// The full path with the given extension substituted.
    pub fn path_with_extension(&self, ext: Option<&str>) -> String {
        self.with_extension(ext).path()
    }

    /// Compare against another path over the selected components only.
    pub fn eq_components(&self, other: &CloudPath, components: Components) -> bool {
        if components.app_prefix && self.app_prefix != other.app_prefix {
            return false;
        }
        if components.dir_prefix && self.dir_prefix != other.dir_prefix {
            return false;
        }
        match components.file_name {
            Some(NameMatch::WithExt) => self.file_name == other.file_name,
            Some(NameMatch::WithoutExt) => {
                self.file_name_without_ext() == other.file_name_without_ext()
            }
            None => true,
        }
    }

    /// Exact match ignoring the file extension.
    pub fn eq_ignoring_extension(&self, other: &CloudPath) -> bool {
        self.eq_components(other, Components::ALL_WITHOUT_EXT)
    }

    /// Match a raw path string over the selected components. A malformed
    /// string matches nothing.
    pub fn matches_path(&self, path: &str, components: Components) -> bool {
        match CloudPath::parse(path) {
            Some(other) => self.eq_components(&other, components),
            None => false,
        }
    }

    /// Match a bare file name (including extension).
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        self.file_name == file_name
    }

    /// Match a bare file name considering the selected name variant.
    pub fn matches_file_name_with(&self, file_name: &str, variant: NameMatch) -> bool {
        match variant {
            NameMatch::WithExt => self.file_name == file_name,
            NameMatch::WithoutExt => self.file_name_without_ext() == stem_of(file_name),
        }
    }
}

impl fmt::Display for CloudPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.app_prefix, self.dir_prefix, self.file_name)
    }
}

/// Extract a file name's extension. A leading-dot-only name (".hidden")
/// counts as having no extension.
pub fn extension_of(file_name: &str) -> Option<&str> {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

fn stem_of(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => stem,
        _ => file_name,
    }
}

/// Strip any existing extension and append the given one (or none).
/// Idempotent: applying the same extension twice changes nothing.
pub fn set_extension(file_name: &str, ext: Option<&str>) -> String {
    let stem = stem_of(file_name);
    match ext {
        Some(e) if !e.is_empty() => format!("{stem}.{e}"),
        _ => stem.to_string(),
    }
}
