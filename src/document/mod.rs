//! # Document Composer
//!
//! Fills a card template with a record's fields and writes the result,
//! together with its stylesheet, into the render's work dir:
//!
//! ```text
//! <workdir>/
//! ├── index.svg      rendered markup
//! ├── style.css      stylesheet
//! ├── cover-….png    staged cover   (album)
//! └── qr-….png       link codes     (album, optional)
//! ```
//!
//! Markup references the staged assets by file name only, so the work dir
//! doubles as the resource root when rasterizing.
//!
//! Templates and stylesheets ship embedded in the binary; a
//! [`TemplateSet`] can be pointed at a directory whose files take precedence.

pub mod fields;
pub mod template;

pub use fields::{AlbumAssets, album_fields, weather_fields, wrap_lines};
pub use template::{Fields, Template, Value, escape_xml};

use std::fs;
use std::path::{Path, PathBuf};

use include_dir::{Dir, include_dir};
use tracing::debug;

use crate::assets::WorkDir;
use crate::error::{FrameyError, Result};

/// Markup file name inside the work dir.
pub const MARKUP_FILE: &str = "index.svg";

/// Stylesheet file name inside the work dir.
pub const STYLESHEET_FILE: &str = "style.css";

/// Built-in templates and stylesheets.
static TEMPLATES: Dir = include_dir!("$CARGO_MANIFEST_DIR/assets/templates");

/// A rendered markup document on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupDocument {
    /// Work dir the document lives in (also the resource root)
    pub dir: PathBuf,
    pub markup: PathBuf,
    pub stylesheet: PathBuf,
}

impl MarkupDocument {
    pub fn read_markup(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.markup)?)
    }

    pub fn read_stylesheet(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.stylesheet)?)
    }
}

/// Render `template` with `fields` and write markup plus stylesheet.
pub fn compose(
    fields: &Fields,
    template: &Template,
    stylesheet: &str,
    workdir: &WorkDir,
) -> Result<MarkupDocument> {
    let markup = template.render(fields);
    let doc = MarkupDocument {
        dir: workdir.path().to_path_buf(),
        markup: workdir.join(MARKUP_FILE),
        stylesheet: workdir.join(STYLESHEET_FILE),
    };
    fs::write(&doc.markup, &markup)?;
    fs::write(&doc.stylesheet, stylesheet)?;
    debug!(bytes = markup.len(), dir = %doc.dir.display(), "Composed markup document");
    Ok(doc)
}

/// Template lookup: override directory first, then the embedded set.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    overrides: Option<PathBuf>,
}

impl TemplateSet {
    /// Only the embedded templates.
    pub fn embedded() -> Self {
        Self { overrides: None }
    }

    /// Files in `dir` shadow embedded ones of the same name.
    pub fn with_overrides(dir: impl Into<PathBuf>) -> Self {
        Self {
            overrides: Some(dir.into()),
        }
    }

    pub fn overrides(&self) -> Option<&Path> {
        self.overrides.as_deref()
    }

    /// Raw source of a template or stylesheet.
    pub fn source(&self, name: &str) -> Result<String> {
        if let Some(dir) = &self.overrides {
            let path = dir.join(name);
            if path.is_file() {
                debug!(path = %path.display(), "Using template override");
                return Ok(fs::read_to_string(path)?);
            }
        }
        TEMPLATES
            .get_file(name)
            .and_then(|f| f.contents_utf8())
            .map(str::to_string)
            .ok_or_else(|| FrameyError::Template(format!("unknown template '{}'", name)))
    }

    /// Load and parse a template.
    pub fn template(&self, name: &str) -> Result<Template> {
        Template::parse(&self.source(name)?)
            .map_err(|e| FrameyError::Template(format!("{}: {}", name, e)))
    }

    /// Names of the embedded files.
    pub fn embedded_names() -> Vec<&'static str> {
        let mut names: Vec<_> = TEMPLATES
            .files()
            .filter_map(|f| f.path().to_str())
            .collect();
        names.sort_unstable();
        names
    }
}
