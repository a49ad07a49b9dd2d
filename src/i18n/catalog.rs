//! JSON message catalogs
//!
//! A catalog file is a flat JSON object mapping numeric message ids (as strings)
//! to templates. The English catalog ships inside the binary; a locale file in
//! `<lang_dir>/evaluate/<code>.json` overlays it.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use super::{Enhancer, MessageId, Translator};
use crate::error::CatalogError;

const ENGLISH: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/files/lang/evaluate/en.json"
));

/// Map a system locale such as `en_US.UTF-8` to a catalog code.
pub fn locale_code(locale: &str) -> &'static str {
    match locale {
        "pt_PT.UTF-8" => "br",
        "en_US.UTF-8" => "en",
        _ => "en",
    }
}

/// Validated message catalog. Every [`MessageId`] resolves.
#[derive(Debug, Clone)]
pub struct Catalog {
    code: String,
    messages: HashMap<MessageId, String>,
    enhancer: Option<Enhancer>,
}

impl Catalog {
    /// The embedded English catalog.
    pub fn english() -> Result<Self, CatalogError> {
        let raw = parse_raw(ENGLISH, "embedded en.json")?;
        Self::from_raw("en", raw, "embedded en.json")
    }

    /// Load the catalog for `locale`, overlaying `<lang_dir>/evaluate/<code>.json`
    /// onto the embedded English messages when that file exists.
    pub fn load(lang_dir: &Path, locale: &str) -> Result<Self, CatalogError> {
        let code = locale_code(locale);
        let mut raw = parse_raw(ENGLISH, "embedded en.json")?;

        let path = lang_dir.join("evaluate").join(format!("{}.json", code));
        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| CatalogError::Read {
                path: path.clone(),
                source,
            })?;
            let overlay = parse_raw(&content, &path.display().to_string())?;
            debug!("Loaded {} messages from {:?}", overlay.len(), path);
            raw.extend(overlay);
        } else if code != "en" {
            warn!("No message file at {:?}, falling back to English", path);
        }

        Self::from_raw(code, raw, &path.display().to_string())
    }

    fn from_raw(
        code: &str,
        raw: HashMap<String, String>,
        origin: &str,
    ) -> Result<Self, CatalogError> {
        let mut messages = HashMap::with_capacity(MessageId::ALL.len());
        for id in MessageId::ALL {
            let text = raw
                .get(&id.code().to_string())
                .ok_or_else(|| CatalogError::MissingMessage {
                    origin: origin.to_string(),
                    code: id.code(),
                })?;
            messages.insert(id, text.clone());
        }
        Ok(Self {
            code: code.to_string(),
            messages,
            enhancer: None,
        })
    }

    /// Attach an enhancer used by [`Translator::enhance`].
    pub fn with_enhancer(mut self, enhancer: Enhancer) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    /// Catalog code (`en`, `br`, ...).
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn is_enhanced(&self) -> bool {
        self.enhancer.is_some()
    }
}

impl Translator for Catalog {
    fn message(&self, id: MessageId) -> &str {
        // Presence of every id is checked in `from_raw`.
        self.messages.get(&id).map(String::as_str).unwrap_or_default()
    }

    fn enhance<'a>(&self, line: &'a str) -> Cow<'a, str> {
        match &self.enhancer {
            Some(enhancer) => enhancer.enhance(line),
            None => Cow::Borrowed(line),
        }
    }
}

/// On-disk shape of a message file: id (as a string) to template.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct MessageFile {
    messages: HashMap<String, String>,
}

fn parse_raw(content: &str, origin: &str) -> Result<HashMap<String, String>, CatalogError> {
    serde_json::from_str::<MessageFile>(content)
        .map(|file| file.messages)
        .map_err(|source| CatalogError::Parse {
            origin: origin.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_english_catalog_is_complete() {
        let catalog = Catalog::english().unwrap();
        for id in MessageId::ALL {
            assert!(!catalog.message(id).is_empty(), "empty message {:?}", id);
        }
        assert_eq!(catalog.code(), "en");
    }

    #[test]
    fn test_locale_overlay() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("evaluate")).unwrap();
        let mut file = std::fs::File::create(dir.path().join("evaluate/br.json")).unwrap();
        writeln!(file, r#"{{ "10": "Teste {{}}" }}"#).unwrap();

        let catalog = Catalog::load(dir.path(), "pt_PT.UTF-8").unwrap();
        assert_eq!(catalog.code(), "br");
        assert_eq!(catalog.format(MessageId::TestTitle, &[&2]), "Teste 2");
        assert_eq!(catalog.message(MessageId::Timeout), "Program timeout\n");
    }

    #[test]
    fn test_missing_locale_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::load(dir.path(), "xx_XX.UTF-8").unwrap();
        assert_eq!(catalog.code(), "en");
    }

    #[test]
    fn test_malformed_locale_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("evaluate")).unwrap();
        std::fs::write(dir.path().join("evaluate/en.json"), "{ not json").unwrap();

        let err = Catalog::load(dir.path(), "en_US.UTF-8").unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
    }
}
