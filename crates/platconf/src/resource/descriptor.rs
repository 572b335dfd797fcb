use std::fmt;
use std::path::{Path, PathBuf};

/// Composite key of a localization resource, derived from its file path.
///
/// `.../<discriminator>/<type>[_<language>].<extension>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaturalKey {
    pub discriminator: String,
    pub language: Option<String>,
    pub type_name: String,
}

impl NaturalKey {
    pub fn parse(path: &Path) -> Self {
        let discriminator = path
            .parent()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = match file_name.find('.') {
            Some(dot) => &file_name[..dot],
            None => file_name.as_str(),
        };

        let (type_name, language) = split_language(stem);

        Self {
            discriminator,
            language: language.map(str::to_string),
            type_name: type_name.to_string(),
        }
    }
}

/// Language codes are short: only an underscore among the last three characters
/// of the stem starts a language suffix (`label_en`, not `selection_list`).
fn split_language(stem: &str) -> (&str, Option<&str>) {
    match stem.rfind('_') {
        Some(underscore) if underscore >= stem.len().saturating_sub(3) => {
            let language = &stem[underscore + 1..];
            if language.is_empty() {
                (stem, None)
            } else {
                (&stem[..underscore], Some(language))
            }
        }
        _ => (stem, None),
    }
}

/// One resolved resource file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    source: PathBuf,
    relative_path: String,
    natural_key: NaturalKey,
}

impl ResourceDescriptor {
    pub fn new(source: impl Into<PathBuf>, relative_path: impl Into<String>) -> Self {
        let source = source.into();
        let natural_key = NaturalKey::parse(&source);
        Self {
            source,
            relative_path: relative_path.into(),
            natural_key,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Path relative to the file set directory, `/` separated.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.relative_path.clone())
    }

    pub fn natural_key(&self) -> &NaturalKey {
        &self.natural_key
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_suffix() {
        let key = NaturalKey::parse(Path::new("/res/i18n/tenantA/label_en.json"));
        assert_eq!(key.discriminator, "tenantA");
        assert_eq!(key.language.as_deref(), Some("en"));
        assert_eq!(key.type_name, "label");
    }

    #[test]
    fn test_no_language_suffix() {
        let key = NaturalKey::parse(Path::new("/res/i18n/tenantA/label.json"));
        assert_eq!(key.discriminator, "tenantA");
        assert_eq!(key.language, None);
        assert_eq!(key.type_name, "label");
    }

    #[test]
    fn test_long_suffix_is_part_of_type() {
        let key = NaturalKey::parse(Path::new("core/selection_list.json"));
        assert_eq!(key.language, None);
        assert_eq!(key.type_name, "selection_list");
    }

    #[test]
    fn test_three_letter_suffix_is_part_of_type() {
        let key = NaturalKey::parse(Path::new("core/countries_gsw.json"));
        assert_eq!(key.language, None);
        assert_eq!(key.type_name, "countries_gsw");
    }

    #[test]
    fn test_single_letter_language() {
        let key = NaturalKey::parse(Path::new("core/label_x.json"));
        assert_eq!(key.language.as_deref(), Some("x"));
        assert_eq!(key.type_name, "label");
    }

    #[test]
    fn test_underscore_in_type_and_language() {
        let key = NaturalKey::parse(Path::new("core/selection_list_de.json"));
        assert_eq!(key.language.as_deref(), Some("de"));
        assert_eq!(key.type_name, "selection_list");
    }

    #[test]
    fn test_trailing_underscore_has_no_language() {
        let key = NaturalKey::parse(Path::new("core/label_.json"));
        assert_eq!(key.language, None);
        assert_eq!(key.type_name, "label_");
    }

    #[test]
    fn test_multiple_extensions_use_first_dot() {
        let key = NaturalKey::parse(Path::new("mail/welcome_fr.html.ftl"));
        assert_eq!(key.language.as_deref(), Some("fr"));
        assert_eq!(key.type_name, "welcome");
    }

    #[test]
    fn test_file_without_parent() {
        let key = NaturalKey::parse(Path::new("label_it.json"));
        assert_eq!(key.discriminator, "");
        assert_eq!(key.language.as_deref(), Some("it"));
    }

    #[test]
    fn test_descriptor_accessors() {
        let descriptor = ResourceDescriptor::new("/data/set/a/b.txt", "a/b.txt");
        assert_eq!(descriptor.file_name(), "b.txt");
        assert_eq!(descriptor.relative_path(), "a/b.txt");
        assert_eq!(descriptor.natural_key().discriminator, "a");
        assert_eq!(descriptor.to_string(), "b.txt");
    }
}
