use thiserror::Error;

pub const LANGUAGE_PLACEHOLDER: &str = "{{language}}";
pub const DATA_PLACEHOLDER: &str = "{{jsonData}}";

/// Plantilla por defecto si no se configura `PROMPT_TEMPLATE_PATH`
pub const DEFAULT_TEMPLATE: &str = "\
You are a brutally honest music critic with a sharp sense of humor. \
Roast the Last.fm user described by the JSON below based on their listening habits: \
recent tracks, top tracks, top artists with play counts, top albums and loved tracks. \
Be witty and specific, mock their taste, their obsessions and their guilty pleasures, \
but keep it playful. Do not list the data back, do not use markdown headings, \
and keep it under 250 words. Write the roast in {{language}}.

{{jsonData}}";

/// Idiomas aceptados si no se configura `SUPPORTED_LANGUAGES`
pub const DEFAULT_LANGUAGES: &[&str] = &[
    "english",
    "spanish",
    "french",
    "german",
    "italian",
    "portuguese",
    "indonesian",
    "dutch",
    "polish",
    "turkish",
    "japanese",
    "korean",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("Prompt template is missing the {0} placeholder")]
    MissingPlaceholder(&'static str),
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Result<Self, PromptError> {
        let text = text.into();
        for placeholder in [LANGUAGE_PLACEHOLDER, DATA_PLACEHOLDER] {
            if !text.contains(placeholder) {
                return Err(PromptError::MissingPlaceholder(placeholder));
            }
        }
        Ok(Self { text })
    }

    /// El idioma se sustituye antes que los datos, así un nombre de
    /// canción con `{{language}}` no se reemplaza.
    pub fn render(&self, language: &str, json_data: &str) -> String {
        self.text
            .replacen(LANGUAGE_PLACEHOLDER, language, 1)
            .replacen(DATA_PLACEHOLDER, json_data, 1)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

/// Conjunto de idiomas admitidos.
///
/// La lista configurada se normaliza (sin espacios, en minúsculas, sin
/// duplicados); la entrada del usuario se compara tal cual.
#[derive(Debug, Clone)]
pub struct SupportedLanguages {
    languages: Vec<String>,
}

impl SupportedLanguages {
    pub fn new<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for language in languages {
            let language = language.as_ref().trim().to_lowercase();
            if !language.is_empty() && !normalized.contains(&language) {
                normalized.push(language);
            }
        }
        Self { languages: normalized }
    }

    /// Devuelve el idioma configurado sólo si coincide exactamente
    pub fn resolve(&self, language: &str) -> Option<&str> {
        self.languages
            .iter()
            .find(|candidate| candidate.as_str() == language)
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

impl Default for SupportedLanguages {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_template_is_valid() {
        assert!(PromptTemplate::new(DEFAULT_TEMPLATE).is_ok());
    }

    #[test]
    fn test_template_requires_both_placeholders() {
        assert_eq!(
            PromptTemplate::new("Roast in {{language}}").unwrap_err(),
            PromptError::MissingPlaceholder(DATA_PLACEHOLDER)
        );
        assert_eq!(
            PromptTemplate::new("Data: {{jsonData}}").unwrap_err(),
            PromptError::MissingPlaceholder(LANGUAGE_PLACEHOLDER)
        );
    }

    #[test]
    fn test_render_substitutes_language_then_data() {
        let template = PromptTemplate::new("Lang={{language}} Data={{jsonData}}").unwrap();
        let rendered = template.render("spanish", r#"{"track":"{{language}}"}"#);
        assert_eq!(rendered, r#"Lang=spanish Data={"track":"{{language}}"}"#);
    }

    #[test]
    fn test_configured_languages_are_normalized() {
        let languages = SupportedLanguages::new(["English", " spanish ", "english", ""]);
        assert_eq!(languages.len(), 2);
        assert_eq!(languages.resolve("english"), Some("english"));
        assert_eq!(languages.resolve("spanish"), Some("spanish"));
    }

    #[test]
    fn test_languages_resolve_only_exact_matches() {
        let languages = SupportedLanguages::new(["english", "spanish"]);
        assert_eq!(languages.resolve("ENGLISH"), None);
        assert_eq!(languages.resolve("English"), None);
        assert_eq!(languages.resolve("spanish "), None);
        assert_eq!(languages.resolve("klingon"), None);
    }

    #[test]
    fn test_default_languages_include_english() {
        assert_eq!(SupportedLanguages::default().resolve("english"), Some("english"));
    }
}
