//! Supported content languages and `Accept-Language` negotiation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Uz,
    Ru,
    En,
}

impl Language {
    /// Every translated column exists once per entry, in this order.
    pub const ALL: [Language; 3] = [Language::Uz, Language::Ru, Language::En];

    /// Translation that is required on write and used as the read fallback.
    pub const PRIMARY: Language = Language::Uz;

    pub fn code(self) -> &'static str {
        match self {
            Language::Uz => "uz",
            Language::Ru => "ru",
            Language::En => "en",
        }
    }

    /// Column holding the translation of `base` in this language, e.g. `name_ru`.
    pub fn column(self, base: &str) -> String {
        format!("{}_{}", base, self.code())
    }

    /// Pick the best supported language from an `Accept-Language` header value.
    /// Entries are ranked by q-value; ties keep header order. Region subtags are ignored.
    pub fn negotiate(header: &str) -> Option<Language> {
        let mut ranked: Vec<(f32, usize, Language)> = Vec::new();
        for (pos, entry) in header.split(',').enumerate() {
            let mut parts = entry.trim().split(';');
            let tag = parts.next().unwrap_or("").trim();
            let primary = tag.split('-').next().unwrap_or("");
            let Ok(lang) = primary.parse::<Language>() else { continue };
            let q = parts
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|v| v.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            if q > 0.0 {
                ranked.push((q, pos, lang));
            }
        }
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        ranked.first().map(|(_, _, lang)| *lang)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported language: {0}")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uz" => Ok(Language::Uz),
            "ru" => Ok(Language::Ru),
            "en" => Ok(Language::En),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}
