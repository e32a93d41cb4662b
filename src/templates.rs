//! Localized notification bodies and subjects.
//!
//! Templates are HTML with `{{ field }}` placeholders. `{{ field | round }}`
//! prints a percentage with two decimals. Every template is parsed when the
//! registry is built, so a broken bundle fails at startup instead of in the
//! middle of a run.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::compose::MailTemplateInput;
use crate::error::TemplateError;

const BUNDLED_TEMPLATES: &[(&str, &str)] = &[
    ("bg", include_str!("../templates/bg.html")),
    ("en", include_str!("../templates/en.html")),
];

const BUNDLED_SUBJECTS: &str = include_str!("../templates/subjects.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Hostname,
    Path,
    Free,
    Total,
    Used,
    Limit,
    FreePercent,
    UsedPercent,
    Version,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        let field = match name {
            "hostname" => Field::Hostname,
            "path" => Field::Path,
            "free" => Field::Free,
            "total" => Field::Total,
            "used" => Field::Used,
            "limit" => Field::Limit,
            "free_percent" => Field::FreePercent,
            "used_percent" => Field::UsedPercent,
            "version" => Field::Version,
            _ => return None,
        };
        Some(field)
    }

    fn is_percent(self) -> bool {
        matches!(self, Field::FreePercent | Field::UsedPercent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Filter {
    Round,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Value { field: Field, filter: Option<Filter> },
}

#[derive(Debug, Clone)]
struct Template {
    segments: Vec<Segment>,
}

impl Template {
    fn parse(source: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let after_open = &rest[start + 2..];
            let end = after_open
                .find("}}")
                .ok_or_else(|| format!("unterminated '{{{{' at byte {}", offset + start))?;
            segments.push(parse_placeholder(&after_open[..end])?);

            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Template { segments })
    }

    fn render(&self, input: &MailTemplateInput) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Value { field, filter } => out.push_str(&render_value(*field, *filter, input)),
            }
        }
        out
    }
}

fn parse_placeholder(inner: &str) -> Result<Segment, String> {
    let mut parts = inner.split('|').map(str::trim);
    let name = parts.next().unwrap_or_default();
    let field = Field::from_name(name).ok_or_else(|| format!("unknown field '{name}'"))?;

    let filter = match parts.next() {
        None => None,
        Some("round") if field.is_percent() => Some(Filter::Round),
        Some("round") => return Err(format!("'round' applied to non-numeric field '{name}'")),
        Some(other) => return Err(format!("unknown function '{other}'")),
    };
    if parts.next().is_some() {
        return Err(format!("only one function allowed in '{{{{{}}}}}'", inner.trim()));
    }

    Ok(Segment::Value { field, filter })
}

fn render_value(field: Field, filter: Option<Filter>, input: &MailTemplateInput) -> String {
    let text: &str = match field {
        Field::Hostname => &input.hostname,
        Field::Path => &input.path,
        Field::Free => &input.free,
        Field::Total => &input.total,
        Field::Used => &input.used,
        Field::Limit => &input.limit,
        Field::Version => input.version.as_deref().unwrap_or_default(),
        Field::FreePercent => return format_percent(input.free_percent, filter),
        Field::UsedPercent => return format_percent(input.used_percent, filter),
    };
    escape_html(text)
}

fn format_percent(value: f64, filter: Option<Filter>) -> String {
    match filter {
        Some(Filter::Round) => round(value),
        None => value.to_string(),
    }
}

/// Two decimal places, the way percentages are shown to people.
pub fn round(value: f64) -> String {
    format!("{value:.2}")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Per-language templates and subjects, immutable once built.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, Template>,
    subjects: HashMap<String, String>,
}

impl TemplateRegistry {
    /// The templates compiled into the binary.
    pub fn builtin() -> Result<Self, TemplateError> {
        Self::from_sources(BUNDLED_TEMPLATES.iter().copied(), BUNDLED_SUBJECTS)
    }

    pub fn from_sources<'a, I>(templates: I, subjects_json: &str) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let subjects: HashMap<String, String> = serde_json::from_str(subjects_json)?;

        let mut parsed = BTreeMap::new();
        for (language, source) in templates {
            let template = Template::parse(source).map_err(|reason| TemplateError::Malformed {
                language: language.to_string(),
                reason,
            })?;
            parsed.insert(language.to_string(), template);
        }

        Ok(TemplateRegistry {
            templates: parsed,
            subjects,
        })
    }

    pub fn render(&self, language: &str, input: &MailTemplateInput) -> Result<String, TemplateError> {
        let template = self
            .templates
            .get(language)
            .ok_or_else(|| TemplateError::NotFound(language.to_string()))?;
        Ok(template.render(input))
    }

    pub fn subject_for(&self, language: &str) -> Option<&str> {
        self.subjects.get(language).map(String::as_str)
    }

    pub fn supported_languages(&self) -> BTreeSet<&str> {
        self.templates.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> MailTemplateInput {
        MailTemplateInput {
            hostname: "db-01".to_string(),
            path: "/var/lib".to_string(),
            free: "500.0 MB".to_string(),
            total: "1.0 GB".to_string(),
            used: "500.0 MB".to_string(),
            limit: "1.0 GB".to_string(),
            free_percent: 33.333333,
            used_percent: 66.666667,
            version: Some("hddwatcher 0.4.0".to_string()),
        }
    }

    #[test]
    fn builtin_bundle_covers_every_subject() {
        let registry = TemplateRegistry::builtin().unwrap();
        let languages = registry.supported_languages();
        assert!(languages.contains("en"));
        assert!(languages.contains("bg"));
        for lang in languages {
            let subject = registry.subject_for(lang).unwrap();
            assert!(!subject.trim().is_empty());
        }
    }

    #[test]
    fn builtin_templates_render_every_language() {
        let registry = TemplateRegistry::builtin().unwrap();
        for lang in registry.supported_languages() {
            let body = registry.render(lang, &input()).unwrap();
            assert!(body.contains("db-01"), "{lang} body lacks hostname");
            assert!(body.contains("/var/lib"), "{lang} body lacks path");
            assert!(body.contains("33.33"), "{lang} body lacks rounded percent");
            assert!(body.contains("66.67"), "{lang} body lacks rounded percent");
            assert!(!body.contains("{{"), "{lang} body has unrendered placeholders");
        }
    }

    #[test]
    fn rendering_is_repeatable() {
        let registry = TemplateRegistry::builtin().unwrap();
        let first = registry.render("en", &input()).unwrap();
        let second = registry.render("en", &input()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_language_is_not_found() {
        let registry = TemplateRegistry::builtin().unwrap();
        let err = registry.render("xx", &input()).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(ref l) if l == "xx"));
        assert!(registry.subject_for("xx").is_none());
    }

    #[test]
    fn round_keeps_two_decimals() {
        assert_eq!(round(50.0), "50.00");
        assert_eq!(round(12.345678), "12.35");
        assert_eq!(round(0.0), "0.00");
    }

    #[test]
    fn placeholders_and_filters() {
        let registry = TemplateRegistry::from_sources(
            [("t", "{{hostname}}:{{ free_percent|round }}:{{ used_percent }}:{{ version }}")],
            "{}",
        )
        .unwrap();
        let mut data = input();
        data.free_percent = 25.0;
        data.used_percent = 75.0;
        data.version = None;
        assert_eq!(registry.render("t", &data).unwrap(), "db-01:25.00:75:");
    }

    #[test]
    fn text_values_are_escaped() {
        let registry = TemplateRegistry::from_sources([("t", "<b>{{ hostname }}</b>")], "{}").unwrap();
        let mut data = input();
        data.hostname = "<script>&\"'".to_string();
        assert_eq!(
            registry.render("t", &data).unwrap(),
            "<b>&lt;script&gt;&amp;&#34;&#39;</b>"
        );
    }

    #[test]
    fn malformed_templates_fail_at_build() {
        let cases = [
            "<p>{{ hostname </p>",
            "{{ nope }}",
            "{{ hostname | round }}",
            "{{ free_percent | upper }}",
            "{{ free_percent | round | round }}",
        ];
        for source in cases {
            let err = TemplateRegistry::from_sources([("en", source)], "{}").unwrap_err();
            assert!(
                matches!(err, TemplateError::Malformed { ref language, .. } if language == "en"),
                "{source:?} should be rejected"
            );
        }
    }

    #[test]
    fn malformed_subjects_fail_at_build() {
        let err = TemplateRegistry::from_sources([("en", "ok")], "{\"en\": 3}").unwrap_err();
        assert!(matches!(err, TemplateError::Subjects(_)));
    }
}
