//! Message personalization with `{placeholder}` substitution.
//!
//! | Placeholder | Value |
//! |-------------|-------|
//! | `{nome}` | contact name |
//! | `{numero}` | normalized contact number |
//!
//! Unknown tokens and stray braces are copied verbatim, so a typo in a
//! template shows up in the message instead of failing the batch.

use std::collections::HashMap;
use std::sync::LazyLock;

use wasender_core::types::Contact;

type Resolver = Box<dyn Fn(&Contact) -> String + Send + Sync>;

pub struct TemplateEngine {
    placeholders: HashMap<String, Resolver>,
}

static DEFAULT_ENGINE: LazyLock<TemplateEngine> = LazyLock::new(TemplateEngine::with_defaults);

/// Render with the default placeholders.
pub fn render(template: &str, contact: &Contact) -> String {
    DEFAULT_ENGINE.render(template, contact)
}

impl TemplateEngine {
    /// Engine without any placeholders.
    pub fn new() -> Self {
        Self { placeholders: HashMap::new() }
    }

    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.register("nome", |c| c.name.clone());
        engine.register("numero", |c| c.number.clone());
        engine
    }

    /// Add or replace a placeholder.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        resolve: impl Fn(&Contact) -> String + Send + Sync + 'static,
    ) {
        self.placeholders.insert(name.into(), Box::new(resolve));
    }

    pub fn placeholder_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.placeholders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Single left-to-right pass; substituted values are never re-expanded.
    pub fn render(&self, template: &str, contact: &Contact) -> String {
        let mut out = String::with_capacity(template.len() + 16);
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            if let Some(close) = after.find(['{', '}']) {
                if after[close..].starts_with('}') {
                    if let Some(resolve) = self.placeholders.get(&after[..close]) {
                        out.push_str(&resolve(contact));
                        rest = &after[close + 1..];
                        continue;
                    }
                }
            }

            out.push('{');
            rest = after;
        }

        out.push_str(rest);
        out
    }
}

impl Default for TemplateEngine {
    fn default() -> Self { Self::with_defaults() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ana() -> Contact {
        Contact::new("(11) 98888-7777", Some("Ana"))
    }

    #[test]
    fn test_render_name() {
        assert_eq!(render("Olá {nome}!", &ana()), "Olá Ana!");
    }

    #[test]
    fn test_unknown_token_verbatim() {
        assert_eq!(render("Hi {email}", &ana()), "Hi {email}");
    }

    #[test]
    fn test_every_occurrence_replaced() {
        assert_eq!(
            render("{nome}, {nome}! Seu número: {numero}", &ana()),
            "Ana, Ana! Seu número: 11988887777"
        );
    }

    #[test]
    fn test_malformed_braces() {
        let c = ana();
        assert_eq!(render("{nome", &c), "{nome");
        assert_eq!(render("nome}", &c), "nome}");
        assert_eq!(render("{{nome}}", &c), "{Ana}");
        assert_eq!(render("{}", &c), "{}");
        assert_eq!(render("{ nome }", &c), "{ nome }");
    }

    #[test]
    fn test_no_reexpansion() {
        let c = Contact::new("11988887777", Some("{numero}"));
        assert_eq!(render("Oi {nome}", &c), "Oi {numero}");
    }

    #[test]
    fn test_default_name_used() {
        let c = Contact::new("11988887777", None);
        assert_eq!(render("Olá {nome}", &c), "Olá Cliente");
    }

    #[test]
    fn test_custom_placeholder() {
        let mut engine = TemplateEngine::with_defaults();
        engine.register("primeiro_nome", |c| {
            c.name.split_whitespace().next().unwrap_or_default().to_string()
        });
        let c = Contact::new("11988887777", Some("Ana Souza"));
        assert_eq!(engine.render("Oi {primeiro_nome}", &c), "Oi Ana");
        assert_eq!(engine.placeholder_names(), vec!["nome", "numero", "primeiro_nome"]);
    }

    #[test]
    fn test_multibyte_text() {
        assert_eq!(render("Olá, {nome} 🎉 ção", &ana()), "Olá, Ana 🎉 ção");
    }
}
