//! Text values that live in state and compare structurally.

use std::fmt;
use std::ops::Add;

/// A piece of user-facing text, stored as data so it can be compared and
/// rendered later.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextState {
    Verbatim(String),
    /// A key into a localization table plus positional arguments.
    Localized { key: String, args: Vec<String> },
    Concatenation(Box<TextState>, Box<TextState>),
}

impl TextState {
    pub fn verbatim(text: impl Into<String>) -> Self {
        Self::Verbatim(text.into())
    }

    pub fn localized(key: impl Into<String>) -> Self {
        Self::Localized {
            key: key.into(),
            args: Vec::new(),
        }
    }

    /// Append a positional argument to a localized text. No-op otherwise.
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        if let Self::Localized { args, .. } = &mut self {
            args.push(value.into());
        }
        self
    }

    /// Render the text.
    ///
    /// `lookup` maps a localization key to a template in which `{0}`,
    /// `{1}`, ... are replaced by the arguments. Keys it does not know are
    /// rendered as the key itself.
    pub fn resolve(&self, lookup: &dyn Fn(&str) -> Option<String>) -> String {
        let mut out = String::new();
        self.write_resolved(&mut out, lookup);
        out
    }

    fn write_resolved(&self, out: &mut String, lookup: &dyn Fn(&str) -> Option<String>) {
        match self {
            Self::Verbatim(text) => out.push_str(text),
            Self::Localized { key, args } => {
                let mut rendered = lookup(key).unwrap_or_else(|| key.clone());
                for (index, arg) in args.iter().enumerate() {
                    rendered = rendered.replace(&format!("{{{index}}}"), arg);
                }
                out.push_str(&rendered);
            }
            Self::Concatenation(left, right) => {
                left.write_resolved(out, lookup);
                right.write_resolved(out, lookup);
            }
        }
    }
}

impl Add for TextState {
    type Output = TextState;

    fn add(self, rhs: TextState) -> TextState {
        TextState::Concatenation(Box::new(self), Box::new(rhs))
    }
}

impl From<&str> for TextState {
    fn from(text: &str) -> Self {
        Self::verbatim(text)
    }
}

impl From<String> for TextState {
    fn from(text: String) -> Self {
        Self::Verbatim(text)
    }
}

/// Renders without a localization table.
impl fmt::Display for TextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resolve(&|_| None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenation_renders_in_order() {
        let text = TextState::verbatim("Hello, ") + TextState::localized("name") + "!".into();
        assert_eq!(text.to_string(), "Hello, name!");
    }

    #[test]
    fn localized_arguments_fill_template() {
        let text = TextState::localized("greeting").arg("Ada").arg("3");
        let rendered = text.resolve(&|key| {
            (key == "greeting").then(|| "Hi {0}, you have {1} messages".to_string())
        });
        assert_eq!(rendered, "Hi Ada, you have 3 messages");
    }

    #[test]
    fn equality_is_structural() {
        let a = TextState::verbatim("a") + TextState::verbatim("b");
        let b = TextState::verbatim("a") + TextState::verbatim("b");
        assert_eq!(a, b);
        assert_ne!(a, TextState::verbatim("ab"));
    }
}
