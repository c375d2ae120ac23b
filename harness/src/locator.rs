//! Element selectors and ranked fallback chains.
//!
//! WebDriver only understands css, xpath, id and link text. The accessible
//! strategies (label, role, placeholder, visible text) are translated to
//! xpath here so every page implementation can stay dumb.

use derive_more::Display;
use tracing::debug;

use crate::error::{HarnessError, HarnessResult};
use crate::page::Page;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub enum Selector {
    #[display("css `{_0}`")]
    Css(String),
    #[display("xpath `{_0}`")]
    XPath(String),
    #[display("id `{_0}`")]
    Id(String),
    #[display("link `{_0}`")]
    LinkText(String),
    /// Form control whose label (or aria-label) is the given text.
    #[display("label '{_0}'")]
    Label(String),
    /// Element with an ARIA role, explicit or implied by its tag, whose
    /// accessible name contains `name`.
    #[display("role {role} '{}'", name.as_deref().unwrap_or("*"))]
    Role { role: String, name: Option<String> },
    #[display("placeholder '{_0}'")]
    Placeholder(String),
    /// Innermost element whose own text contains the string.
    #[display("text '{_0}'")]
    Text(String),
    #[display("{inner} within {scope}")]
    Within {
        scope: Box<Selector>,
        inner: Box<Selector>,
    },
}

/// The form a selector takes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Css(String),
    XPath(String),
    Id(String),
    LinkText(String),
}

impl Query {
    pub fn as_locator(&self) -> fantoccini::Locator<'_> {
        match self {
            Query::Css(css) => fantoccini::Locator::Css(css),
            Query::XPath(xpath) => fantoccini::Locator::XPath(xpath),
            Query::Id(id) => fantoccini::Locator::Id(id),
            Query::LinkText(text) => fantoccini::Locator::LinkText(text),
        }
    }
}

impl Selector {
    pub fn css(css: impl Into<String>) -> Self {
        Selector::Css(css.into())
    }

    pub fn xpath(xpath: impl Into<String>) -> Self {
        Selector::XPath(xpath.into())
    }

    pub fn label(text: impl Into<String>) -> Self {
        Selector::Label(text.into())
    }

    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Selector::Role {
            role: role.into(),
            name: Some(name.into()),
        }
    }

    pub fn any_role(role: impl Into<String>) -> Self {
        Selector::Role {
            role: role.into(),
            name: None,
        }
    }

    pub fn button(name: impl Into<String>) -> Self {
        Selector::role("button", name)
    }

    pub fn placeholder(text: impl Into<String>) -> Self {
        Selector::Placeholder(text.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Selector::Text(text.into())
    }

    /// Restrict this selector to descendants of `scope`.
    pub fn within(self, scope: Selector) -> Self {
        Selector::Within {
            scope: Box::new(scope),
            inner: Box::new(self),
        }
    }

    pub fn to_query(&self) -> HarnessResult<Query> {
        match self {
            Selector::Css(css) => Ok(Query::Css(css.clone())),
            Selector::Id(id) => Ok(Query::Id(id.clone())),
            Selector::LinkText(text) => Ok(Query::LinkText(text.clone())),
            Selector::Within { scope, inner } => {
                if let (Selector::Css(outer), Selector::Css(inner)) =
                    (scope.as_ref(), inner.as_ref())
                {
                    return Ok(Query::Css(format!("{outer} {inner}")));
                }
                Ok(Query::XPath(self.xpath_parts()?.join(" | ")))
            }
            _ => Ok(Query::XPath(self.xpath_parts()?.join(" | "))),
        }
    }

    /// Query evaluated from inside another element, e.g. a cell within one
    /// table row. Xpath alternatives are anchored at the context node.
    pub fn to_relative_query(&self) -> HarnessResult<Query> {
        match self.to_query()? {
            Query::XPath(_) => {
                let parts = self
                    .xpath_parts()?
                    .into_iter()
                    .map(|part| relative_xpath(&part))
                    .collect::<HarnessResult<Vec<_>>>()?;
                Ok(Query::XPath(parts.join(" | ")))
            }
            other => Ok(other),
        }
    }

    /// Absolute xpath alternatives, each starting with `//` or `(`.
    fn xpath_parts(&self) -> HarnessResult<Vec<String>> {
        let parts = match self {
            Selector::XPath(xpath) => vec![xpath.clone()],
            Selector::Id(id) => vec![format!("//*[@id={}]", literal(id))],
            Selector::LinkText(text) => {
                vec![format!("//a[normalize-space(.)={}]", literal(text))]
            }
            Selector::Label(text) => {
                let text = literal(text);
                let control =
                    "self::input or self::textarea or self::select or @role='combobox' or @role='spinbutton'";
                vec![
                    format!("//*[({control}) and @aria-label={text}]"),
                    format!(
                        "//*[({control}) and @id=//label[normalize-space(.)={text}]/@for]"
                    ),
                    format!("//label[normalize-space(.)={text}]//*[{control}]"),
                ]
            }
            Selector::Role { role, name } => {
                let kinds = role_predicate(role);
                match name {
                    Some(name) => {
                        let name = literal(name);
                        vec![format!(
                            "//*[({kinds}) and (contains(normalize-space(.), {name}) or contains(@aria-label, {name}) or contains(@value, {name}))]"
                        )]
                    }
                    None => vec![format!("//*[{kinds}]")],
                }
            }
            Selector::Placeholder(text) => {
                vec![format!("//*[@placeholder={}]", literal(text))]
            }
            Selector::Text(text) => vec![format!(
                "//*[text()[contains(normalize-space(.), {})]]",
                literal(text)
            )],
            Selector::Within { scope, inner } => {
                let scopes = scope.xpath_parts()?;
                let inners = inner.xpath_parts()?;
                let mut parts = Vec::with_capacity(scopes.len() * inners.len());
                for outer in &scopes {
                    for inner in &inners {
                        let relative = inner.strip_prefix("//").ok_or_else(|| {
                            HarnessError::Configuration(format!(
                                "cannot nest {inner} inside {outer}"
                            ))
                        })?;
                        parts.push(format!("({outer})//{relative}"));
                    }
                }
                parts
            }
            Selector::Css(css) => {
                return Err(HarnessError::Configuration(format!(
                    "css `{css}` cannot be combined with xpath strategies"
                )));
            }
        };
        Ok(parts)
    }
}

fn relative_xpath(part: &str) -> HarnessResult<String> {
    if part.starts_with("//") {
        Ok(format!(".{part}"))
    } else if let Some(rest) = part.strip_prefix("(//") {
        Ok(format!("(.//{rest}"))
    } else {
        Err(HarnessError::Configuration(format!(
            "xpath `{part}` cannot be anchored at an element"
        )))
    }
}

/// Elements carrying `role`, explicitly or through their tag.
fn role_predicate(role: &str) -> String {
    let implicit = match role {
        "button" => {
            "self::button or (self::input and (@type='submit' or @type='button'))"
        }
        "link" => "self::a[@href]",
        "textbox" => {
            "self::textarea or (self::input and (not(@type) or @type='text' or @type='email' or @type='search' or @type='password'))"
        }
        "spinbutton" => "self::input[@type='number']",
        "combobox" => "self::select",
        "checkbox" => "self::input[@type='checkbox']",
        "dialog" => "self::dialog",
        "table" => "self::table",
        "row" => "self::tr",
        "cell" => "self::td",
        "columnheader" => "self::th",
        "heading" => {
            "self::h1 or self::h2 or self::h3 or self::h4 or self::h5 or self::h6"
        }
        "option" => "self::option",
        _ => "",
    };
    let explicit = format!("@role={}", literal(role));
    if implicit.is_empty() {
        explicit
    } else {
        format!("{explicit} or {implicit}")
    }
}

/// Quote a string as an xpath 1.0 literal.
pub fn literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{value}'")
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else {
        let pieces: Vec<String> =
            value.split('\'').map(|piece| format!("'{piece}'")).collect();
        format!("concat({})", pieces.join(", \"'\", "))
    }
}

/// Ranked alternatives for one logical element. The first strategy with a
/// visible match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorChain {
    pub name: String,
    pub strategies: Vec<Selector>,
}

impl std::fmt::Display for LocatorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [", self.name)?;
        for (i, strategy) in self.strategies.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{strategy}")?;
        }
        write!(f, "]")
    }
}

impl From<Selector> for LocatorChain {
    fn from(selector: Selector) -> Self {
        LocatorChain {
            name: selector.to_string(),
            strategies: vec![selector],
        }
    }
}

impl LocatorChain {
    pub fn new(name: impl Into<String>) -> Self {
        LocatorChain {
            name: name.into(),
            strategies: Vec::new(),
        }
    }

    pub fn or(mut self, selector: Selector) -> Self {
        self.strategies.push(selector);
        self
    }

    /// Return the first strategy that currently matches something visible.
    pub async fn resolve(&self, page: &dyn Page) -> HarnessResult<Selector> {
        for (rank, strategy) in self.strategies.iter().enumerate() {
            if page.count(strategy).await? > 0 {
                debug!("{} matched strategy #{rank}: {strategy}", self.name);
                return Ok(strategy.clone());
            }
        }
        Err(HarnessError::ElementNotFound {
            chain: self.clone(),
        })
    }
}
