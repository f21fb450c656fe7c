//! Query templates.
//!
//! Daily report queries are written against `{YESTERDAY}`-style placeholders
//! and rendered just before they run. Placeholders are upper-case names in
//! braces; every placeholder must have a value.
//!
//! | Placeholder              | Format     | Example    |
//! |--------------------------|------------|------------|
//! | `{YESTERDAY}`            | `%Y%m%d`   | `20260124` |
//! | `{YESTERDAY_NM}`         | `%y-%m-%d` | `26-01-24` |
//! | `{YESTERDAY_YEAR_MONTH}` | `%Y%m`     | `202601`   |

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Days, Local, NaiveDate};
use regex::Regex;
use thiserror::Error;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Z][A-Z0-9_]*)\}").unwrap());
static VARIABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").unwrap());

/// Error type for template rendering.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder {{{0}}}")]
    UnknownPlaceholder(String),

    #[error("invalid variable '{0}', expected NAME=VALUE")]
    InvalidVariable(String),

    #[error("invalid variable name '{0}', expected upper-case letters, digits and '_'")]
    InvalidVariableName(String),

    #[error("no date before {0}")]
    DateOutOfRange(NaiveDate),
}

/// Placeholder values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    vars: BTreeMap<String, String>,
}

impl TemplateContext {
    /// Context with no values.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Date placeholders relative to `today`.
    pub fn for_date(today: NaiveDate) -> Result<Self, TemplateError> {
        let yesterday = today
            .checked_sub_days(Days::new(1))
            .ok_or(TemplateError::DateOutOfRange(today))?;

        let mut ctx = Self::empty();
        ctx.vars.insert(
            "YESTERDAY".to_string(),
            yesterday.format("%Y%m%d").to_string(),
        );
        ctx.vars.insert(
            "YESTERDAY_NM".to_string(),
            yesterday.format("%y-%m-%d").to_string(),
        );
        ctx.vars.insert(
            "YESTERDAY_YEAR_MONTH".to_string(),
            yesterday.format("%Y%m").to_string(),
        );
        Ok(ctx)
    }

    /// Date placeholders relative to the local date.
    pub fn today() -> Result<Self, TemplateError> {
        Self::for_date(Local::now().date_naive())
    }

    /// Set a value, replacing any previous one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<(), TemplateError> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(TemplateError::InvalidVariableName(name));
        }
        self.vars.insert(name, value.into());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

fn is_valid_name(name: &str) -> bool {
    VARIABLE_NAME.is_match(name)
}

/// Parse a `NAME=VALUE` command-line variable.
pub fn parse_var(s: &str) -> Result<(String, String), TemplateError> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| TemplateError::InvalidVariable(s.to_string()))?;
    let name = name.trim();
    if !is_valid_name(name) {
        return Err(TemplateError::InvalidVariableName(name.to_string()));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Substitute placeholders and drop trailing semicolons.
pub fn render(source: &str, ctx: &TemplateContext) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(source.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(source) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let name = &caps[1];
        let value = ctx
            .get(name)
            .ok_or_else(|| TemplateError::UnknownPlaceholder(name.to_string()))?;
        out.push_str(&source[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(&source[last..]);

    let trimmed = out.trim_end().trim_end_matches(';').trim_end().len();
    out.truncate(trimmed);
    Ok(out)
}
