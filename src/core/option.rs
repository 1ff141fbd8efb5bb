//! Build options: declarations, domains and platform-aware resolution.
//!
//! A recipe declares its options up front. `resolve` turns caller-supplied
//! raw strings into an [`EffectiveConfiguration`], dropping every option the
//! target settings render inapplicable.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::PackageError;
use crate::core::requirement::Requirement;
use crate::core::settings::{Os, Settings};

/// Raw, unvalidated option values as supplied by the caller.
pub type RawOptions = BTreeMap<String, String>;

/// The set of values an option may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionDomain {
    /// `true` / `false`
    Bool,
    /// One of a fixed set of strings
    Choice(Vec<String>),
}

impl OptionDomain {
    /// Parse a raw string into a value of this domain.
    pub fn parse(&self, raw: &str) -> Option<OptionValue> {
        match self {
            OptionDomain::Bool => parse_bool(raw).map(OptionValue::Bool),
            OptionDomain::Choice(values) => values
                .iter()
                .find(|v| v.as_str() == raw)
                .map(|v| OptionValue::Choice(v.clone())),
        }
    }

    /// Whether a typed value belongs to this domain.
    pub fn contains(&self, value: &OptionValue) -> bool {
        match (self, value) {
            (OptionDomain::Bool, OptionValue::Bool(_)) => true,
            (OptionDomain::Choice(values), OptionValue::Choice(v)) => values.contains(v),
            _ => false,
        }
    }

    /// Allowed values, for error messages.
    pub fn allowed(&self) -> Vec<String> {
        match self {
            OptionDomain::Bool => vec!["true".to_string(), "false".to_string()],
            OptionDomain::Choice(values) => values.clone(),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// A resolved option value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Choice(String),
}

impl OptionValue {
    /// Whether the value turns the option on.
    pub fn is_enabled(&self) -> bool {
        matches!(self, OptionValue::Bool(true))
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Choice(s) => f.write_str(s),
        }
    }
}

/// Toolchain flags emitted for an option, depending on its value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlagPair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<String>,
}

impl FlagPair {
    pub fn new(enabled: impl Into<String>, disabled: impl Into<String>) -> Self {
        FlagPair {
            enabled: Some(enabled.into()),
            disabled: Some(disabled.into()),
        }
    }

    /// The flag matching a value, if any.
    pub fn for_value(&self, value: &OptionValue) -> Option<&str> {
        if value.is_enabled() {
            self.enabled.as_deref()
        } else {
            self.disabled.as_deref()
        }
    }
}

/// A declared configuration knob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDecl {
    pub name: String,
    pub domain: OptionDomain,
    pub default: OptionValue,
    /// Operating systems on which the option has no meaning
    pub unavailable_on: Vec<Os>,
    /// Dependency pulled in when the option is enabled
    pub requires: Option<Requirement>,
    /// Flags handed to the configure step
    pub configure_flags: Option<FlagPair>,
}

impl OptionDecl {
    /// Declare a boolean option.
    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        OptionDecl {
            name: name.into(),
            domain: OptionDomain::Bool,
            default: OptionValue::Bool(default),
            unavailable_on: Vec::new(),
            requires: None,
            configure_flags: None,
        }
    }

    /// Declare an option taking one of `values`.
    pub fn choice(
        name: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
        default: impl Into<String>,
    ) -> Self {
        OptionDecl {
            name: name.into(),
            domain: OptionDomain::Choice(values.into_iter().map(Into::into).collect()),
            default: OptionValue::Choice(default.into()),
            unavailable_on: Vec::new(),
            requires: None,
            configure_flags: None,
        }
    }

    pub fn unavailable_on(mut self, os: impl IntoIterator<Item = Os>) -> Self {
        self.unavailable_on.extend(os);
        self
    }

    pub fn requires(mut self, requirement: Requirement) -> Self {
        self.requires = Some(requirement);
        self
    }

    pub fn configure_flags(mut self, flags: FlagPair) -> Self {
        self.configure_flags = Some(flags);
        self
    }

    /// Applicability predicate: is the option meaningful for these settings?
    pub fn applies_to(&self, settings: &Settings) -> bool {
        !self.unavailable_on.contains(&settings.os)
    }
}

/// Resolved settings and option values for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveConfiguration {
    pub settings: Settings,
    pub options: BTreeMap<String, OptionValue>,
    /// Declarations of the options that survived resolution
    #[serde(skip)]
    decls: Vec<OptionDecl>,
}

impl EffectiveConfiguration {
    /// Value of an option, `None` if it was removed for this platform.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    /// Whether an option is present and enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).is_some_and(OptionValue::is_enabled)
    }

    /// Whether an option survived resolution.
    pub fn contains(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    /// Declarations paired with their effective values.
    pub fn iter_decls(&self) -> impl Iterator<Item = (&OptionDecl, &OptionValue)> {
        self.decls
            .iter()
            .filter_map(|d| self.options.get(&d.name).map(|v| (d, v)))
    }
}

/// Resolve raw option values against declarations and settings.
///
/// Inapplicable options are removed entirely, even when the caller supplied
/// a value for them. `strip_libcxx` clears the C++ runtime from the settings
/// carried by the result.
pub fn resolve(
    decls: &[OptionDecl],
    raw: &RawOptions,
    settings: &Settings,
    strip_libcxx: bool,
) -> Result<EffectiveConfiguration, PackageError> {
    for name in raw.keys() {
        if !decls.iter().any(|d| &d.name == name) {
            return Err(PackageError::UnknownOption {
                option: name.clone(),
                known: decls.iter().map(|d| d.name.clone()).collect(),
            });
        }
    }

    let mut options = BTreeMap::new();
    let mut kept = Vec::new();

    for decl in decls {
        if !decl.applies_to(settings) {
            tracing::debug!("option `{}` does not apply to {}", decl.name, settings.os);
            continue;
        }

        let value = match raw.get(&decl.name) {
            Some(raw_value) => {
                decl.domain
                    .parse(raw_value)
                    .ok_or_else(|| PackageError::InvalidOptionValue {
                        option: decl.name.clone(),
                        value: raw_value.clone(),
                        allowed: decl.domain.allowed(),
                    })?
            }
            None => decl.default.clone(),
        };

        options.insert(decl.name.clone(), value);
        kept.push(decl.clone());
    }

    let settings = if strip_libcxx {
        settings.without_libcxx()
    } else {
        settings.clone()
    };

    Ok(EffectiveConfiguration {
        settings,
        options,
        decls: kept,
    })
}

/// Parse `name=value` pairs as given on the command line.
pub fn parse_assignments<I, S>(pairs: I) -> Result<RawOptions, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut raw = RawOptions::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected `name=value`, got `{}`", pair))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("missing option name in `{}`", pair));
        }
        raw.insert(name.to_string(), value.trim().to_string());
    }
    Ok(raw)
}
