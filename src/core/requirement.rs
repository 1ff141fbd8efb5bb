//! Optional external requirements implied by enabled options.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::option::EffectiveConfiguration;

/// Identity of an external dependency: `name/version[@user/channel]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Requirement {
    pub name: String,
    pub version: String,
    /// Optional `user/channel` namespace
    pub channel: Option<String>,
}

impl Requirement {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Requirement {
            name: name.into(),
            version: version.into(),
            channel: None,
        }
    }

    /// Name and version joined as a directory-friendly string.
    pub fn dir_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)?;
        if let Some(ref channel) = self.channel {
            write!(f, "@{}", channel)?;
        }
        Ok(())
    }
}

/// Error returned when parsing a requirement reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementParseError(pub String);

impl fmt::Display for RequirementParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid requirement '{}', expected `name/version[@user/channel]`",
            self.0
        )
    }
}

impl std::error::Error for RequirementParseError {}

impl FromStr for Requirement {
    type Err = RequirementParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || RequirementParseError(s.to_string());

        let (ident, channel) = match s.split_once('@') {
            Some((ident, channel)) => {
                let (user, chan) = channel.split_once('/').ok_or_else(err)?;
                if user.is_empty() || chan.is_empty() {
                    return Err(err());
                }
                (ident, Some(channel.to_string()))
            }
            None => (s, None),
        };

        let (name, version) = ident.split_once('/').ok_or_else(err)?;
        if name.is_empty() || version.is_empty() || version.contains('/') {
            return Err(err());
        }

        Ok(Requirement {
            name: name.to_string(),
            version: version.to_string(),
            channel,
        })
    }
}

impl Serialize for Requirement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Requirement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Requirements implied by the enabled options of a configuration.
///
/// The result is an ordered set, so equal configurations always yield
/// equal sets and duplicate identities collapse.
pub fn requirements(config: &EffectiveConfiguration) -> BTreeSet<Requirement> {
    config
        .iter_decls()
        .filter(|(_, value)| value.is_enabled())
        .filter_map(|(decl, _)| decl.requires.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::option::{resolve, OptionDecl, RawOptions};
    use crate::core::settings::{Arch, CompilerFamily, Os, Settings};

    fn zlib() -> Requirement {
        "zlib/1.2.11@conan/stable".parse().unwrap()
    }

    fn decls() -> Vec<OptionDecl> {
        vec![
            OptionDecl::boolean("with_zlib", false).requires(zlib()),
            OptionDecl::boolean("with_openssl", false)
                .requires("OpenSSL/1.0.2o@conan/stable".parse().unwrap()),
            // Both compression toggles pull in the same zlib identity.
            OptionDecl::boolean("with_compression", false).requires(zlib()),
            OptionDecl::boolean("zlib_on_windows", false)
                .requires(Requirement::new("zlib", "1.2.11"))
                .unavailable_on([Os::Linux]),
        ]
    }

    fn configure(pairs: &[(&str, &str)]) -> EffectiveConfiguration {
        let raw: RawOptions = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let settings = Settings::new(Os::Linux, Arch::X86_64, CompilerFamily::Gcc, "12");
        resolve(&decls(), &raw, &settings, false).unwrap()
    }

    #[test]
    fn test_parse_reference() {
        let req = zlib();
        assert_eq!(req.name, "zlib");
        assert_eq!(req.version, "1.2.11");
        assert_eq!(req.channel.as_deref(), Some("conan/stable"));
        assert_eq!(req.to_string(), "zlib/1.2.11@conan/stable");

        let plain: Requirement = "OpenSSL/1.0.2o".parse().unwrap();
        assert!(plain.channel.is_none());
        assert_eq!(plain.dir_name(), "OpenSSL-1.0.2o");

        assert!("zlib".parse::<Requirement>().is_err());
        assert!("zlib/1.2/extra".parse::<Requirement>().is_err());
        assert!("zlib/1.2@conan".parse::<Requirement>().is_err());
    }

    #[test]
    fn test_disabled_options_emit_nothing() {
        assert!(requirements(&configure(&[])).is_empty());
    }

    #[test]
    fn test_enabled_option_adds_exactly_one() {
        let reqs = requirements(&configure(&[("with_zlib", "true")]));
        assert_eq!(reqs.len(), 1);
        assert!(reqs.contains(&zlib()));
    }

    #[test]
    fn test_independent_requirements() {
        let reqs = requirements(&configure(&[("with_zlib", "true"), ("with_openssl", "true")]));
        let names: Vec<&str> = reqs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["OpenSSL", "zlib"]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let reqs = requirements(&configure(&[("with_zlib", "true"), ("with_compression", "true")]));
        assert_eq!(reqs.len(), 1);
    }

    #[test]
    fn test_deterministic() {
        let config = configure(&[("with_zlib", "true"), ("with_openssl", "true")]);
        assert_eq!(requirements(&config), requirements(&config.clone()));
    }

    #[test]
    fn test_inapplicable_option_never_requires() {
        let reqs = requirements(&configure(&[("zlib_on_windows", "true")]));
        assert!(reqs.is_empty());
    }
}
