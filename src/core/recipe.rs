//! Recipe parsing.
//!
//! A recipe is the declarative description of one native component: where
//! its source comes from, which options it accepts, how each build strategy
//! drives the upstream tooling and which files end up in the package.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::builder::collect::{ArtifactRule, LibraryTable, Role, SearchRoot};
use crate::core::errors::PackageError;
use crate::core::option::{FlagPair, OptionDecl, OptionDomain, OptionValue};
use crate::core::requirement::Requirement;
use crate::core::settings::Os;

/// Recipes shipped with dockyard.
const BUILTIN_RECIPES: &[(&str, &str)] = &[("libpq", include_str!("../recipes/libpq.toml"))];

/// A validated recipe.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub license: Option<String>,
    pub source: SourceSpec,
    pub options: Vec<OptionDecl>,
    /// Remove the C++ runtime from the settings (pure C component)
    pub drop_libcxx: bool,
    pub script: Option<ScriptSpec>,
    pub staged: Option<StagedSpec>,
    /// Extra system libraries consumers link, per OS
    pub system_libs: BTreeMap<Os, Vec<String>>,
}

/// Where the upstream source lives and how it is laid out once unpacked.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub url: Option<String>,
    pub sha256: Option<String>,
    /// Top-level directory inside the archive
    pub extracted_dir: Option<String>,
    /// Directory name the source is placed under in the work dir
    pub subfolder: String,
    /// License file collected from the source root
    pub license_file: Option<String>,
}

/// A textual patch applied to a file of the script directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourcePatch {
    pub file: String,
    pub find: String,
    pub replace: String,
}

/// Script-driven build description.
#[derive(Debug, Clone)]
pub struct ScriptSpec {
    /// Directory (relative to the source) the scripts run in
    pub dir: String,
    pub build: Vec<String>,
    pub install: Vec<String>,
    pub tools: Vec<String>,
    pub patches: Vec<SourcePatch>,
    pub artifacts: Vec<ArtifactRule>,
    /// Link name used instead of the discovered library names
    pub link_override: Option<String>,
}

/// Staged configure/compile/install description.
#[derive(Debug, Clone)]
pub struct StagedSpec {
    /// Shared subtree, built and installed first
    pub common_dir: String,
    /// The component's own subtree
    pub component_dir: String,
    pub configure_args: Vec<String>,
    pub tools: Vec<String>,
    pub artifacts: Vec<ArtifactRule>,
    pub libraries: LibraryTable,
}

impl Recipe {
    /// Load one of the recipes shipped with dockyard.
    pub fn builtin(name: &str) -> Result<Self, PackageError> {
        let (_, text) = BUILTIN_RECIPES
            .iter()
            .find(|(n, _)| *n == name)
            .ok_or_else(|| {
                PackageError::InvalidRecipe(format!(
                    "no built-in recipe named `{}` (available: {})",
                    name,
                    builtin_names().join(", ")
                ))
            })?;
        Self::from_toml_str(text)
    }

    /// Load a recipe from a TOML file.
    pub fn load(path: &Path) -> Result<Self, PackageError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PackageError::io(format!("failed to read recipe {}", path.display()), e))?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate a recipe.
    pub fn from_toml_str(text: &str) -> Result<Self, PackageError> {
        let file: RecipeFile =
            toml::from_str(text).map_err(|e| PackageError::InvalidRecipe(e.to_string()))?;
        file.into_recipe()
    }

    /// Declaration of an option by name.
    pub fn option(&self, name: &str) -> Option<&OptionDecl> {
        self.options.iter().find(|o| o.name == name)
    }

    /// Expand `{name}` and `{version}` placeholders.
    pub fn expand(&self, template: &str) -> String {
        template
            .replace("{name}", &self.name)
            .replace("{version}", &self.version)
    }

    /// License collection rule, if the recipe names a license file.
    pub fn license_rule(&self) -> Option<ArtifactRule> {
        self.source
            .license_file
            .as_ref()
            .map(|file| ArtifactRule::new(file, SearchRoot::Source, "", Role::Licenses))
    }
}

/// Names of the built-in recipes.
pub fn builtin_names() -> Vec<&'static str> {
    BUILTIN_RECIPES.iter().map(|(n, _)| *n).collect()
}

// Raw TOML schema. Validated into `Recipe`.

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecipeFile {
    package: PackageSection,
    #[serde(default)]
    source: SourceSection,
    #[serde(default)]
    settings: SettingsSection,
    #[serde(default)]
    options: BTreeMap<String, OptionSection>,
    script: Option<ScriptSection>,
    staged: Option<StagedSection>,
    #[serde(default)]
    package_info: PackageInfoSection,
}

#[derive(Debug, Deserialize)]
struct PackageSection {
    name: String,
    version: String,
    description: Option<String>,
    homepage: Option<String>,
    license: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SourceSection {
    url: Option<String>,
    sha256: Option<String>,
    extracted_dir: Option<String>,
    subfolder: Option<String>,
    license_file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    #[serde(default)]
    drop_libcxx: bool,
}

#[derive(Debug, Deserialize)]
struct OptionSection {
    default: OptionValue,
    #[serde(default)]
    values: Option<Vec<String>>,
    #[serde(default)]
    unavailable_on: Vec<Os>,
    requires: Option<Requirement>,
    configure_flags: Option<FlagPair>,
}

#[derive(Debug, Deserialize)]
struct ScriptSection {
    dir: String,
    build: Vec<String>,
    install: Vec<String>,
    #[serde(default)]
    tools: Vec<String>,
    #[serde(default)]
    patches: Vec<SourcePatch>,
    #[serde(default)]
    artifacts: Vec<ArtifactRule>,
    link_override: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StagedSection {
    common_dir: String,
    component_dir: String,
    #[serde(default)]
    configure_args: Vec<String>,
    #[serde(default)]
    tools: Vec<String>,
    #[serde(default)]
    artifacts: Vec<ArtifactRule>,
    #[serde(default)]
    libraries: LibrariesSection,
}

#[derive(Debug, Deserialize)]
struct LibrariesSection {
    #[serde(default = "default_lib_dir")]
    dir: String,
    #[serde(default, rename = "static")]
    static_patterns: Vec<String>,
    #[serde(default)]
    shared: BTreeMap<String, Vec<String>>,
    shared_option: Option<String>,
}

fn default_lib_dir() -> String {
    "lib".to_string()
}

impl Default for LibrariesSection {
    fn default() -> Self {
        LibrariesSection {
            dir: default_lib_dir(),
            static_patterns: Vec::new(),
            shared: BTreeMap::new(),
            shared_option: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PackageInfoSection {
    #[serde(default)]
    system_libs: BTreeMap<String, Vec<String>>,
}

fn invalid(msg: impl Into<String>) -> PackageError {
    PackageError::InvalidRecipe(msg.into())
}

fn parse_os_keys<T>(map: BTreeMap<String, T>, what: &str) -> Result<BTreeMap<Os, T>, PackageError> {
    map.into_iter()
        .map(|(k, v)| {
            k.parse::<Os>()
                .map(|os| (os, v))
                .map_err(|e| invalid(format!("{}: {}", what, e)))
        })
        .collect()
}

fn check_pattern(pattern: &str) -> Result<(), PackageError> {
    glob::Pattern::new(pattern)
        .map(|_| ())
        .map_err(|e| invalid(format!("bad pattern `{}`: {}", pattern, e)))
}

impl RecipeFile {
    fn into_recipe(self) -> Result<Recipe, PackageError> {
        let options = self
            .options
            .into_iter()
            .map(|(name, section)| section.into_decl(name))
            .collect::<Result<Vec<_>, _>>()?;

        if self.script.is_none() && self.staged.is_none() {
            return Err(invalid("a recipe needs a [script] or [staged] section"));
        }

        let script = self.script.map(|s| ScriptSpec {
            dir: s.dir,
            build: s.build,
            install: s.install,
            tools: s.tools,
            patches: s.patches,
            artifacts: s.artifacts,
            link_override: s.link_override,
        });

        let staged = match self.staged {
            Some(s) => Some(StagedSpec {
                common_dir: s.common_dir,
                component_dir: s.component_dir,
                configure_args: s.configure_args,
                tools: s.tools,
                artifacts: s.artifacts,
                libraries: LibraryTable {
                    dir: s.libraries.dir,
                    static_patterns: s.libraries.static_patterns,
                    shared_patterns: parse_os_keys(s.libraries.shared, "staged.libraries.shared")?,
                    shared_option: s.libraries.shared_option,
                },
            }),
            None => None,
        };

        let recipe = Recipe {
            name: self.package.name,
            version: self.package.version,
            description: self.package.description,
            homepage: self.package.homepage,
            license: self.package.license,
            source: SourceSpec {
                url: self.source.url,
                sha256: self.source.sha256,
                extracted_dir: self.source.extracted_dir,
                subfolder: self
                    .source
                    .subfolder
                    .unwrap_or_else(|| "source_subfolder".to_string()),
                license_file: self.source.license_file,
            },
            options,
            drop_libcxx: self.settings.drop_libcxx,
            script,
            staged,
            system_libs: parse_os_keys(self.package_info.system_libs, "package_info.system_libs")?,
        };

        recipe.validate()?;
        Ok(recipe)
    }
}

impl OptionSection {
    fn into_decl(self, name: String) -> Result<OptionDecl, PackageError> {
        let domain = match self.values {
            Some(values) if values.is_empty() => {
                return Err(invalid(format!("option `{}` has an empty value list", name)))
            }
            Some(values) => OptionDomain::Choice(values),
            None => OptionDomain::Bool,
        };

        if !domain.contains(&self.default) {
            return Err(invalid(format!(
                "default `{}` of option `{}` is outside its domain ({})",
                self.default,
                name,
                domain.allowed().join(", ")
            )));
        }

        Ok(OptionDecl {
            name,
            domain,
            default: self.default,
            unavailable_on: self.unavailable_on,
            requires: self.requires,
            configure_flags: self.configure_flags,
        })
    }
}

impl Recipe {
    fn validate(&self) -> Result<(), PackageError> {
        if self.name.is_empty() || self.version.is_empty() {
            return Err(invalid("package name and version must not be empty"));
        }

        let mut rules: Vec<&ArtifactRule> = Vec::new();
        if let Some(ref script) = self.script {
            if script.build.is_empty() || script.install.is_empty() {
                return Err(invalid("script.build and script.install must name a command"));
            }
            rules.extend(script.artifacts.iter());
        }
        if let Some(ref staged) = self.staged {
            rules.extend(staged.artifacts.iter());
            for pattern in staged
                .libraries
                .static_patterns
                .iter()
                .chain(staged.libraries.shared_patterns.values().flatten())
            {
                check_pattern(pattern)?;
            }
            if let Some(ref name) = staged.libraries.shared_option {
                if self.option(name).is_none() {
                    return Err(invalid(format!(
                        "staged.libraries.shared_option names unknown option `{}`",
                        name
                    )));
                }
            }
        }

        for rule in rules {
            check_pattern(&rule.pattern)?;
            if let Some(ref name) = rule.condition.option {
                if self.option(name).is_none() {
                    return Err(invalid(format!(
                        "artifact rule `{}` refers to unknown option `{}`",
                        rule.pattern, name
                    )));
                }
            }
        }

        Ok(())
    }
}
