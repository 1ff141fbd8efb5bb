//! Pattern-based artifact collection into the canonical package tree.
//!
//! Collection is table driven: every [`ArtifactRule`] names a file-name
//! pattern, where to search, which role the matches land in, and the
//! condition under which the rule applies. Adding a platform is a table
//! edit, not a new code path.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::PackageError;
use crate::core::option::EffectiveConfiguration;
use crate::core::settings::Os;
use crate::util::fs::{copy_file, find_matching};

/// Destination role of a collected file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Bin,
    Lib,
    Include,
    Symbols,
    Licenses,
}

impl Role {
    /// Directory of the role inside the package tree.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Role::Bin => "bin",
            Role::Lib => "lib",
            Role::Include => "include",
            Role::Symbols => "symbols",
            Role::Licenses => "licenses",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Tree a rule searches in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchRoot {
    /// The build's install/output directory
    #[default]
    Output,
    /// The unpacked source tree
    Source,
}

/// When a rule applies. An empty condition always applies.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Condition {
    /// Option that must be enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
    /// Operating systems the rule is limited to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<Vec<Os>>,
}

impl Condition {
    pub fn always() -> Self {
        Condition::default()
    }

    pub fn option(name: impl Into<String>) -> Self {
        Condition {
            option: Some(name.into()),
            os: None,
        }
    }

    pub fn matches(&self, config: &EffectiveConfiguration) -> bool {
        if let Some(ref name) = self.option {
            if !config.is_enabled(name) {
                return false;
            }
        }
        if let Some(ref os) = self.os {
            if !os.contains(&config.settings.os) {
                return false;
            }
        }
        true
    }
}

/// One row of the collection table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRule {
    /// File-name pattern (`*.h`, `*.so*`, `COPYRIGHT`)
    pub pattern: String,
    #[serde(default)]
    pub root: SearchRoot,
    /// Directory below the root to search recursively
    #[serde(default)]
    pub dir: String,
    pub role: Role,
    /// Zero matches abort the run
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default, rename = "when")]
    pub condition: Condition,
}

impl ArtifactRule {
    pub fn new(pattern: impl Into<String>, root: SearchRoot, dir: impl Into<String>, role: Role) -> Self {
        ArtifactRule {
            pattern: pattern.into(),
            root,
            dir: dir.into(),
            role,
            mandatory: false,
            condition: Condition::always(),
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    /// Absolute directory searched by this rule.
    pub fn search_root(&self, source_dir: &Path, output_dir: &Path) -> PathBuf {
        let base = match self.root {
            SearchRoot::Output => output_dir,
            SearchRoot::Source => source_dir,
        };
        if self.dir.is_empty() {
            base.to_path_buf()
        } else {
            base.join(&self.dir)
        }
    }
}

/// Per-OS library pattern table.
///
/// Static archives are always collected; shared objects only when the
/// gating option is enabled, with the extension family chosen per OS.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LibraryTable {
    pub dir: String,
    pub static_patterns: Vec<String>,
    pub shared_patterns: BTreeMap<Os, Vec<String>>,
    pub shared_option: Option<String>,
}

impl LibraryTable {
    /// Expand the table into collection rules for one OS.
    pub fn rules_for(&self, os: Os) -> Vec<ArtifactRule> {
        let mut rules: Vec<ArtifactRule> = self
            .static_patterns
            .iter()
            .map(|p| ArtifactRule::new(p, SearchRoot::Output, &self.dir, Role::Lib).mandatory())
            .collect();

        if let Some(patterns) = self.shared_patterns.get(&os) {
            let condition = match self.shared_option {
                Some(ref name) => Condition::option(name),
                None => Condition::always(),
            };
            rules.extend(patterns.iter().map(|p| {
                ArtifactRule::new(p, SearchRoot::Output, &self.dir, Role::Lib)
                    .mandatory()
                    .when(condition.clone())
            }));
        }

        rules
    }
}

/// The canonical, role-organized package output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageTree {
    pub root: PathBuf,
    /// Collected files per role, relative to `root`
    pub files: BTreeMap<Role, Vec<PathBuf>>,
}

impl PackageTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        PackageTree {
            root: root.into(),
            files: BTreeMap::new(),
        }
    }

    /// Files collected for a role.
    pub fn files(&self, role: Role) -> &[PathBuf] {
        self.files.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of collected files.
    pub fn len(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&mut self, role: Role, relative: PathBuf) {
        let entry = self.files.entry(role).or_default();
        if !entry.contains(&relative) {
            entry.push(relative);
        }
    }
}

/// Apply the rules whose condition holds, copying matches into `tree`.
pub fn collect(
    rules: &[ArtifactRule],
    config: &EffectiveConfiguration,
    source_dir: &Path,
    output_dir: &Path,
    tree: &mut PackageTree,
) -> Result<(), PackageError> {
    for rule in rules.iter().filter(|r| r.condition.matches(config)) {
        let search_root = rule.search_root(source_dir, output_dir);
        let matches = find_matching(&search_root, &rule.pattern).map_err(|e| {
            PackageError::io(format!("failed to search {}", search_root.display()), e)
        })?;

        if matches.is_empty() {
            if rule.mandatory {
                return Err(PackageError::ArtifactNotFound {
                    pattern: rule.pattern.clone(),
                    search_root,
                });
            }
            tracing::debug!(
                "optional pattern `{}` matched nothing under {}",
                rule.pattern,
                search_root.display()
            );
            continue;
        }

        for relative in matches {
            let dest_rel = Path::new(rule.role.dir_name()).join(&relative);
            let src = search_root.join(&relative);
            let dest = tree.root.join(&dest_rel);
            copy_file(&src, &dest).map_err(|e| {
                PackageError::io(
                    format!("failed to copy {} to {}", src.display(), dest.display()),
                    e,
                )
            })?;
            tracing::debug!("collected {} -> {}", src.display(), dest_rel.display());
            tree.record(rule.role, dest_rel);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::option::{resolve, OptionDecl, RawOptions};
    use crate::core::settings::{Arch, CompilerFamily, Settings};
    use std::fs;
    use tempfile::TempDir;

    fn config(os: Os, shared: bool) -> EffectiveConfiguration {
        let decls = vec![OptionDecl::boolean("shared", false)];
        let mut raw = RawOptions::new();
        raw.insert("shared".to_string(), shared.to_string());
        let settings = Settings::new(os, Arch::X86_64, CompilerFamily::Gcc, "12");
        resolve(&decls, &raw, &settings, false).unwrap()
    }

    fn table() -> LibraryTable {
        let mut shared_patterns = BTreeMap::new();
        shared_patterns.insert(Os::Linux, vec!["*.so*".to_string()]);
        shared_patterns.insert(Os::Macos, vec!["*.dylib".to_string()]);
        LibraryTable {
            dir: "lib".to_string(),
            static_patterns: vec!["*.a".to_string()],
            shared_patterns,
            shared_option: Some("shared".to_string()),
        }
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_library_table_selects_per_os() {
        let linux: Vec<String> = table().rules_for(Os::Linux).into_iter().map(|r| r.pattern).collect();
        assert_eq!(linux, vec!["*.a", "*.so*"]);

        let macos: Vec<String> = table().rules_for(Os::Macos).into_iter().map(|r| r.pattern).collect();
        assert_eq!(macos, vec!["*.a", "*.dylib"]);

        let freebsd = table().rules_for(Os::Freebsd);
        assert_eq!(freebsd.len(), 1);
    }

    #[test]
    fn test_shared_collected_only_when_enabled() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        touch(&out.join("lib/libpq.a"));
        touch(&out.join("lib/libpq.so.5.10"));

        let rules = table().rules_for(Os::Linux);

        let mut tree = PackageTree::new(tmp.path().join("static"));
        collect(&rules, &config(Os::Linux, false), tmp.path(), &out, &mut tree).unwrap();
        assert_eq!(tree.files(Role::Lib), &[PathBuf::from("lib/libpq.a")]);

        let mut tree = PackageTree::new(tmp.path().join("shared"));
        collect(&rules, &config(Os::Linux, true), tmp.path(), &out, &mut tree).unwrap();
        assert_eq!(tree.files(Role::Lib).len(), 2);
        assert!(tree.root.join("lib/libpq.so.5.10").exists());
    }

    #[test]
    fn test_mandatory_pattern_missing() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        touch(&out.join("lib/libpq.a"));

        let rules = vec![ArtifactRule::new("*.h", SearchRoot::Output, "include", Role::Include).mandatory()];
        let mut tree = PackageTree::new(tmp.path().join("pkg"));
        let err = collect(&rules, &config(Os::Linux, false), tmp.path(), &out, &mut tree).unwrap_err();

        match err {
            PackageError::ArtifactNotFound { pattern, search_root } => {
                assert_eq!(pattern, "*.h");
                assert_eq!(search_root, out.join("include"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_optional_pattern_may_match_nothing() {
        let tmp = TempDir::new().unwrap();
        let rules = vec![ArtifactRule::new("*", SearchRoot::Output, "symbols", Role::Symbols)];
        let mut tree = PackageTree::new(tmp.path().join("pkg"));
        collect(&rules, &config(Os::Linux, false), tmp.path(), tmp.path(), &mut tree).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_relative_layout_preserved() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        touch(&out.join("include/libpq-fe.h"));
        touch(&out.join("include/internal/pqexpbuffer.h"));
        touch(&out.join("include/README"));

        let rules = vec![ArtifactRule::new("*.h", SearchRoot::Output, "include", Role::Include).mandatory()];
        let mut tree = PackageTree::new(tmp.path().join("pkg"));
        collect(&rules, &config(Os::Linux, false), tmp.path(), &out, &mut tree).unwrap();

        assert_eq!(tree.files(Role::Include).len(), 2);
        assert!(tree.root.join("include/internal/pqexpbuffer.h").exists());
        assert!(!tree.root.join("include/README").exists());
    }

    #[test]
    fn test_source_root_rule() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        touch(&src.join("COPYRIGHT"));

        let rules = vec![ArtifactRule::new("COPYRIGHT", SearchRoot::Source, "", Role::Licenses)];
        let mut tree = PackageTree::new(tmp.path().join("pkg"));
        collect(&rules, &config(Os::Linux, false), &src, tmp.path(), &mut tree).unwrap();
        assert_eq!(tree.files(Role::Licenses), &[PathBuf::from("licenses/COPYRIGHT")]);
    }

    #[test]
    fn test_os_condition() {
        let condition = Condition {
            option: None,
            os: Some(vec![Os::Macos]),
        };
        assert!(!condition.matches(&config(Os::Linux, false)));
        assert!(condition.matches(&config(Os::Macos, false)));
        assert!(Condition::always().matches(&config(Os::Linux, false)));
    }
}
