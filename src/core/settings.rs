//! Target-environment settings.
//!
//! Settings describe the platform a package is built for. They are supplied
//! once at the start of a run and never mutated afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Operating system of the build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Macos,
    Windows,
    Freebsd,
    Android,
    Ios,
}

impl Os {
    pub const ALL: [Os; 6] = [Os::Linux, Os::Macos, Os::Windows, Os::Freebsd, Os::Android, Os::Ios];

    /// Get the OS name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Macos => "macos",
            Os::Windows => "windows",
            Os::Freebsd => "freebsd",
            Os::Android => "android",
            Os::Ios => "ios",
        }
    }

    /// Detect the host operating system.
    pub fn host() -> Option<Self> {
        std::env::consts::OS.parse().ok()
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Os {
    type Err = SettingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Os::Linux),
            "macos" | "darwin" | "macosx" => Ok(Os::Macos),
            "windows" | "win32" => Ok(Os::Windows),
            "freebsd" => Ok(Os::Freebsd),
            "android" => Ok(Os::Android),
            "ios" => Ok(Os::Ios),
            _ => Err(SettingParseError::new("os", s, "linux, macos, windows, freebsd, android, ios")),
        }
    }
}

/// CPU architecture of the build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    X86,
    X86_64,
    Armv7,
    Armv8,
}

impl Arch {
    /// Get the architecture name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::Armv7 => "armv7",
            Arch::Armv8 => "armv8",
        }
    }

    /// Detect the host architecture.
    pub fn host() -> Option<Self> {
        std::env::consts::ARCH.parse().ok()
    }

    /// Pointer width flag for GCC-compatible compilers, if one applies.
    pub fn gcc_width_flag(&self) -> Option<&'static str> {
        match self {
            Arch::X86 => Some("-m32"),
            Arch::X86_64 => Some("-m64"),
            Arch::Armv7 | Arch::Armv8 => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = SettingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x86" | "i686" | "i386" => Ok(Arch::X86),
            "x86_64" | "amd64" | "x64" => Ok(Arch::X86_64),
            "armv7" | "arm" => Ok(Arch::Armv7),
            "armv8" | "aarch64" | "arm64" => Ok(Arch::Armv8),
            _ => Err(SettingParseError::new("arch", s, "x86, x86_64, armv7, armv8")),
        }
    }
}

/// Compiler family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompilerFamily {
    /// GCC (GNU Compiler Collection)
    Gcc,
    /// Clang/LLVM
    Clang,
    /// Apple Clang (macOS)
    AppleClang,
    /// Microsoft Visual C++
    Msvc,
}

impl CompilerFamily {
    pub const ALL: [CompilerFamily; 4] = [
        CompilerFamily::Gcc,
        CompilerFamily::Clang,
        CompilerFamily::AppleClang,
        CompilerFamily::Msvc,
    ];

    /// Get the compiler family name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerFamily::Gcc => "gcc",
            CompilerFamily::Clang => "clang",
            CompilerFamily::AppleClang => "apple-clang",
            CompilerFamily::Msvc => "msvc",
        }
    }

    /// The compiler a platform conventionally uses.
    pub fn default_for(os: Os) -> Self {
        match os {
            Os::Windows => CompilerFamily::Msvc,
            Os::Macos | Os::Ios => CompilerFamily::AppleClang,
            Os::Freebsd => CompilerFamily::Clang,
            Os::Linux | Os::Android => CompilerFamily::Gcc,
        }
    }

    /// Default C compiler driver for the family.
    pub fn c_driver(&self) -> &'static str {
        match self {
            CompilerFamily::Gcc => "gcc",
            CompilerFamily::Clang | CompilerFamily::AppleClang => "clang",
            CompilerFamily::Msvc => "cl",
        }
    }
}

impl fmt::Display for CompilerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompilerFamily {
    type Err = SettingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gcc" => Ok(CompilerFamily::Gcc),
            "clang" => Ok(CompilerFamily::Clang),
            "apple-clang" | "apple_clang" | "appleclang" => Ok(CompilerFamily::AppleClang),
            "msvc" | "visual studio" | "visual_studio" | "cl" => Ok(CompilerFamily::Msvc),
            _ => Err(SettingParseError::new("compiler", s, "gcc, clang, apple-clang, msvc")),
        }
    }
}

/// Build variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    Debug,
    #[default]
    Release,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "debug",
            BuildType::Release => "release",
        }
    }

    pub fn is_debug(&self) -> bool {
        matches!(self, BuildType::Debug)
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildType {
    type Err = SettingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(BuildType::Debug),
            "release" => Ok(BuildType::Release),
            _ => Err(SettingParseError::new("build_type", s, "debug, release")),
        }
    }
}

/// Error returned when a setting value cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingParseError {
    pub setting: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl SettingParseError {
    fn new(setting: &'static str, value: &str, expected: &'static str) -> Self {
        SettingParseError {
            setting,
            value: value.to_string(),
            expected,
        }
    }
}

impl fmt::Display for SettingParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid {} '{}', valid values: {}",
            self.setting, self.value, self.expected
        )
    }
}

impl std::error::Error for SettingParseError {}

/// Immutable description of the build target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Settings {
    pub os: Os,
    pub arch: Arch,
    pub compiler: CompilerFamily,
    pub compiler_version: String,
    /// C++ standard library flavour; irrelevant for pure C components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub libcxx: Option<String>,
    pub build_type: BuildType,
}

impl Settings {
    /// Create settings with no libcxx and a release build.
    pub fn new(os: Os, arch: Arch, compiler: CompilerFamily, compiler_version: impl Into<String>) -> Self {
        Settings {
            os,
            arch,
            compiler,
            compiler_version: compiler_version.into(),
            libcxx: None,
            build_type: BuildType::Release,
        }
    }

    /// Settings describing the host, with the compiler family the host
    /// platform conventionally uses.
    pub fn host() -> Self {
        let os = Os::host().unwrap_or(Os::Linux);
        let arch = Arch::host().unwrap_or(Arch::X86_64);
        Settings::new(os, arch, CompilerFamily::default_for(os), "")
    }

    pub fn with_build_type(mut self, build_type: BuildType) -> Self {
        self.build_type = build_type;
        self
    }

    pub fn with_libcxx(mut self, libcxx: impl Into<String>) -> Self {
        self.libcxx = Some(libcxx.into());
        self
    }

    /// Copy of these settings with the C++ runtime removed.
    pub fn without_libcxx(&self) -> Self {
        Settings {
            libcxx: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} {}", self.os, self.arch, self.compiler)?;
        if !self.compiler_version.is_empty() {
            write!(f, " {}", self.compiler_version)?;
        }
        write!(f, " ({})", self.build_type)
    }
}
