//! Target descriptors and the static target registry.
//!
//! Every triple xforge knows how to provision is listed once in
//! [`REGISTRY_TABLE`] as a typed record. Triples that are not listed are
//! still accepted: they become pass-through descriptors with [`Os::Other`]
//! and are handed to cargo untouched.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use glob::Pattern;
use regex::Regex;

use crate::core::errors::{CrossError, CrossResult};

/// Target operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Os {
    Linux,
    Windows,
    FreeBsd,
    Darwin,
    Ios,
    IosSim,
    Android,
    /// Not in the registry; no toolchain provisioning.
    Other,
}

impl Os {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Windows => "windows",
            Os::FreeBsd => "freebsd",
            Os::Darwin => "darwin",
            Os::Ios => "ios",
            Os::IosSim => "ios-sim",
            Os::Android => "android",
            Os::Other => "other",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arch {
    Aarch64,
    Arm64e,
    Armv5,
    Armv6,
    Armv7,
    I586,
    I686,
    Loongarch64,
    Mips,
    Mipsel,
    Mips64,
    Mips64el,
    Powerpc64,
    Powerpc64le,
    Riscv64,
    S390x,
    X86_64,
    X86_64h,
}

impl Arch {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Arch::Aarch64 => "aarch64",
            Arch::Arm64e => "arm64e",
            Arch::Armv5 => "armv5",
            Arch::Armv6 => "armv6",
            Arch::Armv7 => "armv7",
            Arch::I586 => "i586",
            Arch::I686 => "i686",
            Arch::Loongarch64 => "loongarch64",
            Arch::Mips => "mips",
            Arch::Mipsel => "mipsel",
            Arch::Mips64 => "mips64",
            Arch::Mips64el => "mips64el",
            Arch::Powerpc64 => "powerpc64",
            Arch::Powerpc64le => "powerpc64le",
            Arch::Riscv64 => "riscv64",
            Arch::S390x => "s390x",
            Arch::X86_64 => "x86_64",
            Arch::X86_64h => "x86_64h",
        }
    }

    /// Name of the QEMU user-mode binary able to run this architecture.
    pub const fn emulator_name(&self) -> Option<&'static str> {
        match self {
            Arch::Aarch64 => Some("qemu-aarch64"),
            Arch::Armv5 | Arch::Armv6 | Arch::Armv7 => Some("qemu-arm"),
            Arch::I586 | Arch::I686 => Some("qemu-i386"),
            Arch::Loongarch64 => Some("qemu-loongarch64"),
            Arch::Mips => Some("qemu-mips"),
            Arch::Mipsel => Some("qemu-mipsel"),
            Arch::Mips64 => Some("qemu-mips64"),
            Arch::Mips64el => Some("qemu-mips64el"),
            Arch::Powerpc64 => Some("qemu-ppc64"),
            Arch::Powerpc64le => Some("qemu-ppc64le"),
            Arch::Riscv64 => Some("qemu-riscv64"),
            Arch::S390x => Some("qemu-s390x"),
            Arch::X86_64 => Some("qemu-x86_64"),
            Arch::Arm64e | Arch::X86_64h => None,
        }
    }

    /// Parse the architecture component of a triple (`riscv64gc` -> riscv64).
    pub fn from_triple_component(component: &str) -> Option<Arch> {
        let arch = match component {
            "aarch64" | "arm64" => Arch::Aarch64,
            "arm64e" => Arch::Arm64e,
            "armv5te" | "armv5" => Arch::Armv5,
            "arm" | "armv6" => Arch::Armv6,
            "armv7" | "armv7a" | "thumbv7neon" => Arch::Armv7,
            "i586" => Arch::I586,
            "i686" | "x86" => Arch::I686,
            "loongarch64" => Arch::Loongarch64,
            "mips" => Arch::Mips,
            "mipsel" => Arch::Mipsel,
            "mips64" => Arch::Mips64,
            "mips64el" => Arch::Mips64el,
            "powerpc64" => Arch::Powerpc64,
            "powerpc64le" => Arch::Powerpc64le,
            "riscv64" | "riscv64gc" => Arch::Riscv64,
            "s390x" => Arch::S390x,
            "x86_64" | "amd64" => Arch::X86_64,
            "x86_64h" => Arch::X86_64h,
            _ => return None,
        };
        Some(arch)
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// C library flavour of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Libc {
    Musl,
    Gnu,
    Msvc,
}

impl Libc {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Libc::Musl => "musl",
            Libc::Gnu => "gnu",
            Libc::Msvc => "msvc",
        }
    }
}

/// ARM floating point ABI suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Abi {
    Eabi,
    Eabihf,
}

impl Abi {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Abi::Eabi => "eabi",
            Abi::Eabihf => "eabihf",
        }
    }
}

/// Identifies a compilation target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetDescriptor {
    pub triple: String,
    pub os: Os,
    /// `None` only for pass-through descriptors with an unrecognized arch.
    pub arch: Option<Arch>,
    pub libc: Option<Libc>,
    pub abi: Option<Abi>,
}

impl TargetDescriptor {
    pub fn new(triple: impl Into<String>, os: Os, arch: Arch) -> Self {
        TargetDescriptor {
            triple: triple.into(),
            os,
            arch: Some(arch),
            libc: None,
            abi: None,
        }
    }

    pub fn with_libc(mut self, libc: Libc) -> Self {
        self.libc = Some(libc);
        self
    }

    pub fn with_abi(mut self, abi: Abi) -> Self {
        self.abi = Some(abi);
        self
    }

    /// Minimal descriptor for a triple the registry does not know.
    pub fn passthrough(triple: impl Into<String>) -> Self {
        let triple = triple.into();
        let arch = triple
            .split('-')
            .next()
            .and_then(Arch::from_triple_component);
        TargetDescriptor {
            triple,
            os: Os::Other,
            arch,
            libc: None,
            abi: None,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.os != Os::Other
    }

    /// `aarch64-unknown-linux-musl` -> `AARCH64_UNKNOWN_LINUX_MUSL`
    pub fn env_upper(&self) -> String {
        self.env_lower().to_uppercase()
    }

    /// `aarch64-unknown-linux-musl` -> `aarch64_unknown_linux_musl`
    pub fn env_lower(&self) -> String {
        self.triple.replace(['-', '.'], "_")
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.triple)
    }
}

type TableRow = (&'static str, Os, Arch, Option<Libc>, Option<Abi>);

const MUSL: Option<Libc> = Some(Libc::Musl);
const GNU: Option<Libc> = Some(Libc::Gnu);
const MSVC: Option<Libc> = Some(Libc::Msvc);
const EABI: Option<Abi> = Some(Abi::Eabi);
const EABIHF: Option<Abi> = Some(Abi::Eabihf);

/// Every triple with a provisioning strategy.
pub const REGISTRY_TABLE: &[TableRow] = &[
    // Linux musl
    ("aarch64-unknown-linux-musl", Os::Linux, Arch::Aarch64, MUSL, None),
    ("arm-unknown-linux-musleabi", Os::Linux, Arch::Armv6, MUSL, EABI),
    ("arm-unknown-linux-musleabihf", Os::Linux, Arch::Armv6, MUSL, EABIHF),
    ("armv5te-unknown-linux-musleabi", Os::Linux, Arch::Armv5, MUSL, EABI),
    ("armv7-unknown-linux-musleabi", Os::Linux, Arch::Armv7, MUSL, EABI),
    ("armv7-unknown-linux-musleabihf", Os::Linux, Arch::Armv7, MUSL, EABIHF),
    ("i586-unknown-linux-musl", Os::Linux, Arch::I586, MUSL, None),
    ("i686-unknown-linux-musl", Os::Linux, Arch::I686, MUSL, None),
    ("loongarch64-unknown-linux-musl", Os::Linux, Arch::Loongarch64, MUSL, None),
    ("mips-unknown-linux-musl", Os::Linux, Arch::Mips, MUSL, None),
    ("mipsel-unknown-linux-musl", Os::Linux, Arch::Mipsel, MUSL, None),
    ("mips64-unknown-linux-muslabi64", Os::Linux, Arch::Mips64, MUSL, None),
    ("mips64-openwrt-linux-musl", Os::Linux, Arch::Mips64, MUSL, None),
    ("mips64el-unknown-linux-muslabi64", Os::Linux, Arch::Mips64el, MUSL, None),
    ("powerpc64-unknown-linux-musl", Os::Linux, Arch::Powerpc64, MUSL, None),
    ("powerpc64le-unknown-linux-musl", Os::Linux, Arch::Powerpc64le, MUSL, None),
    ("riscv64gc-unknown-linux-musl", Os::Linux, Arch::Riscv64, MUSL, None),
    ("s390x-unknown-linux-musl", Os::Linux, Arch::S390x, MUSL, None),
    ("x86_64-unknown-linux-musl", Os::Linux, Arch::X86_64, MUSL, None),
    // Linux gnu
    ("aarch64-unknown-linux-gnu", Os::Linux, Arch::Aarch64, GNU, None),
    ("arm-unknown-linux-gnueabi", Os::Linux, Arch::Armv6, GNU, EABI),
    ("arm-unknown-linux-gnueabihf", Os::Linux, Arch::Armv6, GNU, EABIHF),
    ("armv5te-unknown-linux-gnueabi", Os::Linux, Arch::Armv5, GNU, EABI),
    ("armv7-unknown-linux-gnueabi", Os::Linux, Arch::Armv7, GNU, EABI),
    ("armv7-unknown-linux-gnueabihf", Os::Linux, Arch::Armv7, GNU, EABIHF),
    ("i586-unknown-linux-gnu", Os::Linux, Arch::I586, GNU, None),
    ("i686-unknown-linux-gnu", Os::Linux, Arch::I686, GNU, None),
    ("loongarch64-unknown-linux-gnu", Os::Linux, Arch::Loongarch64, GNU, None),
    ("mips-unknown-linux-gnu", Os::Linux, Arch::Mips, GNU, None),
    ("mipsel-unknown-linux-gnu", Os::Linux, Arch::Mipsel, GNU, None),
    ("mips64-unknown-linux-gnuabi64", Os::Linux, Arch::Mips64, GNU, None),
    ("mips64el-unknown-linux-gnuabi64", Os::Linux, Arch::Mips64el, GNU, None),
    ("powerpc64-unknown-linux-gnu", Os::Linux, Arch::Powerpc64, GNU, None),
    ("powerpc64le-unknown-linux-gnu", Os::Linux, Arch::Powerpc64le, GNU, None),
    ("riscv64gc-unknown-linux-gnu", Os::Linux, Arch::Riscv64, GNU, None),
    ("s390x-unknown-linux-gnu", Os::Linux, Arch::S390x, GNU, None),
    ("x86_64-unknown-linux-gnu", Os::Linux, Arch::X86_64, GNU, None),
    // Windows
    ("i686-pc-windows-gnu", Os::Windows, Arch::I686, GNU, None),
    ("x86_64-pc-windows-gnu", Os::Windows, Arch::X86_64, GNU, None),
    ("i686-pc-windows-msvc", Os::Windows, Arch::I686, MSVC, None),
    ("x86_64-pc-windows-msvc", Os::Windows, Arch::X86_64, MSVC, None),
    ("aarch64-pc-windows-msvc", Os::Windows, Arch::Aarch64, MSVC, None),
    // FreeBSD
    ("x86_64-unknown-freebsd", Os::FreeBsd, Arch::X86_64, None, None),
    ("aarch64-unknown-freebsd", Os::FreeBsd, Arch::Aarch64, None, None),
    ("powerpc64-unknown-freebsd", Os::FreeBsd, Arch::Powerpc64, None, None),
    ("powerpc64le-unknown-freebsd", Os::FreeBsd, Arch::Powerpc64le, None, None),
    ("riscv64gc-unknown-freebsd", Os::FreeBsd, Arch::Riscv64, None, None),
    // Darwin
    ("x86_64-apple-darwin", Os::Darwin, Arch::X86_64, None, None),
    ("x86_64h-apple-darwin", Os::Darwin, Arch::X86_64h, None, None),
    ("aarch64-apple-darwin", Os::Darwin, Arch::Aarch64, None, None),
    ("arm64e-apple-darwin", Os::Darwin, Arch::Arm64e, None, None),
    // iOS
    ("x86_64-apple-ios", Os::Ios, Arch::X86_64, None, None),
    ("aarch64-apple-ios", Os::Ios, Arch::Aarch64, None, None),
    ("aarch64-apple-ios-sim", Os::IosSim, Arch::Aarch64, None, None),
    // Android
    ("aarch64-linux-android", Os::Android, Arch::Aarch64, None, None),
    ("arm-linux-androideabi", Os::Android, Arch::Armv7, None, None),
    ("armv7-linux-androideabi", Os::Android, Arch::Armv7, None, None),
    ("i686-linux-android", Os::Android, Arch::I686, None, None),
    ("riscv64-linux-android", Os::Android, Arch::Riscv64, None, None),
    ("x86_64-linux-android", Os::Android, Arch::X86_64, None, None),
];

static REGISTRY: LazyLock<TargetRegistry> =
    LazyLock::new(|| TargetRegistry::from_table(REGISTRY_TABLE));

/// Lookup and pattern expansion over the known targets.
#[derive(Debug, Clone)]
pub struct TargetRegistry {
    entries: BTreeMap<String, TargetDescriptor>,
}

impl TargetRegistry {
    /// The process-wide registry built from [`REGISTRY_TABLE`].
    pub fn global() -> &'static TargetRegistry {
        &REGISTRY
    }

    pub fn from_table(table: &[TableRow]) -> Self {
        let entries = table
            .iter()
            .map(|&(triple, os, arch, libc, abi)| {
                let desc = TargetDescriptor {
                    triple: triple.to_string(),
                    os,
                    arch: Some(arch),
                    libc,
                    abi,
                };
                (triple.to_string(), desc)
            })
            .collect();
        TargetRegistry { entries }
    }

    pub fn get(&self, triple: &str) -> Option<&TargetDescriptor> {
        self.entries.get(triple)
    }

    /// Registered descriptor, or a pass-through one for unknown triples.
    pub fn lookup(&self, triple: &str) -> TargetDescriptor {
        self.get(triple)
            .cloned()
            .unwrap_or_else(|| TargetDescriptor::passthrough(triple))
    }

    /// All registered triples in sorted order.
    pub fn triples(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expand a list of target tokens into a sorted, deduplicated list.
    ///
    /// Each token may itself be a comma or newline separated list. Tokens are
    /// `all`, a glob (`*-linux-musl`, `{x86_64,aarch64}-*`), a regex prefixed
    /// with `~`, or a literal triple. Individual patterns may match nothing;
    /// an empty overall result is an error.
    pub fn expand<S: AsRef<str>>(&self, tokens: &[S]) -> CrossResult<Vec<TargetDescriptor>> {
        let mut selected: BTreeMap<String, TargetDescriptor> = BTreeMap::new();
        let mut seen_tokens = Vec::new();

        for token in tokens.iter().flat_map(|t| split_target_list(t.as_ref())) {
            seen_tokens.push(token.to_string());
            for desc in self.expand_token(token)? {
                selected.entry(desc.triple.clone()).or_insert(desc);
            }
        }

        if selected.is_empty() {
            return Err(CrossError::NoTargets {
                patterns: seen_tokens,
            });
        }

        Ok(selected.into_values().collect())
    }

    /// Expand a single, already split token.
    pub fn expand_token(&self, token: &str) -> CrossResult<Vec<TargetDescriptor>> {
        let token = token.trim();

        if token == "all" {
            return Ok(self.entries.values().cloned().collect());
        }

        if let Some(expr) = token.strip_prefix('~') {
            return Ok(match Regex::new(expr) {
                Ok(re) => self
                    .entries
                    .values()
                    .filter(|d| re.is_match(&d.triple))
                    .cloned()
                    .collect(),
                Err(e) => {
                    tracing::warn!("invalid target regex `{}`: {}", expr, e);
                    Vec::new()
                }
            });
        }

        if is_glob(token) {
            let patterns: Vec<Pattern> = expand_braces(token)
                .iter()
                .filter_map(|p| match Pattern::new(p) {
                    Ok(pattern) => Some(pattern),
                    Err(e) => {
                        tracing::warn!("invalid target pattern `{}`: {}", p, e);
                        None
                    }
                })
                .collect();
            return Ok(self
                .entries
                .values()
                .filter(|d| patterns.iter().any(|p| p.matches(&d.triple)))
                .cloned()
                .collect());
        }

        validate_triple(token)?;
        Ok(vec![self.lookup(token)])
    }
}

/// Split `a,b\nc` into trimmed, non-empty tokens.
pub fn split_target_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn is_glob(token: &str) -> bool {
    token.contains(['*', '?', '[', '{'])
}

fn validate_triple(triple: &str) -> CrossResult<()> {
    match triple
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.')))
    {
        Some(ch) => Err(CrossError::InvalidTargetTriple {
            target: triple.to_string(),
            ch,
        }),
        None => Ok(()),
    }
}

/// Expand the first `{a,b}` group recursively; `glob` has no brace support.
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };
    let Some(close) = pattern[open..].find('}').map(|i| open + i) else {
        return vec![pattern.to_string()];
    };

    let (head, rest) = (&pattern[..open], &pattern[close + 1..]);
    pattern[open + 1..close]
        .split(',')
        .flat_map(|alt| expand_braces(&format!("{head}{alt}{rest}")))
        .collect()
}

/// Binary prefix of a Linux cross toolchain (`armv7-linux-musleabihf`).
pub fn linux_bin_prefix(arch: Arch, libc: Libc, abi: Option<Abi>) -> String {
    format!(
        "{}-linux-{}{}",
        arch.as_str(),
        libc.as_str(),
        abi.map_or("", |a| a.as_str())
    )
}

/// Release folder name of a Linux cross toolchain.
///
/// gnu toolchains built against a non-default glibc carry the glibc version.
pub fn linux_folder_name(
    arch: Arch,
    libc: Libc,
    abi: Option<Abi>,
    glibc_version: &str,
    default_glibc_version: &str,
) -> String {
    let base = linux_bin_prefix(arch, libc, abi);
    if libc == Libc::Gnu && glibc_version != default_glibc_version {
        format!("{base}-{glibc_version}-cross")
    } else {
        format!("{base}-cross")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triples(descs: &[TargetDescriptor]) -> Vec<&str> {
        descs.iter().map(|d| d.triple.as_str()).collect()
    }

    #[test]
    fn test_every_registered_literal_expands_to_itself() {
        let reg = TargetRegistry::global();
        for triple in reg.triples() {
            let expanded = reg.expand(&[triple]).unwrap();
            assert_eq!(triples(&expanded), vec![triple]);
        }
    }

    #[test]
    fn test_all_is_full_registry() {
        let reg = TargetRegistry::global();
        let all = reg.expand(&["all", "all", "x86_64-unknown-linux-musl"]).unwrap();
        assert_eq!(all.len(), reg.len());
        assert_eq!(triples(&all), reg.triples().collect::<Vec<_>>());
    }

    #[test]
    fn test_duplicate_glob_is_idempotent() {
        let reg = TargetRegistry::global();
        let once = reg.expand(&["*-linux-musl"]).unwrap();
        let twice = reg.expand(&["*-linux-musl", "*-linux-musl"]).unwrap();
        assert_eq!(once, twice);
        assert!(once.iter().all(|d| d.triple.ends_with("-linux-musl")));
    }

    #[test]
    fn test_expansion_commutes_with_union() {
        let reg = TargetRegistry::global();
        let both = reg.expand(&["*-apple-*", "*-freebsd"]).unwrap();

        let mut union: Vec<TargetDescriptor> = reg.expand(&["*-apple-*"]).unwrap();
        union.extend(reg.expand(&["*-freebsd"]).unwrap());
        union.sort_by(|a, b| a.triple.cmp(&b.triple));
        union.dedup();

        assert_eq!(both, union);
    }

    #[test]
    fn test_comma_and_newline_lists() {
        let reg = TargetRegistry::global();
        let expanded = reg
            .expand(&["x86_64-pc-windows-gnu, aarch64-apple-darwin\ni686-linux-android"])
            .unwrap();
        assert_eq!(
            triples(&expanded),
            vec!["aarch64-apple-darwin", "i686-linux-android", "x86_64-pc-windows-gnu"]
        );
    }

    #[test]
    fn test_brace_and_regex_patterns() {
        let reg = TargetRegistry::global();
        let braces = reg.expand(&["{x86_64,aarch64}-unknown-linux-gnu"]).unwrap();
        assert_eq!(
            triples(&braces),
            vec!["aarch64-unknown-linux-gnu", "x86_64-unknown-linux-gnu"]
        );

        let regex = reg.expand(&["~^mips64.*musl"]).unwrap();
        assert_eq!(
            triples(&regex),
            vec![
                "mips64-openwrt-linux-musl",
                "mips64-unknown-linux-muslabi64",
                "mips64el-unknown-linux-muslabi64"
            ]
        );
    }

    #[test]
    fn test_unknown_literal_passes_through() {
        let reg = TargetRegistry::global();
        let expanded = reg.expand(&["thumbv7em-none-eabihf"]).unwrap();
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].os, Os::Other);
        assert!(!expanded[0].is_registered());
    }

    #[test]
    fn test_empty_expansion_is_an_error() {
        let reg = TargetRegistry::global();
        let err = reg.expand(&["nomatch-*"]).unwrap_err();
        assert!(matches!(err, CrossError::NoTargets { .. }));

        let err = reg.expand::<&str>(&[]).unwrap_err();
        assert!(matches!(err, CrossError::NoTargets { .. }));
    }

    #[test]
    fn test_invalid_literal_is_rejected() {
        let reg = TargetRegistry::global();
        let err = reg.expand(&["X86_64-unknown-linux-gnu"]).unwrap_err();
        assert!(matches!(err, CrossError::InvalidTargetTriple { ch: 'X', .. }));
    }

    #[test]
    fn test_env_keys() {
        let desc = TargetRegistry::global().lookup("aarch64-unknown-linux-musl");
        assert_eq!(desc.env_upper(), "AARCH64_UNKNOWN_LINUX_MUSL");
        assert_eq!(desc.env_lower(), "aarch64_unknown_linux_musl");
    }

    #[test]
    fn test_linux_naming() {
        assert_eq!(
            linux_bin_prefix(Arch::Armv7, Libc::Musl, Some(Abi::Eabihf)),
            "armv7-linux-musleabihf"
        );
        assert_eq!(
            linux_folder_name(Arch::Aarch64, Libc::Gnu, None, "2.28", "2.28"),
            "aarch64-linux-gnu-cross"
        );
        assert_eq!(
            linux_folder_name(Arch::Aarch64, Libc::Gnu, None, "2.31", "2.28"),
            "aarch64-linux-gnu-2.31-cross"
        );
        assert_eq!(
            linux_folder_name(Arch::X86_64, Libc::Musl, None, "2.31", "2.28"),
            "x86_64-linux-musl-cross"
        );
    }
}
