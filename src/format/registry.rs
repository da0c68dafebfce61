//! Format registry for resolving identifiers and paths to codecs.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::format::error::DispatchError;
use crate::format::formats::{DstFormat, ExpFormat, JefFormat, PecFormat, PesFormat};
use crate::format::traits::StitchFormat;

/// Identifier of a built-in format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FormatId {
    Dst,
    Exp,
    Jef,
    Pec,
    Pes,
}

impl FormatId {
    /// All built-in formats.
    pub const ALL: [FormatId; 5] = [
        FormatId::Dst,
        FormatId::Exp,
        FormatId::Jef,
        FormatId::Pec,
        FormatId::Pes,
    ];

    /// Uppercase identifier ("DST", "PES", ...).
    pub fn as_str(self) -> &'static str {
        match self {
            FormatId::Dst => "DST",
            FormatId::Exp => "EXP",
            FormatId::Jef => "JEF",
            FormatId::Pec => "PEC",
            FormatId::Pes => "PES",
        }
    }

    /// The codec for this identifier.
    pub fn format(self) -> &'static dyn StitchFormat {
        match self {
            FormatId::Dst => &DstFormat,
            FormatId::Exp => &ExpFormat,
            FormatId::Jef => &JefFormat,
            FormatId::Pec => &PecFormat,
            FormatId::Pes => &PesFormat,
        }
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatId {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormatId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DispatchError::UnknownFormat(s.to_string()))
    }
}

/// How the caller identifies the format of a file.
#[derive(Debug, Clone, Copy)]
pub enum FormatHint<'a> {
    /// An identifier such as "DST", used verbatim.
    Explicit(&'a str),
    /// Infer from the file extension.
    Path(&'a Path),
}

impl<'a> FormatHint<'a> {
    /// Prefer `explicit` when given, else the path's extension.
    pub fn from_parts(explicit: Option<&'a str>, path: &'a Path) -> Self {
        match explicit {
            Some(id) => FormatHint::Explicit(id),
            None => FormatHint::Path(path),
        }
    }
}

/// Read-only index of the built-in formats.
///
/// Built once per process by [`FormatRegistry::global`]; lookups need no locking.
pub struct FormatRegistry {
    by_extension: HashMap<&'static str, FormatId>,
}

impl FormatRegistry {
    fn new() -> Self {
        let mut by_extension = HashMap::new();
        for id in FormatId::ALL {
            for ext in id.format().extensions() {
                by_extension.insert(*ext, id);
            }
        }
        log::debug!("Format registry built with {} extensions", by_extension.len());
        Self { by_extension }
    }

    /// The process-wide registry.
    pub fn global() -> &'static FormatRegistry {
        static REGISTRY: OnceLock<FormatRegistry> = OnceLock::new();
        REGISTRY.get_or_init(FormatRegistry::new)
    }

    /// Find the format for a file extension, ignoring case.
    pub fn by_extension(&self, ext: &str) -> Option<FormatId> {
        self.by_extension
            .get(ext.to_ascii_lowercase().as_str())
            .copied()
    }

    /// Resolve a hint to a codec.
    pub fn resolve(&self, hint: FormatHint<'_>) -> Result<&'static dyn StitchFormat, DispatchError> {
        let id = match hint {
            FormatHint::Explicit(name) => name.parse::<FormatId>()?,
            FormatHint::Path(path) => path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(|e| self.by_extension(e))
                .ok_or_else(|| DispatchError::UnrecognizedExtension {
                    path: path.to_path_buf(),
                })?,
        };
        Ok(id.format())
    }

    /// Guess the format from leading bytes.
    pub fn sniff(&self, bytes: &[u8]) -> Option<FormatId> {
        FormatId::ALL
            .into_iter()
            .find(|id| id.format().sniff(bytes))
    }

    /// All formats in identifier order.
    pub fn all(&self) -> impl Iterator<Item = &'static dyn StitchFormat> {
        FormatId::ALL.into_iter().map(FormatId::format)
    }

    /// Formats that can be conversion targets.
    pub fn writable(&self) -> Vec<FormatId> {
        FormatId::ALL
            .into_iter()
            .filter(|id| id.format().capabilities().can_write)
            .collect()
    }
}

/// Resolve a hint against the global registry.
pub fn resolve(hint: FormatHint<'_>) -> Result<&'static dyn StitchFormat, DispatchError> {
    FormatRegistry::global().resolve(hint)
}
