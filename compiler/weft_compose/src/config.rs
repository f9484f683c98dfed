//! Composer configuration.
//!
//! Defaults suit library use: synthesis is logged at `DEBUG` and nothing is
//! dumped. Processes opt into dumps through the environment:
//!
//! | variable | meaning |
//! |---|---|
//! | `WEFT_LOG_LEVEL` | level of the per-composite synthesis event |
//! | `WEFT_DUMP_DIR` | directory receiving one file per defined composite |
//! | `WEFT_DUMP_KIND` | `text` (default) or `binary` |

use std::path::PathBuf;
use std::str::FromStr;

use tracing::Level;

use crate::error::ComposeError;

pub const LOG_LEVEL_VAR: &str = "WEFT_LOG_LEVEL";
pub const DUMP_DIR_VAR: &str = "WEFT_DUMP_DIR";
pub const DUMP_KIND_VAR: &str = "WEFT_DUMP_KIND";

/// Format of dumped composite definitions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DumpKind {
    /// Human-readable disassembly, `<name>.txt`.
    #[default]
    Text,
    /// The raw assembled bytes, `<name>.bin`.
    Binary,
}

impl DumpKind {
    pub fn extension(self) -> &'static str {
        match self {
            DumpKind::Text => "txt",
            DumpKind::Binary => "bin",
        }
    }
}

impl FromStr for DumpKind {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(DumpKind::Text),
            "binary" | "bin" => Ok(DumpKind::Binary),
            _ => Err(ComposeError::InvalidConfig {
                key: DUMP_KIND_VAR.to_owned(),
                value: s.to_owned(),
            }),
        }
    }
}

/// Where to dump defined composites, and how.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DumpConfig {
    pub dir: PathBuf,
    pub kind: DumpKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposerConfig {
    /// Level of the event logged for every synthesized composite.
    pub log_level: Level,
    pub dump: Option<DumpConfig>,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        ComposerConfig {
            log_level: Level::DEBUG,
            dump: None,
        }
    }
}

impl ComposerConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ComposeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`, falling back to defaults for unset
    /// or empty variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ComposeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = ComposerConfig::default();

        if let Some(level) = get(LOG_LEVEL_VAR) {
            config.log_level =
                Level::from_str(level.trim()).map_err(|_| ComposeError::InvalidConfig {
                    key: LOG_LEVEL_VAR.to_owned(),
                    value: level.clone(),
                })?;
        }

        if let Some(dir) = get(DUMP_DIR_VAR) {
            let kind = match get(DUMP_KIND_VAR) {
                Some(kind) => kind.parse()?,
                None => DumpKind::default(),
            };
            config.dump = Some(DumpConfig {
                dir: PathBuf::from(dir),
                kind,
            });
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    #[must_use]
    pub fn with_dump(mut self, dir: impl Into<PathBuf>, kind: DumpKind) -> Self {
        self.dump = Some(DumpConfig {
            dir: dir.into(),
            kind,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rustc_hash::FxHashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: FxHashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ComposerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ComposerConfig::default());
    }

    #[test]
    fn reads_level_and_dump() {
        let config = ComposerConfig::from_lookup(lookup(&[
            (LOG_LEVEL_VAR, "info"),
            (DUMP_DIR_VAR, "/tmp/weft"),
            (DUMP_KIND_VAR, "Binary"),
        ]))
        .unwrap();
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(
            config.dump,
            Some(DumpConfig {
                dir: PathBuf::from("/tmp/weft"),
                kind: DumpKind::Binary,
            })
        );
    }

    #[test]
    fn dump_kind_defaults_to_text() {
        let config = ComposerConfig::from_lookup(lookup(&[(DUMP_DIR_VAR, "out")])).unwrap();
        assert_eq!(config.dump.map(|d| d.kind), Some(DumpKind::Text));
    }

    #[test]
    fn rejects_bad_values() {
        let err = ComposerConfig::from_lookup(lookup(&[(LOG_LEVEL_VAR, "loud")])).unwrap_err();
        assert!(matches!(err, ComposeError::InvalidConfig { ref key, .. } if key == LOG_LEVEL_VAR));

        let err = ComposerConfig::from_lookup(lookup(&[
            (DUMP_DIR_VAR, "out"),
            (DUMP_KIND_VAR, "hex"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ComposeError::InvalidConfig { ref key, .. } if key == DUMP_KIND_VAR));
    }

    #[test]
    fn empty_values_are_unset() {
        let config = ComposerConfig::from_lookup(lookup(&[(DUMP_DIR_VAR, "  ")])).unwrap();
        assert_eq!(config.dump, None);
    }
}
