//! In-memory configuration knobs for the parser and CFG builder.
//!
//! This is a plain record, not process-global state: callers build one and
//! pass it by reference. Parsing it out of a key-value file or CLI flags
//! is a driver concern and lives outside this crate; [`Config::apply_override`]
//! is the single entry point a driver-side parser would call once per line
//! or flag.

use std::fmt;

/// Resource and precision knobs threaded through parsing and CFG
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Cap on the cardinality of a `Finite` lattice set before it widens
    /// to `⊤`.
    pub set_max: usize,
    /// Number of re-visits to the same block before all differing entry
    /// stack slots are forced to `⊤`, guaranteeing termination.
    pub widen_threshold: usize,
    /// Per-entry-pc budget on context-sensitive block clones.
    pub max_clones_per_pc: usize,
    /// Hard cap on total blocks the builder will materialise.
    pub max_blocks: usize,
    /// EVM stack depth ceiling (architectural constant, but configurable
    /// for testing).
    pub stack_depth_limit: usize,
    /// Drop unreached blocks once the CFG reaches a fixed point.
    pub remove_unreachable: bool,
    /// If true, an empty-stack pop during simulation marks the block
    /// malformed (no successors) instead of synthesising an input
    /// variable.
    pub die_on_empty_pop: bool,
    /// If true, the builder runs the fallthrough-chain-merge and
    /// empty-passthrough-block-removal passes (see the `optimize` module)
    /// before returning the CFG, so blocks orphaned or left trivial by
    /// construction don't linger as separate nodes.
    pub merge_unreachable: bool,
    /// Fail fast (return `Err`) on malformed input or unknown opcodes
    /// instead of the lenient best-effort behaviour.
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            set_max: 10,
            widen_threshold: 20,
            max_clones_per_pc: 8,
            max_blocks: 65536,
            stack_depth_limit: crate::stack::STACK_DEPTH_LIMIT,
            remove_unreachable: false,
            die_on_empty_pop: false,
            merge_unreachable: false,
            strict: false,
        }
    }
}

/// Error returned by [`Config::apply_override`] for an unknown key or a
/// value that doesn't parse for that key's type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnknownKey(String),
    InvalidValue { key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownKey(key) => write!(f, "unknown config key `{key}`"),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for config key `{key}`")
            }
        }
    }
}
impl std::error::Error for ConfigError {}

impl Config {
    /// Apply a single `KEY=VALUE`-style override, as a driver-side config
    /// file or `-c` flag parser would, one key at a time.
    pub fn apply_override(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
            value.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            })
        }
        fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
            match value {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                }),
            }
        }
        match key {
            "set_max" => self.set_max = parse_usize(key, value)?,
            "widen_threshold" => self.widen_threshold = parse_usize(key, value)?,
            "max_clones_per_pc" => self.max_clones_per_pc = parse_usize(key, value)?,
            "max_blocks" => self.max_blocks = parse_usize(key, value)?,
            "stack_depth_limit" => self.stack_depth_limit = parse_usize(key, value)?,
            "remove_unreachable" => self.remove_unreachable = parse_bool(key, value)?,
            "die_on_empty_pop" => self.die_on_empty_pop = parse_bool(key, value)?,
            "merge_unreachable" => self.merge_unreachable = parse_bool(key, value)?,
            "strict" => self.strict = parse_bool(key, value)?,
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_known_keys() {
        let mut c = Config::default();
        c.apply_override("set_max", "20").unwrap();
        assert_eq!(c.set_max, 20);
        c.apply_override("strict", "true").unwrap();
        assert!(c.strict);
    }

    #[test]
    fn unknown_key_errors() {
        let mut c = Config::default();
        assert!(matches!(
            c.apply_override("nonesuch", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn bad_value_errors() {
        let mut c = Config::default();
        assert!(matches!(
            c.apply_override("set_max", "abc"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
