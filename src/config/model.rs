// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::LaunchModeSetting;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// script_launch_mode = "both"
/// hide_run_results = false
///
/// [interpreters]
/// py = ["python3", "-X", "utf8"]
/// rb = ["ruby"]
/// ```
///
/// Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    /// `"inprocess"`, `"subprocess"` or `"both"`.
    #[serde(default)]
    pub script_launch_mode: Option<LaunchModeSetting>,

    /// Disable automatic printing of run results.
    #[serde(default)]
    pub hide_run_results: bool,

    /// Script file extension (without the dot) to the argv prefix used to run
    /// non-executable script files in subprocess mode.
    #[serde(default)]
    pub interpreters: BTreeMap<String, Vec<String>>,
}

/// Validated configuration with built-in interpreters merged in.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub script_launch_mode: Option<LaunchModeSetting>,
    pub hide_run_results: bool,
    pub interpreters: BTreeMap<String, Vec<String>>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        script_launch_mode: Option<LaunchModeSetting>,
        hide_run_results: bool,
        interpreters: BTreeMap<String, Vec<String>>,
    ) -> Self {
        let mut merged = default_interpreters();
        merged.extend(interpreters);
        Self {
            script_launch_mode,
            hide_run_results,
            interpreters: merged,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(None, false, BTreeMap::new())
    }
}

/// Interpreters known without any configuration.
pub fn default_interpreters() -> BTreeMap<String, Vec<String>> {
    let mut map = BTreeMap::new();
    map.insert("py".to_string(), vec!["python3".to_string()]);
    map.insert("sh".to_string(), vec!["sh".to_string()]);
    map
}

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::ScriptError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_interpreters(&raw.interpreters)?;
        Ok(ConfigFile::new_unchecked(
            raw.script_launch_mode,
            raw.hide_run_results,
            raw.interpreters,
        ))
    }
}

fn validate_interpreters(
    interpreters: &BTreeMap<String, Vec<String>>,
) -> crate::errors::Result<()> {
    use crate::errors::ScriptError;

    for (ext, argv) in interpreters {
        if ext.is_empty() || ext.starts_with('.') {
            return Err(ScriptError::ConfigError(format!(
                "[interpreters] key '{ext}' must be a bare extension like \"py\""
            )));
        }
        if argv.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(ScriptError::ConfigError(format!(
                "[interpreters].{ext} must name a program"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ScriptError;

    #[test]
    fn defaults_include_builtin_interpreters() {
        let cfg = ConfigFile::default();
        assert_eq!(cfg.interpreters["sh"], vec!["sh".to_string()]);
        assert!(cfg.script_launch_mode.is_none());
        assert!(!cfg.hide_run_results);
    }

    #[test]
    fn configured_interpreter_overrides_builtin() {
        let raw: RawConfigFile = toml::from_str(
            r#"
[interpreters]
py = ["python3.12", "-u"]
"#,
        )
        .unwrap();
        let cfg = ConfigFile::try_from(raw).unwrap();
        assert_eq!(cfg.interpreters["py"], vec!["python3.12", "-u"]);
        assert!(cfg.interpreters.contains_key("sh"));
    }

    #[test]
    fn dotted_extension_is_rejected() {
        let raw: RawConfigFile = toml::from_str(
            r#"
[interpreters]
".py" = ["python3"]
"#,
        )
        .unwrap();
        match ConfigFile::try_from(raw) {
            Err(ScriptError::ConfigError(msg)) => assert!(msg.contains(".py")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn empty_interpreter_is_rejected() {
        let raw: RawConfigFile = toml::from_str("[interpreters]\nrb = []\n").unwrap();
        assert!(matches!(
            ConfigFile::try_from(raw),
            Err(ScriptError::ConfigError(_))
        ));
    }
}
