pub const RUN_MODE_PACKAGED: &str = "packaged";
pub const RUN_MODE_DEVELOPMENT: &str = "development";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Packaged,
    Development,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Packaged => RUN_MODE_PACKAGED,
            Self::Development => RUN_MODE_DEVELOPMENT,
        }
    }

    pub fn build_default() -> Self {
        if cfg!(debug_assertions) {
            Self::Development
        } else {
            Self::Packaged
        }
    }
}

pub fn resolve_run_mode(raw_mode: Option<&str>, env_name: &str) -> (RunMode, Option<String>) {
    let fallback = RunMode::build_default();
    let Some(raw_mode) = raw_mode else {
        return (fallback, None);
    };
    let normalized = raw_mode.trim();
    if normalized.eq_ignore_ascii_case(RUN_MODE_PACKAGED) {
        return (
            RunMode::Packaged,
            Some("run mode forced to packaged by env".to_string()),
        );
    }
    if normalized.eq_ignore_ascii_case(RUN_MODE_DEVELOPMENT) {
        return (
            RunMode::Development,
            Some("run mode forced to development by env".to_string()),
        );
    }
    if normalized.is_empty() {
        return (fallback, None);
    }
    (
        fallback,
        Some(format!(
            "invalid run mode in {env_name}: {normalized}, fallback to {}",
            fallback.as_str()
        )),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_run_mode_accepts_known_values_case_insensitive() {
        let (mode, message) = resolve_run_mode(Some("Packaged"), "TEST_ENV");
        assert_eq!(mode, RunMode::Packaged);
        assert!(message
            .expect("expected packaged env message")
            .contains("forced to packaged"));

        let (mode, _) = resolve_run_mode(Some(" DEVELOPMENT "), "TEST_ENV");
        assert_eq!(mode, RunMode::Development);
    }

    #[test]
    fn resolve_run_mode_rejects_unknown_values() {
        let (mode, message) = resolve_run_mode(Some("staging"), "TEST_ENV");
        assert_eq!(mode, RunMode::build_default());
        assert!(message
            .expect("expected invalid env warning")
            .contains("invalid run mode in TEST_ENV"));
    }

    #[test]
    fn resolve_run_mode_without_env_uses_build_default() {
        assert_eq!(resolve_run_mode(None, "TEST_ENV"), (RunMode::build_default(), None));
    }
}
