//! UI context for detecting interactive vs CI environments

use std::io::IsTerminal;

/// CI systems that set an environment marker
const CI_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "JENKINS_URL",
    "BUILDKITE",
    "TEAMCITY_VERSION",
    "TF_BUILD",
];

/// UI context that determines output behavior
#[derive(Debug, Clone, Copy)]
pub struct UiContext {
    interactive: bool,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        Self {
            interactive: std::io::stdout().is_terminal()
                && !CI_VARS.iter().any(|var| std::env::var_os(var).is_some()),
        }
    }

    /// Create a non-interactive context (for testing or explicit CI mode)
    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }

    /// Whether spinners and colors should be used
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}
