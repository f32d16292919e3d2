// ABOUTME: Problems a deploy run survived, such as a failed rsync under the warn policy.
// ABOUTME: The remote build records them; the deploy command prints them once the run ends.

/// Warnings gathered over one `hoist deploy` run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Keep `warning` for the end-of-run summary. It is also logged at warn level.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn has(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

/// One survived problem and the text shown for it.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn sync_failed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SyncFailed,
            message: message.into(),
        }
    }

    pub fn proxy_failed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ProxyFailed,
            message: message.into(),
        }
    }
}

/// What went wrong, for callers that react to a specific problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// rsync to the builder failed and the build ran on the tree it already had.
    SyncFailed,
    /// The 8873 forward died with an error while the build was running.
    ProxyFailed,
}
