/// Which protector set a realm consults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProtectorScope {
    /// The process-wide set shared by every realm.
    #[default]
    Global,
    /// A private set, so invalidations stay local to one realm.
    Isolated,
}

#[derive(Clone, Debug)]
pub struct EngineOptions {
    pub protector_scope: ProtectorScope,
    /// When false the realm starts with a private, fully invalidated
    /// protector set, whatever `protector_scope` says.
    pub fast_paths: bool,
    /// Maximum number of jobs a single `run_jobs` call may execute.
    pub job_limit: Option<usize>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            protector_scope: ProtectorScope::Global,
            fast_paths: true,
            job_limit: None,
        }
    }
}

impl EngineOptions {
    pub fn isolated() -> Self {
        Self::default().with_protector_scope(ProtectorScope::Isolated)
    }

    pub fn with_protector_scope(mut self, scope: ProtectorScope) -> Self {
        self.protector_scope = scope;
        self
    }

    pub fn with_fast_paths(mut self, enabled: bool) -> Self {
        self.fast_paths = enabled;
        self
    }

    pub fn with_job_limit(mut self, limit: Option<usize>) -> Self {
        self.job_limit = limit;
        self
    }
}
