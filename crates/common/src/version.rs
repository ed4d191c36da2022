use std::fmt;

/// Build metadata captured by `build.rs` at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    pub package: &'static str,
    pub version: &'static str,
    pub repo_version: &'static str,
    pub profile: &'static str,
    pub target: &'static str,
    pub timestamp: &'static str,
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}, {} build for {}, built {})",
            self.package, self.version, self.repo_version, self.profile, self.target, self.timestamp
        )
    }
}

/// Expand to the [`BuildInfo`] of the `common` crate.
#[macro_export]
macro_rules! build_info {
    () => {
        $crate::version::BUILD_INFO
    };
}

pub const BUILD_INFO: BuildInfo = BuildInfo {
    package: env!("CARGO_PKG_NAME"),
    version: env!("CARGO_PKG_VERSION"),
    repo_version: env!("REPO_VERSION"),
    profile: env!("BUILD_PROFILE"),
    target: env!("BUILD_TARGET"),
    timestamp: env!("BUILD_TIMESTAMP"),
};
