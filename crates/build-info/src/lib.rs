//! Build metadata stamped by `build.rs`, used for the startup banner.

use once_cell::sync::Lazy;

#[cfg(test)]
mod git_dir;

const UNKNOWN_TIME: &str = "unknown time";
const UNKNOWN_GIT: &str = "unknown git";

#[derive(Debug)]
struct BuildMeta {
    built_at: &'static str,
    git_label: &'static str,
}

impl BuildMeta {
    fn collect() -> Self {
        Self {
            built_at: option_env!("GEOTRAIL_BUILD_TIME").unwrap_or(UNKNOWN_TIME),
            git_label: option_env!("GEOTRAIL_BUILD_GIT").unwrap_or(UNKNOWN_GIT),
        }
    }
}

static META: Lazy<BuildMeta> = Lazy::new(BuildMeta::collect);

/// UTC time of the build, e.g. "2025-10-05 15:47:12 UTC".
pub fn build_timestamp() -> &'static str {
    META.built_at
}

/// `git describe` output at build time, or "unknown git" when it is unavailable.
pub fn git_label() -> &'static str {
    META.git_label
}

/// One-line banner such as `geotrail-server 0.1.0 | 2025-10-05 15:47:12 UTC | v0.1.0-3-gabc123`.
pub fn formatted_banner(package: &str, version: &str) -> String {
    format!(
        "{} {} | {} | {}",
        package,
        version,
        build_timestamp(),
        git_label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_starts_with_package_and_version() {
        let banner = formatted_banner("geotrail-server", "1.2.3");
        assert!(banner.starts_with("geotrail-server 1.2.3 | "));
        assert!(banner.ends_with(git_label()));
        assert!(banner.contains(build_timestamp()));
    }

    #[test]
    fn git_label_is_describe_output_or_unknown_git() {
        let label = git_label();
        assert!(!label.is_empty());
        assert_ne!(label, "unknown");
        if label.starts_with("unknown") {
            assert_eq!(label, UNKNOWN_GIT);
        }
    }
}
