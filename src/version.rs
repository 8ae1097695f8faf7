//! Build identification, embedded by `vergen-gitcl` at compile time.

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

const GIT_BRANCH: Option<&str> = option_env!("VERGEN_GIT_BRANCH");
const GIT_SHA: Option<&str> = option_env!("VERGEN_GIT_SHA");

/// Short git commit the binary was built from.
///
/// `None` when the crate was built outside a git checkout (vergen then
/// emits placeholder values instead of a hex digest).
pub fn git_sha() -> Option<&'static str> {
    GIT_SHA
        .filter(|sha| sha.len() >= 7 && sha.chars().all(|c| c.is_ascii_hexdigit()))
        .map(|sha| &sha[..7])
}

fn git_dirty() -> bool {
    option_env!("VERGEN_GIT_DIRTY") == Some("true")
}

/// Version reported in logs and health probes.
///
/// `{version}` for builds without git metadata, otherwise
/// `{version}+{branch}.{sha}` with a `.dirty` suffix for unclean trees.
pub fn version_string() -> String {
    match (git_sha(), GIT_BRANCH) {
        (Some(sha), Some(branch)) => {
            let dirty_suffix = if git_dirty() { ".dirty" } else { "" };
            format!("{PKG_VERSION}+{branch}.{sha}{dirty_suffix}")
        }
        _ => PKG_VERSION.to_string(),
    }
}
