//! Detection of local development URLs the hosted rendering API cannot
//! reach, so callers get an immediate error instead of an opaque remote
//! failure.

use url::Url;

const LOCAL_HOST_LABELS: [&str; 3] = ["ddev", "test", "nitro"];

/// Whether `raw` points at a local development environment.
///
/// A string that fails URL validation is reported as *not* local and is
/// allowed through to fail remotely; callers rely on that asymmetry.
pub fn is_local_url(raw: &str) -> bool {
    let Ok(parsed) = Url::parse(raw) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };

    if host.contains("localhost") {
        return true;
    }

    // Label equality anywhere in the host, not a suffix check: this makes
    // `myproject.ddev.site` local, but also flags hosts with a
    // local-looking label in a non-final position, e.g. `test.example.com`.
    host.split('.')
        .any(|label| LOCAL_HOST_LABELS.contains(&label))
}
