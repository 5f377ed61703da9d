#![allow(clippy::doc_markdown)] // Generated file contains OPT_LEVEL without backticks

use std::sync::LazyLock;

include!(concat!(env!("OUT_DIR"), "/built.rs"));

/// Version string: the package version, suffixed with the git commit hash and a
/// `-dirty` marker when built from a modified checkout.
pub static VERSION: LazyLock<String> = LazyLock::new(|| {
    let prefix = match GIT_COMMIT_HASH_SHORT {
        Some(hash) => format!("{PKG_VERSION}-{hash}"),
        None => PKG_VERSION.to_string(),
    };
    let suffix = match GIT_DIRTY {
        Some(true) => "-dirty",
        _ => "",
    };
    format!("{prefix}{suffix}")
});
