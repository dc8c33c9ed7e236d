// Injects SHARPMETRICS_VERSION from `git describe`, falling back to the
// package version when git or tags are unavailable.

use std::process::Command;

fn main() {
    let package = env!("CARGO_PKG_VERSION");
    let version = describe()
        .map(|described| version_from_describe(&described, package))
        .unwrap_or_else(|| package.to_string());

    println!("cargo:rustc-env=SHARPMETRICS_VERSION={}", version);
    for watched in [".git/HEAD", ".git/refs/heads", ".git/refs/tags"] {
        println!("cargo:rerun-if-changed={}", watched);
    }
}

fn describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    Some(text.trim().to_string())
}

/// `v1.2.0` and `v1.2.0-3-gabc` give `1.2.0`; an untagged `abc123[-dirty]`
/// is appended to the package version.
fn version_from_describe(described: &str, package: &str) -> String {
    match described.strip_prefix('v') {
        Some(tagged) => tagged.split('-').next().unwrap_or(tagged).to_string(),
        None => format!("{}-{}", package, described),
    }
}
