//! Build script for vdp-ps
//!
//! Same build identification as the catalog service: `VDP_GIT_HASH`,
//! `VDP_BUILD_TIMESTAMP` and `VDP_BUILD_PROFILE`, logged at startup.

use std::process::Command;

fn main() {
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .filter(|hash| !hash.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    let build_timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=VDP_GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=VDP_BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=VDP_BUILD_PROFILE={}", profile);
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=src");
}
