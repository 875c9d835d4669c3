//! Build script for autoretest: embeds a human-readable version string.
//!
//! `BUILD_INFO_HUMAN` is `<crate version> (<git version>) <rustc version>`.
//! The git version is `git describe --tags --always --dirty` when a tag is
//! reachable, otherwise `v<crate version>-<timestamp>-<short sha>[+dirty]`.
//! Clean trees use the commit time so the same commit builds the same
//! string; dirty trees and builds without git use the build time.

use std::{env, process::Command};

use chrono::{DateTime, Utc};

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

fn main() {
    for path in ["src", "build.rs", "Cargo.toml", "Cargo.lock"] {
        println!("cargo:rerun-if-changed={path}");
    }

    println!("cargo:rustc-env=BUILD_INFO_HUMAN={}", build_info());
}

fn run(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// `cargo install --git` drops a .cargo-ok marker into the checkout.
fn is_dirty() -> Option<bool> {
    run("git", &["status", "--porcelain"]).map(|status| {
        status
            .lines()
            .any(|line| line.get(3..).is_some_and(|path| path != ".cargo-ok"))
    })
}

fn pseudo_version() -> String {
    let version = env!("CARGO_PKG_VERSION");
    let sha = run("git", &["rev-parse", "--short=12", "HEAD"]).unwrap_or_else(|| "unknown".into());
    let dirty = is_dirty();

    let timestamp = match dirty {
        Some(false) => run("git", &["log", "-1", "--format=%ct"])
            .and_then(|s| s.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
    .unwrap_or_else(Utc::now)
    .format(TIMESTAMP_FORMAT);

    let suffix = if dirty == Some(true) { "+dirty" } else { "" };
    format!("v{version}-{timestamp}-{sha}{suffix}")
}

fn git_version() -> String {
    match run("git", &["describe", "--tags", "--always", "--dirty"]) {
        Some(desc) if desc.contains('v') || desc.contains("-g") => desc,
        _ => pseudo_version(),
    }
}

fn build_info() -> String {
    let mut parts = vec![
        env!("CARGO_PKG_VERSION").to_string(),
        format!("({})", git_version()),
    ];
    parts.extend(run("rustc", &["--version"]));
    parts.join(" ")
}
