use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::Utc;

#[path = "src/git_dir.rs"]
mod git_dir;

const UNKNOWN_GIT: &str = "unknown git";

fn main() {
    println!("cargo:rerun-if-env-changed=GEOTRAIL_BUILD_TIME_OVERRIDE");

    let manifest_dir = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    if let Some(git) = git_dir::find_git_dir(&manifest_dir) {
        println!("cargo:rerun-if-changed={}", git.join("HEAD").display());
        if let Some(reference) = git_dir::head_ref_path(&git) {
            println!("cargo:rerun-if-changed={}", reference.display());
        }
    }

    let build_time = env::var("GEOTRAIL_BUILD_TIME_OVERRIDE")
        .unwrap_or_else(|_| Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string());
    let git_label = git_describe(&manifest_dir).unwrap_or_else(|| UNKNOWN_GIT.to_string());

    println!("cargo:rustc-env=GEOTRAIL_BUILD_TIME={}", build_time);
    println!("cargo:rustc-env=GEOTRAIL_BUILD_GIT={}", git_label);
}

fn git_describe(dir: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--dirty", "--always"])
        .current_dir(dir)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let label = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!label.is_empty()).then_some(label)
}
