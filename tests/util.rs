//! Shared helpers for the bridge integration tests.
//!
//! The native and plugin tests exercise real shared-library images: the demo
//! crates under `demos/` are built on demand through cargo and loaded from
//! the workspace target directory.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::Command;

/// Builds a demo workspace member and returns the path to its cdylib.
pub fn demo_artifact(package: &str) -> PathBuf {
    let output = Command::new("cargo")
        .arg("build")
        .arg("-p")
        .arg(package)
        .current_dir(workspace_root())
        .output()
        .expect("failed to run cargo");
    assert!(
        output.status.success(),
        "cargo build -p {} failed:\n{}",
        package,
        String::from_utf8_lossy(&output.stderr)
    );

    let file = format!(
        "{}{}{}",
        std::env::consts::DLL_PREFIX,
        package,
        std::env::consts::DLL_SUFFIX
    );
    let path = target_dir().join(file);
    assert!(
        path.exists(),
        "expected demo artifact at {}",
        path.display()
    );
    path
}

pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn target_dir() -> PathBuf {
    std::env::var_os("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| workspace_root().join("target"))
        .join("debug")
}

/// Path of a file under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
    workspace_root().join("tests/fixtures").join(name)
}
