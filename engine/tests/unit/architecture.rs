//! Structural tests for architectural boundary enforcement.
//!
//! These tests scan source files to verify that the layer boundaries hold:
//! the domain stays pure, the application layer never reaches into infra.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Read a file and strip comment lines to avoid false positives.
fn read_non_comment_lines(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .filter(|l| {
            let trimmed = l.trim();
            !trimmed.starts_with("//") && !trimmed.starts_with("/*") && !trimmed.starts_with('*')
        })
        .map(String::from)
        .collect()
}

/// Report every non-comment line under `src/<layer>` containing a forbidden pattern.
fn forbidden_in(layer: &[&str], forbidden: &[&str]) -> Vec<String> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let dir = layer.iter().fold(root.join("src"), |dir, part| dir.join(part));

    let mut violations = Vec::new();
    for file in collect_rs_files(&dir) {
        let rel = file
            .strip_prefix(root)
            .unwrap_or(&file)
            .display()
            .to_string();
        for (i, line) in read_non_comment_lines(&file).iter().enumerate() {
            for pattern in forbidden {
                if line.contains(pattern) {
                    violations.push(format!("{rel}:{}: `{pattern}`: {line}", i + 1));
                }
            }
        }
    }
    violations
}

#[test]
fn domain_has_no_outward_imports_or_io() {
    let violations = forbidden_in(
        &["domain"],
        &[
            "crate::infra",
            "crate::application",
            "tokio::",
            "std::fs",
            "std::process",
            "std::net",
        ],
    );
    assert!(
        violations.is_empty(),
        "Found forbidden imports in domain/; the domain layer must stay pure:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_has_no_infra_imports() {
    let violations = forbidden_in(&["application"], &["crate::infra", "std::fs"]);
    assert!(
        violations.is_empty(),
        "Found infra imports in application/; depend on port traits instead:\n{}",
        violations.join("\n")
    );
}

#[test]
fn services_depend_on_ports_not_concrete_gateways() {
    let violations = forbidden_in(
        &["application", "services"],
        &["CfGateway", "SimulatedPlatform", "SystemClock", "LocalArtifactSource"],
    );
    assert!(
        violations.is_empty(),
        "Found concrete adapter types in application services; use trait bounds instead:\n{}",
        violations.join("\n")
    );
}

#[test]
fn only_the_session_guard_logs_out() {
    let violations: Vec<String> = forbidden_in(&["infra"], &[".logout()"])
        .into_iter()
        .filter(|v| !v.contains("session.rs"))
        .collect();
    assert!(
        violations.is_empty(),
        "Found logout calls outside the session guard:\n{}",
        violations.join("\n")
    );
}
