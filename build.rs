use std::path::{Path, PathBuf};
use std::process::Command;

const MAX_LINES: usize = 750;

const CHECKED_EXTENSIONS: &[&str] = &["rs", "md", "yaml", "toml"];

const EXCLUDED_DIRS: &[&str] = &["target", ".git", "examples"];

const EXCLUDED_FILES: &[&str] = &["Cargo.lock"];

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/main");

    let sha = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=CONTENTQ_GIT_SHA={}", sha);

    let root = PathBuf::from(
        std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set"),
    );
    let files = collect_files_to_check(&root);
    for file in &files {
        println!("cargo:rerun-if-changed={}", file.display());
    }

    let rust_files: Vec<&PathBuf> = files
        .iter()
        .filter(|p| {
            p.extension().and_then(|e| e.to_str()) == Some("rs")
                && p.file_name().and_then(|n| n.to_str()) != Some("build.rs")
        })
        .collect();

    enforce_line_limits(&root, &files);
    enforce_no_dead_code_allows(&root, &rust_files);
    enforce_test_hygiene(&root, &rust_files);
}

fn collect_files_to_check(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    walk_directory(root, root, &mut files);
    files.sort();
    files
}

fn walk_directory(dir: &Path, root: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

        if path.is_dir() {
            if !EXCLUDED_DIRS.contains(&name) {
                walk_directory(&path, root, files);
            }
            continue;
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let rel = path.strip_prefix(root).unwrap_or(&path).to_string_lossy();
        if CHECKED_EXTENSIONS.contains(&ext) && !EXCLUDED_FILES.contains(&&*rel) {
            files.push(path.clone());
        }
    }
}

fn report(title: &str, root: &Path, violations: &[(PathBuf, usize, String)], advice: &[&str]) {
    eprintln!("\n========================================");
    eprintln!("{}", title);
    eprintln!("========================================");
    for (path, line, message) in violations {
        let rel = path.strip_prefix(root).unwrap_or(path);
        eprintln!("  {}:{}", rel.display(), line);
        eprintln!("    {}", message);
    }
    eprintln!("========================================");
    for line in advice {
        eprintln!("{}", line);
    }
    eprintln!();
    panic!("Build failed: {} ({} found)", title, violations.len());
}

fn enforce_line_limits(root: &Path, files: &[PathBuf]) {
    let mut violations = Vec::new();
    for file in files {
        match std::fs::read_to_string(file) {
            Ok(content) => {
                let count = content.lines().filter(|l| !l.trim().is_empty()).count();
                if count > MAX_LINES {
                    violations.push((
                        file.clone(),
                        count,
                        format!("{} lines (exceeds by {})", count, count - MAX_LINES),
                    ));
                }
            }
            Err(e) => println!("cargo:warning=Could not read file {}: {}", file.display(), e),
        }
    }

    if !violations.is_empty() {
        report(
            &format!("FILE LINE LIMIT EXCEEDED (max {} lines)", MAX_LINES),
            root,
            &violations,
            &["Please split these files into smaller modules."],
        );
    }
}

fn enforce_no_dead_code_allows(root: &Path, rust_files: &[&PathBuf]) {
    let mut violations = Vec::new();
    for file in rust_files {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue;
        };
        for (i, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if (trimmed.starts_with("#[allow(") || trimmed.starts_with("#![allow("))
                && trimmed.contains("dead_code")
            {
                violations.push(((*file).clone(), i + 1, trimmed.to_string()));
            }
        }
    }

    if !violations.is_empty() {
        report(
            "#[allow(dead_code)] IS NOT ALLOWED",
            root,
            &violations,
            &[
                "DELETE unused code entirely.",
                "If the code is for tests, use #[cfg(test)].",
            ],
        );
    }
}

/// Bans silent test skips and env mutations outside `#[serial]` tests.
fn enforce_test_hygiene(root: &Path, rust_files: &[&PathBuf]) {
    let skip_patterns = ["Skipping test", "skipping test", "Test skipped", "test skipped"];
    let mut violations = Vec::new();

    for file in rust_files {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue;
        };

        let mut in_test_fn = false;
        let mut has_serial = false;
        let mut pending_serial = false;
        let mut test_fn_start = 0;
        let mut brace_depth: i32 = 0;

        for (i, line) in content.lines().enumerate() {
            let trimmed = line.trim();

            if trimmed == "#[serial]" || trimmed == "#[serial_test::serial]" {
                pending_serial = true;
                has_serial = in_test_fn || has_serial;
            }
            if !in_test_fn && (trimmed == "#[test]" || trimmed.starts_with("#[tokio::test")) {
                in_test_fn = true;
                has_serial = pending_serial;
                test_fn_start = i + 1;
                brace_depth = 0;
            }
            if !in_test_fn {
                continue;
            }
            if trimmed == "#[serial]" || trimmed == "#[serial_test::serial]" {
                has_serial = true;
            }

            let mut opened = false;
            for c in line.chars() {
                match c {
                    '{' => {
                        brace_depth += 1;
                        opened = true;
                    }
                    '}' => brace_depth -= 1,
                    _ => {}
                }
            }

            if let Some(pattern) = skip_patterns.iter().find(|p| line.contains(*p)) {
                violations.push((
                    (*file).clone(),
                    test_fn_start,
                    format!("test contains skip pattern: {}", pattern),
                ));
            }
            if trimmed == "return;" && brace_depth > 1 {
                violations.push((
                    (*file).clone(),
                    test_fn_start,
                    "test has conditional early return (silent skip)".to_string(),
                ));
            }
            if !has_serial
                && !trimmed.starts_with("//")
                && (trimmed.contains("env::set_var") || trimmed.contains("env::remove_var"))
            {
                violations.push((
                    (*file).clone(),
                    test_fn_start,
                    "test mutates env without #[serial]".to_string(),
                ));
            }

            if brace_depth <= 0 && (opened || trimmed.ends_with('}')) {
                in_test_fn = false;
                has_serial = false;
                pending_serial = false;
            }
        }
    }

    if !violations.is_empty() {
        report(
            "TEST HYGIENE CHECK FAILED",
            root,
            &violations,
            &[
                "Tests must FAIL if they cannot run, not silently pass.",
                "Tests that mutate environment variables need #[serial].",
            ],
        );
    }
}
