use std::fs;
use std::path::{Path, PathBuf};

fn collect_rs_files(dir: &Path, out: &mut Vec<PathBuf>) {
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                collect_rs_files(&path, out);
            } else if path.extension().and_then(|s| s.to_str()) == Some("rs") {
                out.push(path);
            }
        }
    }
}

#[test]
fn test_clock_and_blocking_sleep_stay_in_handlers() {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let repo_root = manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("repo root");

    let allowlist = ["crates/handover-effects", "crates/handover-testkit"];

    let patterns = [
        ("SystemTime::now", "Use PhysicalTimeEffects::now_ms instead of SystemTime::now"),
        ("thread::sleep", "Use PhysicalTimeEffects::sleep_ms instead of blocking sleeps"),
    ];

    let mut files = Vec::new();
    collect_rs_files(&repo_root.join("crates"), &mut files);

    let mut violations = Vec::new();
    for file in files {
        let rel = file.strip_prefix(repo_root).unwrap_or(&file);
        let rel_str = rel.to_string_lossy();

        if allowlist.iter().any(|prefix| rel_str.starts_with(prefix)) {
            continue;
        }

        let Ok(contents) = fs::read_to_string(&file) else {
            continue;
        };

        for (pattern, guidance) in patterns {
            if contents.contains(pattern) {
                violations.push(format!("{rel_str}: found '{pattern}' ({guidance})"));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Impure API usage detected:\n{}",
        violations.join("\n")
    );
}
