use std::fs;
use std::path::{Path, PathBuf};

fn rs_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().and_then(|s| s.to_str()) == Some("rs") {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}

fn rel(path: &Path) -> String {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let rel = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string();
    rel.replace('\\', "/")
}

#[test]
fn only_collector_kill_and_process_touch_sysinfo() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let allowed = [
        "src/system/collector.rs",
        "src/system/kill.rs",
        "src/system/process.rs",
    ];
    let mut violations = Vec::new();

    for file in rs_files(&root) {
        let rel_path = rel(&file);
        let content = fs::read_to_string(&file).unwrap_or_default();
        if content.contains("sysinfo::") && !allowed.contains(&rel_path.as_str()) {
            violations.push(format!("{rel_path} uses sysinfo directly"));
        }
    }

    assert!(
        violations.is_empty(),
        "sysinfo boundary violations:\n{}",
        violations.join("\n")
    );
}

#[test]
fn derivation_modules_are_pure() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("src/system");
    let mut violations = Vec::new();

    for name in ["rate.rs", "history.rs", "query.rs"] {
        let file = root.join(name);
        let content = fs::read_to_string(&file).unwrap_or_default();
        for forbidden in ["tokio", "std::thread", "collector", "Mutex"] {
            if content.contains(forbidden) {
                violations.push(format!(
                    "{} references forbidden dependency `{}`",
                    rel(&file),
                    forbidden
                ));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Purity violations:\n{}",
        violations.join("\n")
    );
}

#[test]
fn library_does_not_print() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let mut violations = Vec::new();

    for file in rs_files(&root) {
        let rel_path = rel(&file);
        if rel_path == "src/main.rs" {
            continue;
        }
        let content = fs::read_to_string(&file).unwrap_or_default();
        if content.contains("println!") || content.contains("eprintln!") {
            violations.push(format!("{rel_path} prints instead of logging"));
        }
    }

    assert!(
        violations.is_empty(),
        "Print violations:\n{}",
        violations.join("\n")
    );
}

#[test]
fn no_target_os_cfg() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let mut violations = Vec::new();

    for file in rs_files(&root) {
        let content = fs::read_to_string(&file).unwrap_or_default();
        if content.contains("target_os") {
            violations.push(format!("{} contains `target_os` cfg", rel(&file)));
        }
    }

    assert!(
        violations.is_empty(),
        "Unexpected target_os cfg usage:\n{}",
        violations.join("\n")
    );
}
