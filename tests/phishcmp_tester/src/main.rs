use serde_json::Value;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

const REPORT_KEYS: [&str; 10] = [
    "real_domain",
    "suspect_domain",
    "domain_similarity",
    "url_findings",
    "text_similarity",
    "visual_similarity",
    "real_screenshot",
    "suspect_screenshot",
    "diff_image",
    "phishing_likely",
];

fn find_phishcmp_binary() -> PathBuf {
    // Priority: PHISHCMP_BIN env var
    if let Ok(path) = env::var("PHISHCMP_BIN") {
        let p = PathBuf::from(path);
        if p.is_file() {
            return p;
        }
    }

    let candidates = [
        "../../target/release/phishcmp",
        "../../target/debug/phishcmp",
        "../target/release/phishcmp",
        "../target/debug/phishcmp",
        "./target/release/phishcmp",
        "./target/debug/phishcmp",
    ];

    for cand in candidates {
        let p = PathBuf::from(cand);
        if p.is_file() {
            // runs happen in a scratch directory, so make it absolute
            return p.canonicalize().unwrap_or(p);
        }
    }

    if let Ok(paths) = env::var("PATH") {
        for dir in paths.split(':') {
            let mut p = PathBuf::from(dir);
            p.push("phishcmp");
            if p.is_file() {
                return p;
            }
        }
    }

    panic!("Unable to locate phishcmp binary. Set PHISHCMP_BIN env var to the path of ./target/release/phishcmp.");
}

/// Scratch directory so result files and screenshots do not litter the repo
fn scratch_dir(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("phishcmp_tester-{}-{}", std::process::id(), name));
    std::fs::create_dir_all(&dir).expect("failed to create scratch dir");
    dir
}

fn run_phishcmp(args: &[&str], cwd: &Path) -> (i32, String, String) {
    let bin = find_phishcmp_binary();

    let mut full_args: Vec<String> = env::var("PHISHCMP_ARGS")
        .map(|extra| extra.split_whitespace().map(String::from).collect())
        .unwrap_or_default();
    full_args.extend(args.iter().map(|a| a.to_string()));

    let output = Command::new(bin)
        .args(&full_args)
        .current_dir(cwd)
        .output()
        .expect("failed to execute phishcmp");

    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (code, stdout, stderr)
}

fn parse_report(stdout: &str) -> Result<Value, String> {
    serde_json::from_str(stdout).map_err(|e| format!("stdout is not a JSON report: {}", e))
}

fn assert_report_shape(report: &Value) -> Result<(), String> {
    let object = report.as_object().ok_or("report is not a JSON object")?;
    for key in REPORT_KEYS {
        if !object.contains_key(key) {
            return Err(format!("missing key '{}'", key));
        }
    }
    for key in ["domain_similarity", "text_similarity", "visual_similarity"] {
        let score = report[key].as_f64().ok_or(format!("'{}' is not a number", key))?;
        if !(0.0..=1.0).contains(&score) {
            return Err(format!("'{}' = {} is outside [0, 1]", key, score));
        }
    }
    Ok(())
}

fn findings(report: &Value) -> Vec<String> {
    report["url_findings"]
        .as_array()
        .map(|items| items.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default()
}

fn test_usage_on_missing_argument() -> Result<(), String> {
    let dir = scratch_dir("usage");
    let (code, stdout, stderr) = run_phishcmp(&["https://paypal.com"], &dir);
    if code != 1 {
        return Err(format!("expected exit code 1, got {}", code));
    }
    if !stdout.is_empty() || !stderr.contains("Usage") {
        return Err("expected usage on stderr only".to_string());
    }
    Ok(())
}

fn test_identical_sites() -> Result<(), String> {
    let dir = scratch_dir("identical");
    let (code, stdout, _stderr) = run_phishcmp(&["https://example.com", "https://example.com"], &dir);
    if code != 0 {
        return Err(format!("expected exit code 0, got {}", code));
    }
    let report = parse_report(&stdout)?;
    assert_report_shape(&report)?;
    if report["domain_similarity"].as_f64() != Some(1.0) {
        return Err("identical domains should score 1.0".to_string());
    }
    if findings(&report) != ["No major URL issues"] {
        return Err(format!("unexpected findings {:?}", findings(&report)));
    }
    if report["phishing_likely"] != Value::Bool(false) {
        return Err("identical sites flagged as phishing".to_string());
    }
    Ok(())
}

fn test_combosquat_is_mismatch() -> Result<(), String> {
    let dir = scratch_dir("combosquat");
    let (code, stdout, _stderr) = run_phishcmp(&["paypal.com", "paypal.secure-login-support.com"], &dir);
    if code != 0 {
        return Err(format!("expected exit code 0, got {}", code));
    }
    let report = parse_report(&stdout)?;
    assert_report_shape(&report)?;
    if report["suspect_domain"] != "secure-login-support.com" {
        return Err(format!("unexpected suspect domain {}", report["suspect_domain"]));
    }
    if !findings(&report).iter().any(|f| f == "Domain mismatch") {
        return Err("expected 'Domain mismatch'".to_string());
    }
    Ok(())
}

fn test_result_file_written() -> Result<(), String> {
    let dir = scratch_dir("result-file");
    let (code, stdout, stderr) = run_phishcmp(&["https://example.com", "https://example.org"], &dir);
    if code != 0 {
        return Err(format!("expected exit code 0, got {}", code));
    }
    let saved = std::fs::read_dir(&dir)
        .map_err(|e| e.to_string())?
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_name().to_string_lossy().starts_with("result_"))
        .ok_or("no result_<timestamp>.json written")?;
    let contents = std::fs::read_to_string(saved.path()).map_err(|e| e.to_string())?;
    if contents.trim() != stdout.trim() {
        return Err("saved result differs from stdout".to_string());
    }
    if !stderr.contains("JSON result saved as") {
        return Err("missing save notice on stderr".to_string());
    }
    Ok(())
}

fn main() {
    let bin = find_phishcmp_binary();
    eprintln!("Using phishcmp binary: {}", bin.display());
    if !bin.is_file() {
        eprintln!("Binary not found. Set PHISHCMP_BIN to path of phishcmp or build it with 'cargo build --release' at repo root.");
        std::process::exit(2);
    }

    let mut failures: Vec<String> = Vec::new();

    let tests: Vec<(&str, fn() -> Result<(), String>)> = vec![
        ("usage on missing argument", test_usage_on_missing_argument),
        ("identical sites", test_identical_sites),
        ("combosquat is mismatch", test_combosquat_is_mismatch),
        ("result file written", test_result_file_written),
    ];

    for (name, f) in &tests {
        match f() {
            Ok(()) => println!("[PASS] {}", name),
            Err(err) => {
                println!("[FAIL] {} -> {}", name, err);
                failures.push(format!("{}: {}", name, err));
            }
        }
    }

    if failures.is_empty() {
        println!("\nAll tests passed");
        std::process::exit(0);
    } else {
        println!("\n{} test(s) failed:", failures.len());
        for f in &failures { println!(" - {}", f); }
        std::process::exit(1);
    }
}
