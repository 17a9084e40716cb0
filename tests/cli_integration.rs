//! CLI integration tests
//!
//! Tests the command-line interface end-to-end.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

const RECORDS_JSON: &str = r#"[
  {"name": "Main", "public_key": "pkMain", "private_key": "skMain"},
  {"name": "Generated Wallet", "public_key": "pkGen", "private_key": "c2tHZW4="}
]"#;

/// Run walletbox with passphrase from stdin
fn run_walletbox(args: &[&str], passphrase: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_walletbox"))
        .arg("--passphrase-stdin")
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn walletbox");

    {
        let mut stdin = child.stdin.take().expect("failed to open stdin");
        // Ignore BrokenPipe errors - the command may exit before reading stdin
        // if it encounters an error (e.g., file not found)
        let _ = stdin.write_all(passphrase.as_bytes());
    }

    child.wait_with_output().expect("failed to wait for walletbox")
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{} failed: {}",
        what,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Seals RECORDS_JSON into a fresh wallet file and returns its path.
fn sealed_wallet(temp_dir: &TempDir, passphrase: &str) -> PathBuf {
    let records = temp_dir.path().join("records.json");
    let wallet = temp_dir.path().join("wallets.solwallet");
    fs::write(&records, RECORDS_JSON).unwrap();

    let result = run_walletbox(
        &["seal", "-i", path_str(&records), "-o", path_str(&wallet)],
        passphrase,
    );
    assert_success(&result, "seal");
    wallet
}

fn list(wallet: &Path, passphrase: &str, show_secrets: bool) -> Output {
    let mut args = vec!["list", "-i", path_str(wallet)];
    if show_secrets {
        args.push("--show-secrets");
    }
    run_walletbox(&args, passphrase)
}

#[test]
fn test_seal_list_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let wallet = sealed_wallet(&temp_dir, "correct horse");

    let raw = fs::read(&wallet).unwrap();
    assert!(raw.len() > 32);
    assert_eq!((raw.len() - 32) % 16, 0);
    assert!(!String::from_utf8_lossy(&raw).contains("skMain"));

    let result = list(&wallet, "correct horse", false);
    assert_success(&result, "list");
    let stdout = String::from_utf8_lossy(&result.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "0\tMain\tpkMain\t********",
            "1\tGenerated Wallet\tpkGen\t********"
        ]
    );

    let result = list(&wallet, "correct horse", true);
    assert_success(&result, "list --show-secrets");
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("0\tMain\tpkMain\tskMain"));
    assert!(stdout.contains("1\tGenerated Wallet\tpkGen\tc2tHZW4="));
}

#[test]
fn test_seal_unseal_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let wallet = sealed_wallet(&temp_dir, "test");
    let exported = temp_dir.path().join("exported.json");

    let result = run_walletbox(
        &["unseal", "-i", path_str(&wallet), "-o", path_str(&exported)],
        "test",
    );
    assert_success(&result, "unseal");

    let original: serde_json::Value = serde_json::from_str(RECORDS_JSON).unwrap();
    let roundtripped: serde_json::Value =
        serde_json::from_slice(&fs::read(&exported).unwrap()).unwrap();
    assert_eq!(original, roundtripped);
}

#[test]
fn test_trailing_newline_in_passphrase_is_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let wallet = sealed_wallet(&temp_dir, "test\n");

    let result = list(&wallet, "test", false);
    assert_success(&result, "list");
}

#[test]
fn test_wrong_passphrase_and_corruption_look_the_same() {
    let temp_dir = TempDir::new().unwrap();
    let wallet = sealed_wallet(&temp_dir, "correct horse");

    let wrong = list(&wallet, "wrong horse", false);
    assert!(!wrong.status.success());
    assert!(wrong.stdout.is_empty());

    let truncated = temp_dir.path().join("truncated.solwallet");
    fs::write(&truncated, &fs::read(&wallet).unwrap()[..20]).unwrap();
    let short = list(&truncated, "correct horse", false);
    assert!(!short.status.success());

    let wrong_stderr = String::from_utf8_lossy(&wrong.stderr);
    let short_stderr = String::from_utf8_lossy(&short.stderr);
    let message = "decryption failed: wrong passphrase or corrupted file";
    assert!(wrong_stderr.contains(message), "got: {}", wrong_stderr);
    assert!(short_stderr.contains(message), "got: {}", short_stderr);

    // Only the file name differs between the two reports.
    let normalize = |stderr: &str, path: &Path| {
        let line = stderr
            .lines()
            .find(|l| l.starts_with("Error: "))
            .unwrap_or_default()
            .to_string();
        line.replace(path_str(path), "<wallet>")
    };
    assert_eq!(
        normalize(&wrong_stderr, &wallet),
        normalize(&short_stderr, &truncated)
    );
}

#[test]
fn test_init_then_append_and_remove() {
    let temp_dir = TempDir::new().unwrap();
    let wallet = temp_dir.path().join("new.solwallet");
    let records = temp_dir.path().join("records.json");
    fs::write(&records, RECORDS_JSON).unwrap();

    let result = run_walletbox(&["init", "-o", path_str(&wallet)], "test");
    assert_success(&result, "init");
    let result = list(&wallet, "test", false);
    assert_success(&result, "list");
    assert!(result.stdout.is_empty());

    let result = run_walletbox(
        &["append", "-i", path_str(&records), "-o", path_str(&wallet)],
        "test",
    );
    assert_success(&result, "append");
    assert_eq!(String::from_utf8_lossy(&result.stdout).trim(), "2 records");

    let result = run_walletbox(
        &["remove", "-o", path_str(&wallet), "--index", "0"],
        "test",
    );
    assert_success(&result, "remove");
    assert_eq!(
        String::from_utf8_lossy(&result.stdout).trim(),
        "removed Main (pkMain)"
    );

    let result = list(&wallet, "test", false);
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.starts_with("0\tGenerated Wallet\t"));
}

#[test]
fn test_init_refuses_to_overwrite() {
    let temp_dir = TempDir::new().unwrap();
    let wallet = sealed_wallet(&temp_dir, "test");
    let before = fs::read(&wallet).unwrap();

    let result = run_walletbox(&["init", "-o", path_str(&wallet)], "test");
    assert!(!result.status.success());
    assert_eq!(fs::read(&wallet).unwrap(), before);
}

#[test]
fn test_remove_out_of_range_fails() {
    let temp_dir = TempDir::new().unwrap();
    let wallet = sealed_wallet(&temp_dir, "test");
    let before = fs::read(&wallet).unwrap();

    let result = run_walletbox(
        &["remove", "-o", path_str(&wallet), "--index", "7"],
        "test",
    );
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("no record at index 7"));
    assert_eq!(fs::read(&wallet).unwrap(), before);
}

#[test]
fn test_update_operation() {
    let temp_dir = TempDir::new().unwrap();
    let wallet = sealed_wallet(&temp_dir, "test");
    let replacement = temp_dir.path().join("replacement.json");
    fs::write(
        &replacement,
        r#"[{"name": "Only", "public_key": "pkOnly", "private_key": "skOnly"}]"#,
    )
    .unwrap();

    let result = run_walletbox(
        &["update", "-i", path_str(&replacement), "-o", path_str(&wallet)],
        "test",
    );
    assert_success(&result, "update");

    let result = list(&wallet, "test", true);
    assert_eq!(
        String::from_utf8_lossy(&result.stdout).trim(),
        "0\tOnly\tpkOnly\tskOnly"
    );
}

#[test]
fn test_update_with_wrong_passphrase_fails() {
    let temp_dir = TempDir::new().unwrap();
    let wallet = sealed_wallet(&temp_dir, "correct_password");
    let before = fs::read(&wallet).unwrap();
    let replacement = temp_dir.path().join("replacement.json");
    fs::write(&replacement, "[]").unwrap();

    let result = run_walletbox(
        &["update", "-i", path_str(&replacement), "-o", path_str(&wallet)],
        "wrong_password",
    );

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(
        stderr.contains("wrong passphrase or corrupted file"),
        "Expected error message about decryption/passphrase, got: {}",
        stderr
    );
    assert_eq!(fs::read(&wallet).unwrap(), before);
}

#[test]
fn test_unseal_nonexistent_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let nonexistent = temp_dir.path().join("nonexistent.solwallet");
    let output = temp_dir.path().join("output.json");

    let result = run_walletbox(
        &["unseal", "-i", path_str(&nonexistent), "-o", path_str(&output)],
        "test",
    );

    assert!(!result.status.success());
    assert!(!output.exists());
}

#[test]
fn test_seal_rejects_invalid_records() {
    let temp_dir = TempDir::new().unwrap();
    let records = temp_dir.path().join("records.json");
    let wallet = temp_dir.path().join("wallets.solwallet");
    fs::write(&records, r#"{"name": "not a list"}"#).unwrap();

    let result = run_walletbox(
        &["seal", "-i", path_str(&records), "-o", path_str(&wallet)],
        "test",
    );

    assert!(!result.status.success());
    assert!(!wallet.exists());
    assert!(String::from_utf8_lossy(&result.stderr).contains("is not a JSON list"));
}

#[test]
fn test_empty_stdin_passphrase_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let wallet = temp_dir.path().join("new.solwallet");

    let result = run_walletbox(&["init", "-o", path_str(&wallet)], "");
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("passphrase must not be empty"));
    assert!(!wallet.exists());
}
