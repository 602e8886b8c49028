//! Audit hash chain integrity.
//!
//! GREEN when:
//! - Writing 5 lifecycle events with hash_chain=true, then verifying, succeeds.
//! - Mutating line 3's payload in the file, then verifying, detects the break.
//! - Deleting a middle line is detected as a prev-hash mismatch.

use serde_json::json;
use tfd_audit::{before_after, verify_hash_chain, AuditWriter, VerifyResult};
use uuid::Uuid;

fn temp_audit_path(suffix: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "tfd_audit_test_{}_{}_{}",
        suffix,
        std::process::id(),
        Uuid::new_v4().as_simple()
    ))
}

fn write_lifecycle_log(path: &std::path::Path) {
    let phases = ["draft", "collecting", "ready_to_file", "filing_submitted", "filing_accepted"];
    let mut writer = AuditWriter::new(path, true).unwrap();
    for pair in phases.windows(2) {
        writer
            .append(
                "transaction",
                "tx-0147",
                "phase_changed",
                "system:lifecycle",
                before_after(json!({ "phase": pair[0] }), json!({ "phase": pair[1] })),
            )
            .unwrap();
    }
    writer
        .append(
            "filing_attempt",
            "attempt-1",
            "attempt_resolved",
            "authority",
            json!({ "status": "accepted", "receipt_id": "R-2026-117" }),
        )
        .unwrap();
}

#[test]
fn untampered_lifecycle_log_verifies_valid() {
    let path = temp_audit_path("untampered");
    write_lifecycle_log(&path);

    let result = verify_hash_chain(&path).unwrap();
    assert_eq!(
        result,
        VerifyResult::Valid { lines: 5 },
        "untampered chain should verify as valid with 5 lines"
    );

    let _ = std::fs::remove_file(&path);
}

#[test]
fn tampered_payload_detected_at_its_line() {
    let path = temp_audit_path("tampered");
    write_lifecycle_log(&path);

    // Rewrite line 3's payload as if someone edited history.
    {
        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();
        assert!(lines.len() >= 5, "should have 5 lines");

        let mut ev: serde_json::Value = serde_json::from_str(&lines[2]).unwrap();
        ev["payload"]["after"]["phase"] = json!("exempt");
        lines[2] = serde_json::to_string(&ev).unwrap();
        std::fs::write(&path, lines.join("\n") + "\n").unwrap();
    }

    match verify_hash_chain(&path).unwrap() {
        VerifyResult::Broken { line, reason } => {
            assert_eq!(line, 3, "break reported at the tampered line");
            assert!(reason.contains("hash_self mismatch"), "reason: {reason}");
        }
        VerifyResult::Valid { .. } => panic!("tampered log must not verify"),
    }

    let _ = std::fs::remove_file(&path);
}

#[test]
fn deleted_line_detected_as_chain_break() {
    let path = temp_audit_path("deleted");
    write_lifecycle_log(&path);

    {
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        let mut kept: Vec<&str> = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if i != 1 {
                kept.push(line);
            }
        }
        std::fs::write(&path, kept.join("\n") + "\n").unwrap();
    }

    match verify_hash_chain(&path).unwrap() {
        VerifyResult::Broken { line, reason } => {
            assert_eq!(line, 2, "first surviving line after the gap breaks");
            assert!(reason.contains("hash_prev mismatch"), "reason: {reason}");
        }
        VerifyResult::Valid { .. } => panic!("a log with a deleted line must not verify"),
    }

    let _ = std::fs::remove_file(&path);
}
