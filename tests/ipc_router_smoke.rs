use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_attendd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn attendd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        assert_ne!(
            code, "not_implemented",
            "unexpected unknown method for {}",
            method
        );
    }
    value
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("attendd-router-smoke");
    let bundle_out = workspace.join("smoke-backup.attendbackup.zip");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request(&mut stdin, &mut reader, "1", "health", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "3",
        "session.signIn",
        json!({ "displayName": "Smoke User" }),
    );
    let created = request(
        &mut stdin,
        &mut reader,
        "4",
        "subjects.create",
        json!({ "name": "Smoke Subject", "professorName": "Prof. Smoke" }),
    );
    let subject_id = created
        .get("result")
        .and_then(|v| v.get("subjectId"))
        .and_then(|v| v.as_str())
        .expect("subjectId")
        .to_string();

    let _ = request(&mut stdin, &mut reader, "5", "subjects.list", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "6",
        "subjects.update",
        json!({ "subjectId": subject_id, "professorName": "Prof. Renamed" }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "7",
        "attendance.mark",
        json!({ "subjectId": subject_id, "date": "2024-01-01", "status": "present" }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "8",
        "attendance.today",
        json!({ "date": "2024-01-01" }),
    );
    let _ = request(&mut stdin, &mut reader, "9", "attendance.history", json!({}));
    let _ = request(&mut stdin, &mut reader, "10", "attendance.state", json!({}));
    let _ = request(&mut stdin, &mut reader, "11", "stats.all", json!({}));
    let _ = request(&mut stdin, &mut reader, "12", "stats.subjectWise", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "13",
        "stats.professorWise",
        json!({}),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "14",
        "stats.lowAttendance",
        json!({ "threshold": 75 }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "15",
        "stats.highAttendance",
        json!({}),
    );
    let _ = request(&mut stdin, &mut reader, "16", "stats.summary", json!({}));
    let _ = request(&mut stdin, &mut reader, "17", "stats.state", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "18",
        "attendance.remove",
        json!({ "subjectId": subject_id, "date": "2024-01-01" }),
    );
    let _ = request(&mut stdin, &mut reader, "19", "attendance.reset", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "20",
        "backup.export",
        json!({ "outPath": bundle_out.to_string_lossy() }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "21",
        "backup.import",
        json!({ "inPath": bundle_out.to_string_lossy() }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "22",
        "subjects.delete",
        json!({ "subjectId": "nonexistent" }),
    );
    let _ = request(&mut stdin, &mut reader, "23", "session.signOut", json!({}));

    let final_health = request(&mut stdin, &mut reader, "24", "health", json!({}));
    assert_eq!(final_health.get("ok").and_then(|v| v.as_bool()), Some(true));

    drop(stdin);
    let _ = child.wait();
}
