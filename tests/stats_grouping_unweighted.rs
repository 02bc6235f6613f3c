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

fn request_ok(
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
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn sign_in(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    user_id: &str,
) {
    let _ = request_ok(
        stdin,
        reader,
        id,
        "session.signIn",
        json!({ "displayName": user_id, "userId": user_id }),
    );
}

/// Three users with percentages 100, 50 and 0 on the same subject, with very
/// different day counts. The subject-wise average must be the unweighted mean.
#[test]
fn subject_wise_average_is_unweighted_mean_of_percentages() {
    let workspace = temp_dir("attendd-grouping");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "w",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    sign_in(&mut stdin, &mut reader, "u1", "user-hundred");
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "c1",
        "subjects.create",
        json!({ "name": "Thermodynamics", "professorName": "Prof. Rao" }),
    );
    let subject_id = created
        .get("subjectId")
        .and_then(|v| v.as_str())
        .expect("subjectId")
        .to_string();

    // user-hundred: 8 present -> 100%.
    for i in 0..8 {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("h{i}"),
            "attendance.mark",
            json!({ "subjectId": subject_id, "date": format!("2024-01-{:02}", i + 1), "status": "present" }),
        );
    }
    // user-half: 1 present, 1 absent -> 50%.
    sign_in(&mut stdin, &mut reader, "u2", "user-half");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "h-p",
        "attendance.mark",
        json!({ "subjectId": subject_id, "date": "2024-01-01", "status": "present" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "h-a",
        "attendance.mark",
        json!({ "subjectId": subject_id, "date": "2024-01-02", "status": "absent" }),
    );
    // user-zero: 3 absent -> 0%.
    sign_in(&mut stdin, &mut reader, "u3", "user-zero");
    for i in 0..3 {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("z{i}"),
            "attendance.mark",
            json!({ "subjectId": subject_id, "date": format!("2024-01-{:02}", i + 1), "status": "absent" }),
        );
    }

    let grouped = request_ok(
        &mut stdin,
        &mut reader,
        "g",
        "stats.subjectWise",
        json!({}),
    );
    let groups = grouped
        .get("groups")
        .and_then(|v| v.as_array())
        .expect("groups");
    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.get("recordCount").and_then(|v| v.as_i64()), Some(3));
    assert_eq!(
        group.get("averagePercentage").and_then(|v| v.as_f64()),
        Some(50.0)
    );
    assert_eq!(
        group.get("minPercentage").and_then(|v| v.as_f64()),
        Some(0.0)
    );
    assert_eq!(
        group.get("maxPercentage").and_then(|v| v.as_f64()),
        Some(100.0)
    );
    assert_eq!(group.get("presentDays").and_then(|v| v.as_i64()), Some(9));
}

#[test]
fn professor_wise_grouping_spans_that_professors_subjects() {
    let workspace = temp_dir("attendd-professor-grouping");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "w",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    sign_in(&mut stdin, &mut reader, "u1", "solo-user");

    let mut subject_ids = Vec::new();
    for (i, (name, professor)) in [
        ("Algebra", "Prof. Rao"),
        ("Topology", "Prof. Rao"),
        ("Optics", "Prof. Verma"),
    ]
    .iter()
    .enumerate()
    {
        let created = request_ok(
            &mut stdin,
            &mut reader,
            &format!("c{i}"),
            "subjects.create",
            json!({ "name": name, "professorName": professor }),
        );
        subject_ids.push(
            created
                .get("subjectId")
                .and_then(|v| v.as_str())
                .expect("subjectId")
                .to_string(),
        );
    }

    // Algebra 100%, Topology 50%, Optics 100%.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "m1",
        "attendance.mark",
        json!({ "subjectId": subject_ids[0], "date": "2024-01-01", "status": "present" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "m2",
        "attendance.mark",
        json!({ "subjectId": subject_ids[1], "date": "2024-01-01", "status": "present" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "m3",
        "attendance.mark",
        json!({ "subjectId": subject_ids[1], "date": "2024-01-02", "status": "absent" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "m4",
        "attendance.mark",
        json!({ "subjectId": subject_ids[2], "date": "2024-01-01", "status": "present" }),
    );

    let grouped = request_ok(
        &mut stdin,
        &mut reader,
        "g",
        "stats.professorWise",
        json!({}),
    );
    let groups = grouped
        .get("groups")
        .and_then(|v| v.as_array())
        .expect("groups");
    assert_eq!(groups.len(), 2);

    let rao = groups
        .iter()
        .find(|g| g.get("key").and_then(|v| v.as_str()) == Some("Prof. Rao"))
        .expect("Rao group");
    assert_eq!(rao.get("recordCount").and_then(|v| v.as_i64()), Some(2));
    assert_eq!(
        rao.get("averagePercentage").and_then(|v| v.as_f64()),
        Some(75.0)
    );

    let verma = groups
        .iter()
        .find(|g| g.get("key").and_then(|v| v.as_str()) == Some("Prof. Verma"))
        .expect("Verma group");
    assert_eq!(verma.get("recordCount").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(
        verma.get("averagePercentage").and_then(|v| v.as_f64()),
        Some(100.0)
    );
}
