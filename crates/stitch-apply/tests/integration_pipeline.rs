//! Full pipeline: wire text → streaming parse → apply → undo.

use std::fs;
use stitch_apply::{apply_turn, EditHistory, HistoryEntry, Workspace};
use stitch_parse::{StreamParser, WireFormat};

fn parse_and_apply(
    ws: &Workspace,
    history: &mut EditHistory,
    format: WireFormat,
    response: &str,
) -> stitch_apply::TurnReport {
    let mut parser = StreamParser::new(format);
    // Stream in small chunks, as the transport would deliver it.
    for chunk in response.as_bytes().chunks(11) {
        parser.push_chunk(std::str::from_utf8(chunk).unwrap());
    }
    let (turn, _) = parser.finalize(ws);
    let applied = apply_turn(ws, &turn.edits);
    if let Some(record) = applied.record {
        history.push(HistoryEntry { record, head: None });
    }
    applied.report
}

#[test]
fn block_format_apply_then_undo_restores_original_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let original = "def f():\n    pass\n";
    fs::write(dir.path().join("core.py"), original).unwrap();
    let ws = Workspace::new(dir.path()).unwrap();
    let mut history = EditHistory::new();

    let response = concat!(
        "Replacing the body.\n",
        "@@start\n",
        "{\"file\": \"core.py\", \"action\": \"replace\", \"start-line\": 2, \"end-line\": 2}\n",
        "@@code\n",
        "    return 1\n",
        "@@end\n",
    );
    let report = parse_and_apply(&ws, &mut history, WireFormat::Block, response);
    assert!(report.all_applied());
    assert_eq!(
        fs::read_to_string(dir.path().join("core.py")).unwrap(),
        "def f():\n    return 1\n"
    );

    let undone = history.undo(&ws).unwrap();
    assert!(undone.warnings.is_empty());
    assert_eq!(
        fs::read_to_string(dir.path().join("core.py")).unwrap(),
        original
    );
}

#[test]
fn udiff_format_resolves_and_applies_against_live_tree() {
    let dir = tempfile::tempdir().unwrap();
    let original = concat!(
        "import sys\n",
        "\n",
        "def main(name):\n",
        "    print(name)\n",
        "\n",
        "def helper():\n",
        "    return 0\n",
        "\n",
        "main(sys.argv[1])\n",
        "# end\n",
    );
    fs::write(dir.path().join("app.py"), original).unwrap();
    let ws = Workspace::new(dir.path()).unwrap();
    let mut history = EditHistory::new();

    let response = concat!(
        "--- app.py\n",
        "+++ app.py\n",
        "@@ @@\n",
        " def main(name):\n",
        "-    print(name)\n",
        "+    print(f'hi {name}')\n",
        "@@ end @@\n",
    );
    let report = parse_and_apply(&ws, &mut history, WireFormat::UnifiedDiff, response);
    assert!(report.all_applied());
    let applied_content = fs::read_to_string(dir.path().join("app.py")).unwrap();
    assert!(applied_content.contains("print(f'hi {name}')"));
    assert!(!applied_content.contains("print(name)"));

    history.undo(&ws).unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("app.py")).unwrap(),
        original
    );
}

#[test]
fn multi_file_turn_with_one_bad_file_applies_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("good.py"), "a\nb\n").unwrap();
    fs::write(dir.path().join("bad.py"), "1\n2\n3\n4\n5\n6\n7\n8\n").unwrap();
    let ws = Workspace::new(dir.path()).unwrap();
    let mut history = EditHistory::new();

    // bad.py gets overlapping edits (dropped at parse time); good.py and
    // the new file still go through.
    let response = concat!(
        "@ bad.py starting_line=1 ending_line=5\nX\n@\n",
        "@ bad.py starting_line=3 ending_line=8\nY\n@\n",
        "@ good.py starting_line=1 ending_line=2\nA\n@\n",
        "@ brand_new.py +\n",
    );
    let report = parse_and_apply(&ws, &mut history, WireFormat::LineReplacement, response);
    assert!(report.all_applied());
    assert_eq!(
        fs::read_to_string(dir.path().join("bad.py")).unwrap(),
        "1\n2\n3\n4\n5\n6\n7\n8\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("good.py")).unwrap(),
        "A\nb\n"
    );
    assert!(dir.path().join("brand_new.py").exists());
}

#[test]
fn rename_then_edit_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.py"), "x = 1\n").unwrap();
    let ws = Workspace::new(dir.path()).unwrap();
    let mut history = EditHistory::new();

    let response = concat!(
        "@ a.py b.py\n",
        "@ a.py starting_line=1 ending_line=2\n",
        "x = 2\n",
        "@\n",
    );
    let report = parse_and_apply(&ws, &mut history, WireFormat::LineReplacement, response);
    assert!(report.all_applied());
    assert!(!dir.path().join("a.py").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("b.py")).unwrap(),
        "x = 2\n"
    );

    history.undo(&ws).unwrap();
    assert!(!dir.path().join("b.py").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("a.py")).unwrap(),
        "x = 1\n"
    );
}

#[test]
fn json_format_deletion_and_undo() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("victim.py"), "contents\n").unwrap();
    let ws = Workspace::new(dir.path()).unwrap();
    let mut history = EditHistory::new();

    let response = r#"{"content": [{"type": "deletion", "file-path": "victim.py"}]}"#;
    let report = parse_and_apply(&ws, &mut history, WireFormat::JsonStream, response);
    assert!(report.all_applied());
    assert!(!dir.path().join("victim.py").exists());

    history.undo(&ws).unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("victim.py")).unwrap(),
        "contents\n"
    );
}
