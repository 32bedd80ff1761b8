//! Integration tests for configuration document round-tripping.
//!
//! These exercise the parser, formatter and document together over real
//! files: what one run writes, the next run must read back unchanged.

use std::fs;

use tempfile::TempDir;

use bsp_setup::assignment::{parse_assignment, Operator};
use bsp_setup::document::ConfDocument;

#[test]
fn test_written_file_reads_back_identically() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("local.conf");

    let mut doc = ConfDocument::new_quiet(&path);
    doc.add("BB_NUMBER_THREADS", Operator::Assign, "8");
    doc.add("PARALLEL_MAKE", Operator::Assign, "-j 8");
    doc.add("MACHINE", Operator::Default, "wandboard-solo");
    doc.add("IMAGE_INSTALL", Operator::Append, "vim");
    doc.add("EMPTY", Operator::Assign, "");
    doc.add("APPEND_append", Operator::Assign, " foo bar");
    doc.write().unwrap();

    let mut reread = ConfDocument::new_quiet(&path);
    reread.read().unwrap();
    assert_eq!(reread.assignments(), doc.simplify().as_slice());

    // Writing the reread document reproduces the file byte for byte.
    let first = fs::read_to_string(&path).unwrap();
    fs::remove_file(&path).unwrap();
    let mut stable = ConfDocument::new_quiet(&path);
    for assignment in reread.assignments() {
        stable.push(assignment.clone());
    }
    stable.write().unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), first);
}

#[test]
fn test_parse_then_write_back_reproduces_the_input() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("local.conf");
    let input = "BB_NUMBER_THREADS = '8'\nMACHINE ?= 'wandboard-solo'\n";
    fs::write(&source, input).unwrap();

    let mut doc = ConfDocument::new_quiet(&source);
    doc.read().unwrap();

    // Replay the parsed assignments into a fresh document, untouched.
    let copy_path = dir.path().join("copy.conf");
    let mut copy = ConfDocument::new_quiet(&copy_path);
    for assignment in doc.assignments() {
        copy.push(assignment.clone());
    }
    copy.write().unwrap();

    assert_eq!(fs::read_to_string(&copy_path).unwrap(), input);
}

#[test]
fn test_existing_file_survives_a_full_mutation_pass() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("local.conf");
    let original = "# hand edited\nMACHINE = 'wandboard-solo'\nIMAGE_INSTALL += 'vim'\n";
    fs::write(&path, original).unwrap();

    let mut doc = ConfDocument::new(&path);
    doc.read().unwrap();
    doc.add("DISTRO", Operator::Assign, "poky");
    doc.remove("MACHINE");
    doc.reset("IMAGE_INSTALL", Operator::Assign, "git");
    doc.write().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn test_contiguous_appends_merge_across_a_write() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("local.conf");
    fs::write(
        &path,
        "IMAGE_INSTALL += 'vim'\nIMAGE_INSTALL += 'git'\nMACHINE = 'qemuarm'\nIMAGE_INSTALL += 'htop'\n",
    )
    .unwrap();

    let mut doc = ConfDocument::new_quiet(&path);
    doc.read().unwrap();

    let simplified = doc.simplify();
    let rendered: Vec<String> = simplified
        .iter()
        .map(|a| format!("{} {}", a.variable, a.operator))
        .collect();
    // Only the adjacent pair merges; the binding after MACHINE stays.
    assert_eq!(
        rendered,
        vec!["IMAGE_INSTALL +=", "MACHINE =", "IMAGE_INSTALL +="]
    );
    assert_eq!(simplified[0].value, vec!["vim", "git"]);
}

#[test]
fn test_value_whitespace_runs_survive_the_round_trip() {
    let line = "PREPEND:prepend = ' xxx yyy  '";
    let parsed = parse_assignment(line).unwrap().unwrap();
    assert_eq!(parsed.value, vec![" xxx", "yyy  "]);

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("local.conf");
    let mut doc = ConfDocument::new_quiet(&path);
    doc.push(parsed.clone());
    doc.write().unwrap();

    let mut reread = ConfDocument::new_quiet(&path);
    reread.read().unwrap();
    assert_eq!(reread.assignments()[0], parsed);
}

#[test]
fn test_long_layer_list_reflows_and_reads_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bblayers.conf");

    let layers = "/workspace/sources/meta-alpha \
                  /workspace/sources/meta-bravo \
                  /workspace/sources/meta-charlie";
    let mut doc = ConfDocument::new_quiet(&path);
    doc.add("BBLAYERS", Operator::Append, layers);
    doc.write().unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("BBLAYERS += '\\\n"));
    assert!(written.contains("    /workspace/sources/meta-alpha \\\n"));

    let mut reread = ConfDocument::new_quiet(&path);
    reread.read().unwrap();
    let tokens: Vec<String> = reread.assignments()[0]
        .value
        .iter()
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .collect();
    assert_eq!(
        tokens,
        vec![
            "/workspace/sources/meta-alpha",
            "/workspace/sources/meta-bravo",
            "/workspace/sources/meta-charlie",
        ]
    );
}
