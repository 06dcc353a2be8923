use assert_cmd::Command;
use restrax_test_data::TestFile;

fn stdout_of(assert: assert_cmd::assert::Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

#[test]
fn test_cli_process_auth_numbering() {
    let (ciffile, _tmp1) = TestFile::peptide_cif().create_temp().unwrap();
    let (mrfile, _tmp2) = TestFile::distance_auth().create_temp().unwrap();
    let mut cmd = Command::cargo_bin("restrax").unwrap();

    let assert = cmd
        .arg("process")
        .arg("--coordinates")
        .arg(ciffile)
        .arg("--restraints")
        .arg(mrfile)
        .assert()
        .success();
    let stdout = stdout_of(assert);
    assert!(stdout.contains("passes: 1"));
    assert!(stdout.contains("dist"));
}

#[test]
fn test_cli_process_offset_numbering_needs_two_passes() {
    let (ciffile, _tmp1) = TestFile::peptide_cif().create_temp().unwrap();
    let (mrfile, _tmp2) = TestFile::distance_offset().create_temp().unwrap();
    let mut cmd = Command::cargo_bin("restrax").unwrap();

    let assert = cmd
        .arg("process")
        .arg("--coordinates")
        .arg(ciffile)
        .arg("--restraints")
        .arg(mrfile)
        .assert()
        .success();
    assert!(stdout_of(assert).contains("passes: 2"));
}

#[test]
fn test_cli_process_dihedrals_json() {
    let (ciffile, _tmp1) = TestFile::peptide_cif().create_temp().unwrap();
    let (mrfile, _tmp2) = TestFile::dihedral().create_temp().unwrap();
    let mut cmd = Command::cargo_bin("restrax").unwrap();

    let assert = cmd
        .arg("process")
        .arg("--coordinates")
        .arg(ciffile)
        .arg("--restraints")
        .arg(mrfile)
        .arg("--json")
        .assert()
        .success();
    let stdout = stdout_of(assert);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["content_subtype"]["Dihed"], 1);
    assert_eq!(report["frames"][0]["rows"].as_array().unwrap().len(), 2);
    // the out-of-convention psi row is shifted back into range
    assert!(stdout.contains("circular shift"));
}

#[test]
fn test_cli_single_pass_flag() {
    let (ciffile, _tmp1) = TestFile::peptide_cif().create_temp().unwrap();
    let (mrfile, _tmp2) = TestFile::distance_offset().create_temp().unwrap();
    let mut cmd = Command::cargo_bin("restrax").unwrap();

    let assert = cmd
        .arg("process")
        .arg("--coordinates")
        .arg(ciffile)
        .arg("--restraints")
        .arg(mrfile)
        .arg("--single-pass")
        .assert()
        .success();
    assert!(stdout_of(assert).contains("passes: 1"));
}

#[test]
fn test_cli_missing_coordinates_fails() {
    let (mrfile, _tmp) = TestFile::distance_auth().create_temp().unwrap();
    let mut cmd = Command::cargo_bin("restrax").unwrap();

    cmd.arg("process")
        .arg("--coordinates")
        .arg("/nonexistent/path.cif")
        .arg("--restraints")
        .arg(mrfile)
        .assert()
        .failure();
}
