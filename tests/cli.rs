use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

fn arpd(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_arpd"))
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_arpd_usage_error_exits_with_one() {
    let output = arpd(&["ref.csv", "res.csv"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
}

#[test]
fn test_arpd_prints_one_row_per_class() {
    let dir = TempDir::new().unwrap();
    let reference = write(dir.path(), "ref.csv", "name,bk_primal,class_name\nA,100,X\nB,200,X\nC,50,Y\n");
    let results = write(dir.path(), "res.csv", "name,cost\nA,110\nB,180\nC,50\n");

    let output = arpd(&[&reference, &results, "cost"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "class,cost\nX,0.0\nY,0.0\n");
}

#[test]
fn test_arpd_extra_arguments_are_ignored() {
    let dir = TempDir::new().unwrap();
    let reference = write(dir.path(), "ref.csv", "name,bk_primal,class_name\nA,100,X\nB,10,Y\nA,50,Y\n");
    let results = write(dir.path(), "res.csv", "name,cost\nA,50\nB,10\n");

    let output = arpd(&[&reference, &results, "cost", "extra"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "class,cost\nX,0.0\nY,0.0\n");
}

#[test]
fn test_arpd_on_fixture_tables() {
    let output = arpd(&["src/inputs/reference.csv", "src/inputs/results.csv", "flowtime,time"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "class,flowtime,time");
    assert!(lines[1].starts_with("tai20_5,"));
    assert!(lines[2].starts_with("tai50_10,"));

    let flowtime: f64 = lines[1].split(',').nth(1).unwrap().parse().unwrap();
    assert!((flowtime - 1.0).abs() < 1e-6);
}

#[test]
fn test_arpd_unknown_instance_prints_nothing() {
    let dir = TempDir::new().unwrap();
    let reference = write(dir.path(), "ref.csv", "name,bk_primal,class_name\nA,100,X\n");
    let results = write(dir.path(), "res.csv", "name,cost\nA,110\nZ,1\n");

    let output = arpd(&[&reference, &results, "cost"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("'Z'"));
}

#[test]
fn test_run_instances_prints_commands() {
    let output = Command::new(env!("CARGO_BIN_EXE_run_instances"))
        .args(["src/inputs/instances.csv", "solve -i #P -o out/#N.json -t #T"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "solve -i insts/Taillard/tai20_5_0.txt -o out/tai20_5_0.txt.json -t 10\n\
         solve -i insts/Taillard/tai20_5_1.txt -o out/tai20_5_1.txt.json -t 10\n"
    );
}

#[test]
fn test_run_instances_accepts_instance_directory() {
    let output = Command::new(env!("CARGO_BIN_EXE_run_instances"))
        .args(["src/inputs/instances.csv", "insts/", "solve #N"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "solve tai20_5_0.txt\nsolve tai20_5_1.txt\n"
    );
}

#[test]
fn test_run_instances_executes_commands() {
    let dir = TempDir::new().unwrap();
    let list = write(dir.path(), "insts.csv", "path,time_limit\na/one,5\na/two,5\n");
    let marker = dir.path().join("#N.done");
    let command = format!("touch {}", marker.to_str().unwrap());

    let output = Command::new(env!("CARGO_BIN_EXE_run_instances"))
        .args([list.as_str(), command.as_str(), "--run", "-j", "2"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(dir.path().join("one.done").exists());
    assert!(dir.path().join("two.done").exists());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("one,ok,"));
}

#[test]
fn test_extract_table_with_names() {
    let output = Command::new(env!("CARGO_BIN_EXE_extract_table"))
        .args(["src/inputs/instances.csv", "src/inputs/perf", ".json", "--with-names"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "name,v\ntai20_5_0.txt,14033\ntai20_5_1.txt,15151\n"
    );
}
