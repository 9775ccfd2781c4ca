use std::path::Path;
use std::process::{Command, Output};

fn nixdomain_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_nixdomain"));
    cmd.current_dir(dir);
    cmd.env_remove("RUST_LOG");
    return cmd;
}

fn fixture(name: &str) -> std::path::PathBuf {
    return Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
}

fn stdout(output: &Output) -> String {
    return String::from_utf8_lossy(&output.stdout).into_owned();
}

fn stderr(output: &Output) -> String {
    return String::from_utf8_lossy(&output.stderr).into_owned();
}

#[test]
fn build_resolves_every_reference() {
    let output = nixdomain_cmd(&fixture("basic")).arg("build").output().unwrap();
    assert!(output.status.success(), "build failed: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "8 entities, 6 links, 0 diagnostics (0 unresolved)");
}

#[test]
fn build_json_report() {
    let output = nixdomain_cmd(&fixture("basic")).args(["build", "--json"]).output().unwrap();
    assert!(output.status.success(), "build failed: {}", stderr(&output));
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();

    let anchors: Vec<&str> = report["links"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| return l["to"]["anchor"].as_str().unwrap())
        .collect();
    assert_eq!(anchors, vec![
        "nix-function-lib.strings.concatStrings",
        "nix-option-services.nginx.package",
        "nix-option-services.nginx.enable",
        "nix-package-pkgs.hello",
        "nix-function-lib.strings.concatStrings",
        "nix-package-pkgs.hello",
    ]);

    let entities = report["entities"].as_array().unwrap();
    let nginx = entities.iter().find(|e| return e["path"] == "services.nginx").unwrap();
    assert_eq!(
        nginx["source_url"],
        "https://github.com/NixOS/nixpkgs/blob/master/nixos/modules/services/web-servers/nginx/default.nix#L20"
    );
    let hello = entities.iter().find(|e| return e["path"] == "pkgs.hello").unwrap();
    assert_eq!(hello["metadata"]["version"], "2.12.1");
    assert_eq!(hello["document"], "docs/packages");

    let titled = report["links"].as_array().unwrap().last().unwrap();
    assert_eq!(titled["text"], "the greeter");
    assert!(report["diagnostics"].as_array().unwrap().is_empty(), "no diagnostics");
}

#[test]
fn index_lists_options_enable_first() {
    let output = nixdomain_cmd(&fixture("basic"))
        .args(["index", "--kind", "option", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "index failed: {}", stderr(&output));
    let indices: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let paths: Vec<&str> = indices["option"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|g| return g["entries"].as_array().unwrap().iter())
        .map(|e| return e["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["services.nginx", "services.nginx.enable", "services.nginx.package"]);
}

#[test]
fn resolve_uses_the_given_context() {
    let output = nixdomain_cmd(&fixture("basic"))
        .args(["resolve", "enable", "--role", "option", "--option-context", "services.nginx"])
        .output()
        .unwrap();
    assert!(output.status.success(), "resolve failed: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "docs/options#nix-option-services.nginx.enable");

    let missing = nixdomain_cmd(&fixture("basic"))
        .args(["resolve", "enable", "--role", "option"])
        .output()
        .unwrap();
    assert_eq!(missing.status.code(), Some(1));
    assert!(stdout(&missing).contains("tried enable"), "{}", stdout(&missing));
}

#[test]
fn split_prints_segments() {
    let dir = tempfile::tempdir().unwrap();
    let output = nixdomain_cmd(dir.path())
        .args(["split", r#"services.nginx.virtualHosts."example.org".root"#])
        .output()
        .unwrap();
    assert!(output.status.success(), "split failed: {}", stderr(&output));
    assert_eq!(stdout(&output), "services\nnginx\nvirtualHosts\n\"example.org\"\nroot\n");

    let empty = nixdomain_cmd(dir.path()).args(["split", "..."]).output().unwrap();
    assert_eq!(empty.status.code(), Some(2));
    assert!(stderr(&empty).contains("Empty Path"), "{}", stderr(&empty));
}

#[test]
fn strict_build_fails_on_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.md"), "See {nix:option}`services.nope`.\n").unwrap();

    let lenient = nixdomain_cmd(dir.path()).arg("build").output().unwrap();
    assert!(lenient.status.success(), "non-strict build succeeds");
    assert!(stderr(&lenient).contains("unresolved option reference `services.nope`"), "{}", stderr(&lenient));

    let strict = nixdomain_cmd(dir.path()).args(["build", "--strict"]).output().unwrap();
    assert_eq!(strict.status.code(), Some(1));
}

#[test]
fn missing_object_store_is_a_runtime_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("nixdomain.toml"), "objects = [\"missing.json\"]\n").unwrap();

    let output = nixdomain_cmd(dir.path()).arg("build").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Object Store Not Found"), "{}", stderr(&output));
}

#[test]
fn info_json_reports_state() {
    let output = nixdomain_cmd(&fixture("basic")).args(["info", "--json"]).output().unwrap();
    assert!(output.status.success(), "info failed: {}", stderr(&output));
    let info: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(info["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(info["current_state"]["config_found"], true);
    assert_eq!(info["current_state"]["linkcode"], true);
    assert_eq!(info["current_state"]["object_files"][0]["exists"], true);
}
