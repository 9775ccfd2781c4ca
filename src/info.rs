use std::path::Path;

use serde::Serialize;

use crate::config::{CONFIG_FILE, Config};

/// Output the nixdomain reference card for the project at `root`.
pub fn run(root: &Path, json: bool) {
    let state = gather_state(root);

    if json {
        print_json(&state);
    } else {
        print_markdown(&state);
    }
}

// ── State gathering ───────────────────────────────────────────────────

/// Snapshot of the project as seen from `root`.
struct CurrentState {
    /// Whether `nixdomain.toml` exists.
    config_found: bool,
    /// Whether `nixdomain.toml` parsed.
    config_valid: bool,
    /// Whether a source-link template is configured.
    linkcode: bool,
    /// Configured object files and whether each exists.
    object_files: Vec<(String, bool)>,
}

/// Look at the config and object files without failing.
fn gather_state(root: &Path) -> CurrentState {
    let config_found = root.join(CONFIG_FILE).exists();
    let config = Config::load(root).ok();

    let object_files = config
        .as_ref()
        .map(|c| {
            return c
                .object_files(root)
                .into_iter()
                .map(|path| {
                    let exists = path.exists();
                    return (path.display().to_string(), exists);
                })
                .collect();
        })
        .unwrap_or_default();

    return CurrentState {
        config_found,
        config_valid: config.is_some(),
        linkcode: config.as_ref().is_some_and(|c| return c.linker().is_some()),
        object_files,
    };
}

// ── Markdown output ───────────────────────────────────────────────────

/// Human-readable card.
fn print_markdown(state: &CurrentState) {
    let version = env!("CARGO_PKG_VERSION");
    print_markdown_header(version);
    print_markdown_state(state);
    println!();
    print_markdown_exit_codes();
}

/// Syntax, commands, and configuration.
fn print_markdown_header(version: &str) {
    print!(
        "\
# nixdomain {version}

Cross-referencing for Nix documentation: declare options, functions and
packages in markdown, then link to them by attribute path.

## Declarations

    ::::{{nix:option}} services.nginx
    :type: submodule

    :::{{nix:option}} enable
    Nested options join the enclosing path: services.nginx.enable
    :::
    ::::

    :::{{nix:function}} lib.strings.concatStrings
    :::

    :::{{nix:package}} pkgs.hello
    :::

Auto directives read the object store: nix:autooption, nix:autopackage,
nix:autopackages (with :no-recursive:), nix:autofunction, nix:autolibrary.

## References

    {{nix:option}}`enable`                  option, resolved from the enclosing options
    {{nix:func}}`concatStrings`             function
    {{nix:pkg}}`hello`                      package
    {{nix:bind}}`hello`                     function or package
    {{nix:obj}}`hello`                      any kind
    {{nix:option}}`the toggle <enable>`     explicit link text

## Commands

    nixdomain build [--json] [--strict]     Read and resolve every document
    nixdomain index [--kind K] [--json]     Print the options and library indices
    nixdomain resolve <target> [--role R]   Resolve one reference
    nixdomain split <path>                  Show how a path splits into attributes
    nixdomain info [--json]                 This card

## Configuration ({CONFIG_FILE})

    include = [\"docs/\"]                         # only scan these paths
    exclude = [\"docs/archive/\"]                 # skip these paths
    objects = [\"build/objects.json\"]            # object store for auto directives
    linkcode_url = \"https://github.com/NixOS/nixpkgs/blob/master/{{path}}#L{{line}}\"

## Current State

"
    );
}

/// Config and object store status.
fn print_markdown_state(state: &CurrentState) {
    match (state.config_found, state.config_valid) {
        (false, _) => println!("Config:   {CONFIG_FILE} (not found)"),
        (true, false) => println!("Config:   {CONFIG_FILE} (invalid)"),
        (true, true) => println!("Config:   {CONFIG_FILE} (found)"),
    }

    if state.object_files.is_empty() {
        println!("Objects:  (none)");
    } else {
        let list = state
            .object_files
            .iter()
            .map(|(path, exists)| {
                if *exists {
                    return path.clone();
                }
                return format!("{path} (missing)");
            })
            .collect::<Vec<_>>()
            .join(", ");
        println!("Objects:  {list}");
    }

    if state.linkcode {
        println!("Linkcode: configured");
    } else {
        println!("Linkcode: (none)");
    }
}

/// Exit code table.
fn print_markdown_exit_codes() {
    print!(
        "\
## Exit Codes

| Code | Meaning |
|------|---------|
| 0    | Success |
| 1    | Diagnostics under --strict, or an unresolved `resolve` target |
| 2    | Runtime error |
"
    );
}

// ── JSON output ───────────────────────────────────────────────────────

/// One exit code.
#[derive(Serialize)]
struct ExitCodeInfo {
    /// Process exit code.
    code: u8,
    /// What it means.
    meaning: String,
}

/// Top-level JSON card.
#[derive(Serialize)]
struct InfoJson {
    /// Current project state.
    current_state: StateJson,
    /// Directive names.
    directives: Vec<String>,
    /// Exit codes.
    exit_codes: Vec<ExitCodeInfo>,
    /// Role names.
    roles: Vec<String>,
    /// Crate version.
    version: String,
}

/// One configured object file.
#[derive(Serialize)]
struct ObjectFileJson {
    /// Whether it exists on disk.
    exists: bool,
    /// Resolved path.
    path: String,
}

/// JSON form of [`CurrentState`].
#[derive(Serialize)]
struct StateJson {
    /// See [`CurrentState::config_found`].
    config_found: bool,
    /// See [`CurrentState::config_valid`].
    config_valid: bool,
    /// See [`CurrentState::linkcode`].
    linkcode: bool,
    /// See [`CurrentState::object_files`].
    object_files: Vec<ObjectFileJson>,
}

/// Machine-readable card.
fn print_json(state: &CurrentState) {
    let info = InfoJson {
        current_state: StateJson {
            config_found: state.config_found,
            config_valid: state.config_valid,
            linkcode: state.linkcode,
            object_files: state
                .object_files
                .iter()
                .map(|(path, exists)| {
                    return ObjectFileJson {
                        exists: *exists,
                        path: path.clone(),
                    };
                })
                .collect(),
        },
        directives: [
            "nix:autofunction",
            "nix:autolibrary",
            "nix:autooption",
            "nix:autopackage",
            "nix:autopackages",
            "nix:function",
            "nix:option",
            "nix:package",
        ]
        .iter()
        .map(ToString::to_string)
        .collect(),
        exit_codes: vec![
            ExitCodeInfo { code: 0, meaning: "Success".to_string() },
            ExitCodeInfo {
                code: 1,
                meaning: "Diagnostics under --strict, or an unresolved resolve target".to_string(),
            },
            ExitCodeInfo { code: 2, meaning: "Runtime error".to_string() },
        ],
        roles: ["nix:bind", "nix:func", "nix:obj", "nix:option", "nix:pkg"]
            .iter()
            .map(ToString::to_string)
            .collect(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    // serde_json::to_string_pretty won't fail on this structure.
    let json = serde_json::to_string_pretty(&info).unwrap_or_default();
    println!("{json}");
}
