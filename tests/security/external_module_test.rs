/*!
 * External Module Tests
 * Trusted-root loading, name validation and cycle handling
 */

use pretty_assertions::assert_eq;
use script_sandbox::core::errors::SandboxError;
use script_sandbox::core::limits::MAX_MODULE_PATH;
use script_sandbox::core::types::{UsageStat, UsageType};
use script_sandbox::engine::{ScriptEngine, SimulatedEngine, Value};
use script_sandbox::sandbox::{Sandbox, SandboxConfig};
use script_sandbox::security::LoaderError;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn sandbox_with_root(root: Option<&Path>) -> Sandbox<SimulatedEngine> {
    let mut config = SandboxConfig::standard();
    if let Some(root) = root {
        config = config.with_require_path(root);
    }
    let mut sandbox = Sandbox::create(config, SimulatedEngine::new).unwrap();
    sandbox.init().unwrap();
    sandbox
}

fn write_module(dir: &TempDir, name: &str, source: &str) {
    fs::write(dir.path().join(format!("{}.lua", name)), source).unwrap();
}

fn loads(sandbox: &Sandbox<SimulatedEngine>) -> usize {
    sandbox.engine().unwrap().loaded_files().len()
}

#[test]
fn test_external_module_loads_and_is_cached() {
    let dir = TempDir::new().unwrap();
    write_module(&dir, "settings", "threshold = 10\nlabel = \"cpu\"\n");
    let mut sandbox = sandbox_with_root(Some(dir.path()));

    let first = sandbox.require("settings").unwrap();
    let module = first.as_table().unwrap();
    assert_eq!(module.get_field("threshold"), Value::Number(10.0));
    assert_eq!(module.get_field("label"), Value::from("cpu"));
    assert!(module.is_library());

    let second = sandbox.require("settings").unwrap();
    assert_eq!(first, second);
    assert_eq!(loads(&sandbox), 1);
}

#[test]
fn test_traversal_name_never_touches_filesystem() {
    let dir = TempDir::new().unwrap();
    let mut sandbox = sandbox_with_root(Some(dir.path()));

    for name in ["../etc/passwd", "a.b", "mod;rm", "sub/mod", "x y", ""] {
        let err = sandbox.require(name).unwrap_err();
        assert_eq!(err, SandboxError::Loader(LoaderError::InvalidName(name.to_string())));
    }
    assert_eq!(err_text(&mut sandbox, "../etc/passwd"), "invalid module name '../etc/passwd'");
    assert_eq!(loads(&sandbox), 0);
}

fn err_text(sandbox: &mut Sandbox<SimulatedEngine>, name: &str) -> String {
    sandbox.require(name).unwrap_err().to_string()
}

#[test]
fn test_external_disabled_without_root() {
    let mut sandbox = sandbox_with_root(None);
    for name in ["settings", "../etc/passwd"] {
        assert_eq!(
            sandbox.require(name).unwrap_err(),
            SandboxError::Loader(LoaderError::ExternalDisabled)
        );
    }
    assert_eq!(loads(&sandbox), 0);
}

#[test]
fn test_self_require_sees_placeholder() {
    let dir = TempDir::new().unwrap();
    write_module(&dir, "selfish", "me = require \"selfish\"\nvalue = 1\n");
    let mut sandbox = sandbox_with_root(Some(dir.path()));

    let module = sandbox.require("selfish").unwrap();
    let table = module.as_table().unwrap();
    assert_eq!(table.get_field("me"), Value::Boolean(true));
    assert_eq!(table.get_field("value"), Value::Number(1.0));
    assert_eq!(loads(&sandbox), 1);

    // The finished module replaces the placeholder
    assert_eq!(sandbox.require("selfish").unwrap(), module);
    assert_eq!(loads(&sandbox), 1);
}

#[test]
fn test_mutual_requires_terminate() {
    let dir = TempDir::new().unwrap();
    write_module(&dir, "ping", "peer = require \"pong\"\n");
    write_module(&dir, "pong", "peer = require \"ping\"\n");
    let mut sandbox = sandbox_with_root(Some(dir.path()));

    let ping = sandbox.require("ping").unwrap();
    let pong = ping.as_table().unwrap().get_field("peer");
    assert_eq!(pong.as_table().unwrap().get_field("peer"), Value::Boolean(true));
    assert_eq!(loads(&sandbox), 2);
}

#[test]
fn test_module_can_use_builtins() {
    let dir = TempDir::new().unwrap();
    write_module(&dir, "wrapper", "json = require \"cjson\"\n");
    let mut sandbox = sandbox_with_root(Some(dir.path()));

    let wrapper = sandbox.require("wrapper").unwrap();
    let json = wrapper.as_table().unwrap().get_field("json");
    assert_eq!(json, sandbox.require("cjson").unwrap());
}

#[test]
fn test_syntax_error_surfaces_engine_text_and_releases_placeholder() {
    let dir = TempDir::new().unwrap();
    write_module(&dir, "broken", "ok = 1\n%%%\n");
    let mut sandbox = sandbox_with_root(Some(dir.path()));

    let err = sandbox.require("broken").unwrap_err();
    let expected = format!("{}:2: unexpected symbol near '%%%'", dir.path().join("broken.lua").display());
    assert_eq!(err, SandboxError::Loader(LoaderError::Load(expected)));

    // A fixed file can be loaded afterwards
    write_module(&dir, "broken", "ok = 1\n");
    let fixed = sandbox.require("broken").unwrap();
    assert_eq!(fixed.as_table().unwrap().get_field("ok"), Value::Number(1.0));
}

#[test]
fn test_missing_module_file() {
    let dir = TempDir::new().unwrap();
    let mut sandbox = sandbox_with_root(Some(dir.path()));
    let err = sandbox.require("absent").unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("cannot open {}", dir.path().join("absent.lua").display())
    );
}

#[test]
fn test_overlong_path_rejected() {
    let dir = TempDir::new().unwrap();
    let mut sandbox = sandbox_with_root(Some(dir.path()));
    let name = "m".repeat(MAX_MODULE_PATH);
    assert_eq!(
        sandbox.require(&name).unwrap_err(),
        SandboxError::Loader(LoaderError::PathTooLong(MAX_MODULE_PATH))
    );
    assert_eq!(loads(&sandbox), 0);
}

#[test]
fn test_module_output_reaches_buffer() {
    let dir = TempDir::new().unwrap();
    write_module(&dir, "banner", "output \"loaded banner\"\n");
    let mut sandbox = sandbox_with_root(Some(dir.path()));
    sandbox.require("banner").unwrap();
    assert_eq!(sandbox.take_output().unwrap(), b"loaded banner".to_vec());
}

#[test]
fn test_failed_module_discards_its_output_and_records_error() {
    let dir = TempDir::new().unwrap();
    write_module(&dir, "banner", "output \"kept\"\n");
    write_module(&dir, "bad", "output \"half\"\n%%%\n");
    let mut sandbox = sandbox_with_root(Some(dir.path()));

    sandbox.require("banner").unwrap();
    let err = sandbox.require("bad").unwrap_err();
    let expected = format!("{}:2: unexpected symbol near '%%%'", dir.path().join("bad.lua").display());
    assert_eq!(err.to_string(), expected);

    assert_eq!(sandbox.output().unwrap(), b"kept");
    assert_eq!(sandbox.last_error(), expected);
    assert_eq!(sandbox.usage(UsageType::Output, UsageStat::Current), 4);
}
