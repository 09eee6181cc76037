/*!
 * Quota Enforcement Tests
 * Each breach aborts only the offending call
 */

use crate::common::running;
use pretty_assertions::assert_eq;
use script_sandbox::core::types::{SandboxState, UsageStat, UsageType};
use script_sandbox::engine::{Value, BASE_STATE_SIZE};
use script_sandbox::execution::InstructionError;
use script_sandbox::memory::MemoryError;
use script_sandbox::output::OutputError;
use script_sandbox::sandbox::SandboxConfig;
use script_sandbox::SandboxError;

fn n(value: i64) -> Value {
    Value::from(value)
}

#[test]
fn test_instruction_budget_is_per_call() {
    let mut sandbox = running(SandboxConfig::unlimited().with_instruction_limit(100));

    sandbox.call("spin", &[n(60)]).unwrap();
    assert_eq!(sandbox.instruction_usage(), 60);
    // A fresh budget each call
    sandbox.call("spin", &[n(60)]).unwrap();
    assert_eq!(sandbox.instruction_usage(), 60);
}

#[test]
fn test_instruction_breach_then_recovery() {
    let mut sandbox = running(SandboxConfig::unlimited().with_instruction_limit(100));

    let err = sandbox.call("spin", &[n(10_000)]).unwrap_err();
    assert_eq!(err, SandboxError::Instruction(InstructionError::LimitExceeded { limit: 100 }));
    assert!(err.is_quota_exceeded());
    assert_eq!(sandbox.last_error(), "instruction_limit exceeded");
    assert_eq!(sandbox.usage(UsageType::Instruction, UsageStat::Maximum), 100);
    assert_eq!(sandbox.state(), SandboxState::Running);

    sandbox.call("spin", &[n(10)]).unwrap();
    assert_eq!(sandbox.instruction_usage(), 10);
    assert_eq!(sandbox.usage(UsageType::Instruction, UsageStat::Maximum), 100);
}

#[test]
fn test_unlimited_instructions() {
    let mut sandbox = running(SandboxConfig::unlimited());
    sandbox.call("spin", &[n(5_000_000)]).unwrap();
    assert_eq!(sandbox.instruction_usage(), 0);
}

#[test]
fn test_memory_breach_then_recovery() {
    let limit = BASE_STATE_SIZE + 1024;
    let mut sandbox = running(SandboxConfig::unlimited().with_memory_limit(limit));

    sandbox.call("alloc", &[n(512)]).unwrap();
    let err = sandbox.call("alloc", &[n(1024)]).unwrap_err();
    assert!(matches!(err, SandboxError::Memory(MemoryError::LimitExceeded { .. })));
    assert!(sandbox.last_error().starts_with("memory_limit exceeded"));

    // Prior allocation intact, nothing leaked by the failed request
    assert_eq!(sandbox.usage(UsageType::Memory, UsageStat::Current), BASE_STATE_SIZE + 512);

    sandbox.call("alloc", &[n(256)]).unwrap();
    sandbox.call("collect", &[]).unwrap();
    sandbox.call("alloc", &[n(1024)]).unwrap();
    assert!(sandbox.usage(UsageType::Memory, UsageStat::Current) <= limit);
}

#[test]
fn test_output_breach_discards_partial_output() {
    let mut sandbox = running(
        SandboxConfig::unlimited()
            .with_output_limit(32)
            .with_output_initial_size(8),
    );

    sandbox.call("say", &[Value::from("kept ")]).unwrap();
    let err = sandbox
        .call("say", &[Value::from("partial "), Value::from("x".repeat(64))])
        .unwrap_err();
    assert_eq!(err, SandboxError::Output(OutputError::LimitExceeded { needed: 78, limit: 32 }));
    assert_eq!(sandbox.last_error(), "output_limit exceeded");
    assert_eq!(sandbox.output().unwrap(), b"kept ");

    sandbox.call("say", &[Value::from("more")]).unwrap();
    assert_eq!(sandbox.take_output().unwrap(), b"kept more".to_vec());
    assert_eq!(sandbox.usage(UsageType::Output, UsageStat::Current), 0);
    assert_eq!(sandbox.usage(UsageType::Output, UsageStat::Maximum), 13);
}

#[test]
fn test_output_usage_tracks_position() {
    let mut sandbox = running(SandboxConfig::unlimited());
    sandbox
        .call("say", &[Value::Nil, Value::Boolean(true), n(42), Value::from("x")])
        .unwrap();
    assert_eq!(sandbox.output().unwrap(), b"niltrue42x");
    assert_eq!(sandbox.usage(UsageType::Output, UsageStat::Current), 10);
}

#[test]
fn test_emit_without_arguments() {
    let mut sandbox = running(SandboxConfig::standard());
    let err = sandbox.call("say", &[]).unwrap_err();
    assert_eq!(err, SandboxError::Output(OutputError::NoArguments));
    assert_eq!(sandbox.last_error(), "output() must have at least one argument");
}

#[test]
fn test_table_emission() {
    let mut sandbox = running(SandboxConfig::standard());
    let table = script_sandbox::TableRef::new();
    table.set_field("host", Value::from("web-1"));
    table.set_field("load", Value::Number(0.75));
    sandbox.call("say", &[Value::Table(table)]).unwrap();
    assert_eq!(
        sandbox.take_output().unwrap(),
        b"{\"host\":\"web-1\",\"load\":0.75}\n".to_vec()
    );
}

#[test]
fn test_deep_table_emission_fails_the_call_only() {
    let outcome = std::thread::Builder::new()
        .stack_size(8 * 1024 * 1024)
        .spawn(|| {
            let mut sandbox = running(SandboxConfig::standard());
            sandbox
                .engine_mut()
                .unwrap()
                .define_function("deep", |_engine, host, args| {
                    let depth = match args.first() {
                        Some(Value::Number(n)) => *n as usize,
                        _ => 1,
                    };
                    let root = script_sandbox::TableRef::new();
                    let mut cursor = root.clone();
                    for _ in 1..depth {
                        let next = script_sandbox::TableRef::new();
                        cursor.set_field("c", Value::Table(next.clone()));
                        cursor = next;
                    }
                    let result = host.emit(&[Value::from("doc="), Value::Table(root.clone())]);
                    // Unlink level by level so the drop stays shallow
                    let mut cursor = root;
                    while let Value::Table(next) = cursor.remove_field("c") {
                        cursor = next;
                    }
                    result?;
                    Ok(Value::Nil)
                });

            let err = sandbox.call("deep", &[n(100_000)]).unwrap_err();
            let output_after = sandbox.output().unwrap().to_vec();
            let state = sandbox.state();
            let last_error = sandbox.last_error().to_string();
            let recovered = sandbox.call("say", &[Value::from("ok")]).is_ok();
            (err, output_after, state, last_error, recovered)
        })
        .unwrap()
        .join()
        .unwrap();

    let (err, output_after, state, last_error, recovered) = outcome;
    assert!(matches!(err, SandboxError::Output(OutputError::DepthExceeded { .. })));
    assert!(output_after.is_empty());
    assert_eq!(state, SandboxState::Running);
    assert_eq!(last_error, "json table serialization depth exceeded");
    assert!(recovered);
}
