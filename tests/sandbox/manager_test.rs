/*!
 * Sandbox Manager Tests
 * Many instances, no shared state
 */

use crate::common::scripted_engine;
use pretty_assertions::assert_eq;
use script_sandbox::core::types::SandboxState;
use script_sandbox::engine::{SimulatedEngine, Value};
use script_sandbox::sandbox::{SandboxConfig, SandboxManager};
use script_sandbox::SandboxError;
use std::thread;

#[test]
fn test_provision_and_call() {
    let manager: SandboxManager<SimulatedEngine> = SandboxManager::new();
    let id = manager.provision(SandboxConfig::standard(), scripted_engine).unwrap();
    assert_eq!(manager.len(), 1);

    manager.call(id, "say", &[Value::from("hi")]).unwrap();
    assert_eq!(manager.take_output(id).unwrap(), b"hi".to_vec());
    assert_eq!(manager.stats(id).unwrap().state, SandboxState::Running);
}

#[test]
fn test_instances_are_isolated() {
    let manager = SandboxManager::new();
    let config = SandboxConfig::unlimited().with_instruction_limit(50);
    let a = manager.provision(config.clone(), scripted_engine).unwrap();
    let b = manager.provision(config, scripted_engine).unwrap();

    manager.call(a, "say", &[Value::from("from a")]).unwrap();
    assert!(manager.call(a, "spin", &[Value::from(500i64)]).is_err());
    manager.call(b, "spin", &[Value::from(20i64)]).unwrap();

    assert_eq!(manager.take_output(b).unwrap(), Vec::<u8>::new());
    assert_eq!(manager.take_output(a).unwrap(), b"from a".to_vec());

    let stats_a = manager.stats(a).unwrap();
    let stats_b = manager.stats(b).unwrap();
    assert_eq!(stats_a.usage.instruction.maximum, 50);
    assert_eq!(stats_b.usage.instruction.maximum, 20);
    assert_eq!(stats_a.last_error.as_str(), "instruction_limit exceeded");
    assert!(stats_b.last_error.is_empty());
}

#[test]
fn test_terminate_unregisters() {
    let manager = SandboxManager::new();
    let id = manager.provision(SandboxConfig::minimal(), scripted_engine).unwrap();
    let handle = manager.get(id).unwrap();

    assert!(manager.terminate(id));
    assert!(!manager.terminate(id));
    assert!(manager.is_empty());
    assert_eq!(handle.lock().state(), SandboxState::Terminated);
    assert_eq!(
        manager.call(id, "echo", &[]).unwrap_err(),
        SandboxError::NotFound(id)
    );
}

#[test]
fn test_parallel_instances() {
    let manager = SandboxManager::new();
    let workers: Vec<_> = (0..8)
        .map(|i| {
            let manager = manager.clone();
            thread::spawn(move || {
                let id = manager
                    .provision(SandboxConfig::standard(), scripted_engine)
                    .unwrap();
                for _ in 0..10 {
                    manager.call(id, "say", &[Value::from(i as i64)]).unwrap();
                    manager.call(id, "spin", &[Value::from(100i64)]).unwrap();
                }
                (id, i)
            })
        })
        .collect();

    for worker in workers {
        let (id, i) = worker.join().unwrap();
        let expected = i.to_string().repeat(10);
        assert_eq!(manager.take_output(id).unwrap(), expected.into_bytes());
    }
    assert_eq!(manager.len(), 8);
    assert_eq!(manager.all_stats().len(), 8);
    assert_eq!(manager.terminate_all(), 8);
    assert!(manager.is_empty());
}
