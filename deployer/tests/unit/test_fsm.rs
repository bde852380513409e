//! FSM unit tests

use miner_deploy::deploy::fsm::{LifecycleEvent, LifecycleFsm, LifecycleState};

#[test]
fn test_fsm_initial_state() {
    let fsm = LifecycleFsm::new();
    assert_eq!(fsm.state(), LifecycleState::Stopped);
    assert!(fsm.error().is_none());
}

#[test]
fn test_fsm_start_success_flow() {
    let mut fsm = LifecycleFsm::new();

    // Stopped -> Starting
    fsm.process(LifecycleEvent::Start).unwrap();
    assert_eq!(fsm.state(), LifecycleState::Starting);

    // Starting -> Running
    fsm.process(LifecycleEvent::Up).unwrap();
    assert_eq!(fsm.state(), LifecycleState::Running);
}

#[test]
fn test_fsm_start_failure_flow() {
    let mut fsm = LifecycleFsm::new();

    fsm.process(LifecycleEvent::Start).unwrap();
    fsm.process(LifecycleEvent::Fail("exited with code 1".to_string())).unwrap();

    assert_eq!(fsm.state(), LifecycleState::Failed);
    assert_eq!(fsm.error(), Some("exited with code 1"));
}

#[test]
fn test_fsm_terminal_states() {
    let mut running = LifecycleFsm::new();
    running.process(LifecycleEvent::Start).unwrap();
    running.process(LifecycleEvent::Up).unwrap();
    assert!(running.process(LifecycleEvent::Start).is_err());
    assert!(running.process(LifecycleEvent::Fail("late".to_string())).is_err());

    let mut failed = LifecycleFsm::new();
    failed.process(LifecycleEvent::Start).unwrap();
    failed.process(LifecycleEvent::Fail("boom".to_string())).unwrap();
    assert!(failed.process(LifecycleEvent::Up).is_err());
}

#[test]
fn test_fsm_invalid_transition() {
    let mut fsm = LifecycleFsm::new();

    // Cannot be up before starting
    let result = fsm.process(LifecycleEvent::Up);
    assert!(result.is_err());
}
