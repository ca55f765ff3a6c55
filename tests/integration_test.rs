use compute_context::backend::fake::{FakeCall, FakeHandleKind, FakePlatform};
use compute_context::prelude::*;

fn gpu_host(platform_gpus: &[usize]) -> ComputeContextManager<FakeBackend> {
    let backend = platform_gpus
        .iter()
        .fold(FakeBackend::new(), |backend, gpus| backend.with_platform(*gpus));
    ComputeContextManager::new(backend)
}

#[test]
fn test_no_instance_before_initialize() {
    let mgr = gpu_host(&[1]);
    assert!(mgr.get().is_none());
}

#[test]
fn test_initialize_teardown_cycles() {
    let mgr = gpu_host(&[0, 2]);

    for _ in 0..5 {
        mgr.initialize().unwrap();
        assert!(mgr.is_initialized());
        mgr.teardown();
        assert!(mgr.get().is_none());
    }

    let backend = mgr.backend();
    assert_eq!(backend.live_handles(), 0);
    assert_eq!(backend.acquired(), 15);
    assert_eq!(backend.released(), 15);
}

#[test]
fn test_selects_first_platform_with_gpu() {
    let mgr = gpu_host(&[0, 1, 1]);
    mgr.initialize().unwrap();
    assert_eq!(mgr.get().unwrap().platform(), FakePlatform(1));
    mgr.teardown();
}

#[test]
fn test_build_failure_scenario() {
    let mgr = ComputeContextManager::new(
        FakeBackend::new().with_platform(1).failing_build("syntax error"),
    );

    match mgr.initialize() {
        Err(ComputeError::BuildFailure { log }) => assert_eq!(log, "syntax error"),
        other => panic!("expected build failure, got {other:?}"),
    }

    assert!(mgr.get().is_none());
    assert_eq!(mgr.backend().live(FakeHandleKind::Queue), 0);
    assert_eq!(mgr.backend().live(FakeHandleKind::Context), 0);
    assert_eq!(mgr.backend().live_handles(), 0);
}

#[test]
fn test_recovers_after_failed_initialize() {
    let mgr = ComputeContextManager::new(
        FakeBackend::new()
            .with_platform(1)
            .fail_on(FakeCall::CreateQueue, Status::OUT_OF_HOST_MEMORY),
    );

    let err = mgr.initialize().unwrap_err();
    assert_eq!(err.status(), Some(Status::OUT_OF_HOST_MEMORY));
    assert_eq!(
        err.to_string(),
        "clCreateCommandQueue failed with CL_OUT_OF_HOST_MEMORY (-6)"
    );

    // Same scripted failure, same clean outcome.
    assert!(mgr.initialize().is_err());
    assert_eq!(mgr.backend().live_handles(), 0);
    assert!(mgr.get().is_none());
}

#[test]
fn test_default_config_compiles_builtin_kernel() {
    let mgr = gpu_host(&[1]);
    mgr.initialize().unwrap();

    let ctx = mgr.get().unwrap();
    assert_eq!(ctx.config().program_source, compute_context::kernels::MATMUL_SOURCE);
    assert_eq!(mgr.backend().program_options(ctx.program()).as_deref(), Some(""));
    assert_eq!(mgr.backend().queue_binding(ctx.queue()).map(|(_, p)| p), Some(true));
    drop(ctx);

    mgr.teardown();
}

#[test]
fn test_status_names_are_diagnostic_only() {
    assert_eq!(compute_context::status_name(-5), "CL_OUT_OF_RESOURCES");
    assert_eq!(compute_context::status_name(12345), "UNKNOWN ERROR CODE");
}

#[test]
#[should_panic(expected = "invalid lifecycle state")]
fn test_double_initialize_is_fatal() {
    let mgr = gpu_host(&[1]);
    mgr.initialize().unwrap();
    let _ = mgr.initialize();
}

#[test]
#[should_panic(expected = "invalid lifecycle state")]
fn test_teardown_without_initialize_is_fatal() {
    gpu_host(&[1]).teardown();
}
