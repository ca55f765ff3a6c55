//! compute-context - single-instance GPU compute context bootstrap
//!
//! Discovers a GPU compute device, creates a context on it, compiles a
//! built-in program and opens a profiling command queue. The result is held
//! by a [`ComputeContextManager`] with an explicit `initialize` / `teardown`
//! lifecycle and released deterministically.
//!
//! # Quick Start
//!
//! ```
//! use compute_context::{ComputeContextManager, FakeBackend};
//!
//! let manager = ComputeContextManager::new(FakeBackend::new().with_platform(1));
//! manager.initialize().unwrap();
//!
//! if let Some(ctx) = manager.get() {
//!     println!("running on {:?}", ctx.device_name());
//! }
//!
//! manager.teardown();
//! assert!(manager.get().is_none());
//! ```
//!
//! With the `opencl` feature the same lifecycle is available process-wide
//! through the crate-level `initialize`, `teardown` and `get` functions.
//!
//! # Backends
//!
//! - [`FakeBackend`]: scripted in-memory platform layer, always available
//! - `OpenClBackend`: the host's OpenCL runtime (feature `opencl`)
//!
//! # Lifecycle rules
//!
//! Initializing twice, or tearing down without a live context, is a
//! programming error and panics. Every other failure is returned as a
//! [`ComputeError`] and leaves no native handle behind.

#![warn(missing_debug_implementations)]

pub mod backend;
pub mod config;
pub mod error;
pub mod kernels;
pub mod manager;
pub mod prelude;
pub mod status;

pub use backend::{ComputeBackend, FakeBackend};
pub use config::{ContextConfig, ContextConfigBuilder, DeviceType};
pub use error::{ComputeError, Result};
pub use manager::{ComputeContext, ComputeContextManager, ContextGuard};
pub use status::{status_name, Status};

#[cfg(feature = "opencl")]
pub use backend::OpenClBackend;

#[cfg(feature = "opencl")]
static GLOBAL: ComputeContextManager<OpenClBackend> = ComputeContextManager::new(OpenClBackend);

/// Process-wide manager over the host OpenCL runtime.
#[cfg(feature = "opencl")]
pub fn global() -> &'static ComputeContextManager<OpenClBackend> {
    &GLOBAL
}

#[cfg(feature = "opencl")]
pub fn initialize() -> Result<()> {
    GLOBAL.initialize()
}

#[cfg(feature = "opencl")]
pub fn initialize_with_config(config: &ContextConfig) -> Result<()> {
    GLOBAL.initialize_with_config(config)
}

#[cfg(feature = "opencl")]
pub fn teardown() {
    GLOBAL.teardown()
}

#[cfg(feature = "opencl")]
pub fn get() -> Option<ContextGuard<'static, OpenClBackend>> {
    GLOBAL.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports_drive_a_full_cycle() {
        let mgr = ComputeContextManager::new(FakeBackend::new().with_platform(1));
        mgr.initialize().unwrap();
        assert!(mgr.get().is_some());
        mgr.teardown();
        assert!(mgr.get().is_none());
    }
}
