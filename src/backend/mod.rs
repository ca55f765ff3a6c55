//! Native compute API seam.
//!
//! [`ComputeBackend`] is the whole outbound surface the manager needs. Handles
//! are opaque `Copy` tokens; ownership is tracked by the manager, which pairs
//! every successful `create_*` with exactly one `release_*`.

pub mod fake;
#[cfg(feature = "opencl")]
pub mod opencl;

pub use fake::{FakeBackend, FakeCall};
#[cfg(feature = "opencl")]
pub use opencl::OpenClBackend;

use crate::config::DeviceType;
use crate::status::Status;
use std::fmt::Debug;

/// Result of a single native call.
pub type NativeResult<T> = std::result::Result<T, Status>;

pub trait ComputeBackend: Send + Sync {
    type Platform: Copy + Eq + Debug + Send + Sync;
    type Device: Copy + Eq + Debug + Send + Sync;
    type Context: Copy + Debug + Send + Sync;
    type Program: Copy + Debug + Send + Sync;
    type Queue: Copy + Debug + Send + Sync;

    /// Platforms in enumeration order.
    fn platforms(&self) -> NativeResult<Vec<Self::Platform>>;

    /// Devices of `device_type` on `platform`. "None found" may be reported
    /// either as an empty list or as `Status::DEVICE_NOT_FOUND`.
    fn devices(
        &self,
        platform: Self::Platform,
        device_type: DeviceType,
    ) -> NativeResult<Vec<Self::Device>>;

    fn create_context(
        &self,
        platform: Self::Platform,
        device_type: DeviceType,
    ) -> NativeResult<Self::Context>;

    /// Devices actually bound to `context`.
    fn context_devices(&self, context: Self::Context) -> NativeResult<Vec<Self::Device>>;

    fn device_platform(&self, device: Self::Device) -> NativeResult<Self::Platform>;

    fn device_name(&self, device: Self::Device) -> NativeResult<String>;

    fn create_program(&self, context: Self::Context, source: &str) -> NativeResult<Self::Program>;

    fn build_program(
        &self,
        program: Self::Program,
        device: Self::Device,
        options: &str,
    ) -> NativeResult<()>;

    fn build_log(&self, program: Self::Program, device: Self::Device) -> NativeResult<String>;

    fn create_queue(
        &self,
        context: Self::Context,
        device: Self::Device,
        profiling: bool,
    ) -> NativeResult<Self::Queue>;

    fn release_queue(&self, queue: Self::Queue) -> NativeResult<()>;

    fn release_program(&self, program: Self::Program) -> NativeResult<()>;

    fn release_context(&self, context: Self::Context) -> NativeResult<()>;
}
