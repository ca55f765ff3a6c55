//! Single-instance compute context lifecycle.
//!
//! A [`ComputeContextManager`] holds at most one live [`ComputeContext`].
//! `initialize` either publishes a fully built context or leaves nothing
//! behind; `teardown` releases every handle and clears the slot. Calling
//! either out of order is a contract violation and panics.

use crate::backend::{ComputeBackend, NativeResult};
use crate::config::{ContextConfig, DeviceType};
use crate::error::{invalid_state, ComputeError, Result};
use crate::status::Status;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use std::fmt::Debug;
use tracing::{debug, info, warn};

/// Read access to the live context. Teardown waits until every guard is gone.
pub type ContextGuard<'a, B> = MappedRwLockReadGuard<'a, ComputeContext<B>>;

/// Handles of a fully initialized compute context.
#[derive(Debug)]
pub struct ComputeContext<B: ComputeBackend> {
    platform: B::Platform,
    device: B::Device,
    context: B::Context,
    program: B::Program,
    queue: B::Queue,
    device_name: Option<String>,
    config: ContextConfig,
}

impl<B: ComputeBackend> ComputeContext<B> {
    pub fn platform(&self) -> B::Platform {
        self.platform
    }

    /// Device the context was actually bound to.
    pub fn device(&self) -> B::Device {
        self.device
    }

    pub fn context(&self) -> B::Context {
        self.context
    }

    pub fn program(&self) -> B::Program {
        self.program
    }

    pub fn queue(&self) -> B::Queue {
        self.queue
    }

    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    fn release(self, backend: &B) {
        // Guards drop in reverse: queue, context, program.
        let _program = Owned::new(backend, self.program, B::release_program, "program");
        let _context = Owned::new(backend, self.context, B::release_context, "context");
        let _queue = Owned::new(backend, self.queue, B::release_queue, "queue");
    }
}

/// Releases a native handle on drop unless it was kept.
struct Owned<'b, B: ComputeBackend, H: Copy + Debug> {
    backend: &'b B,
    handle: H,
    release: fn(&B, H) -> NativeResult<()>,
    what: &'static str,
    armed: bool,
}

impl<'b, B: ComputeBackend, H: Copy + Debug> Owned<'b, B, H> {
    fn new(backend: &'b B, handle: H, release: fn(&B, H) -> NativeResult<()>, what: &'static str) -> Self {
        Self {
            backend,
            handle,
            release,
            what,
            armed: true,
        }
    }

    fn get(&self) -> H {
        self.handle
    }

    fn keep(mut self) -> H {
        self.armed = false;
        self.handle
    }
}

impl<'b, B: ComputeBackend, H: Copy + Debug> Drop for Owned<'b, B, H> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match (self.release)(self.backend, self.handle) {
            Ok(()) => debug!(handle = ?self.handle, "released {}", self.what),
            Err(status) => warn!(handle = ?self.handle, %status, "failed to release {}", self.what),
        }
    }
}

pub struct ComputeContextManager<B: ComputeBackend> {
    backend: B,
    slot: RwLock<Option<ComputeContext<B>>>,
}

impl<B: ComputeBackend> ComputeContextManager<B> {
    pub const fn new(backend: B) -> Self {
        Self {
            backend,
            slot: RwLock::new(None),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn initialize(&self) -> Result<()> {
        self.initialize_with_config(&ContextConfig::default())
    }

    /// Builds and publishes the compute context.
    ///
    /// On error nothing is published and every handle acquired by this call
    /// has been released.
    ///
    /// # Panics
    ///
    /// If a context is already live.
    pub fn initialize_with_config(&self, config: &ContextConfig) -> Result<()> {
        let mut slot = self.slot.write();
        if slot.is_some() {
            invalid_state("initialize called while a compute context is live");
        }

        config.validate()?;
        info!(device_type = ?config.device_type, "initializing compute context");

        let live = self.acquire(config)?;
        info!(
            platform = ?live.platform,
            device = ?live.device,
            name = live.device_name().unwrap_or("<unknown>"),
            "compute context ready"
        );

        *slot = Some(live);
        Ok(())
    }

    /// Releases queue, context and program, then clears the slot.
    ///
    /// Must not be called while the same thread holds a [`ContextGuard`].
    ///
    /// # Panics
    ///
    /// If no context is live.
    pub fn teardown(&self) {
        let mut slot = self.slot.write();
        let Some(live) = slot.take() else {
            invalid_state("teardown called without a live compute context");
        };

        live.release(&self.backend);
        info!("compute context torn down");
    }

    /// Live context, if any.
    ///
    /// Takes a recursive read lock, so a thread already holding a guard can
    /// call `get` again while a lifecycle call is queued for the write lock.
    pub fn get(&self) -> Option<ContextGuard<'_, B>> {
        RwLockReadGuard::try_map(self.slot.read_recursive(), Option::as_ref).ok()
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.read_recursive().is_some()
    }

    fn acquire(&self, config: &ContextConfig) -> Result<ComputeContext<B>> {
        let backend = &self.backend;
        let platform = self.select_platform(config.device_type)?;

        let context = backend
            .create_context(platform, config.device_type)
            .map_err(|status| ComputeError::native("clCreateContextFromType", status))?;
        let context = Owned::new(backend, context, B::release_context, "context");

        let device = self.bound_device(context.get(), platform)?;
        let device_name = match backend.device_name(device) {
            Ok(name) => Some(name),
            Err(status) => {
                debug!(%status, "device name unavailable");
                None
            }
        };

        let program = backend
            .create_program(context.get(), &config.program_source)
            .map_err(|status| ComputeError::native("clCreateProgramWithSource", status))?;
        let program = Owned::new(backend, program, B::release_program, "program");
        self.build(program.get(), device, &config.build_options)?;

        let queue = backend
            .create_queue(context.get(), device, config.profiling)
            .map_err(|status| ComputeError::native("clCreateCommandQueue", status))?;
        let queue = Owned::new(backend, queue, B::release_queue, "queue");

        Ok(ComputeContext {
            platform,
            device,
            queue: queue.keep(),
            program: program.keep(),
            context: context.keep(),
            device_name,
            config: config.clone(),
        })
    }

    /// First platform exposing at least one device of `device_type`.
    fn select_platform(&self, device_type: DeviceType) -> Result<B::Platform> {
        let platforms = match self.backend.platforms() {
            Ok(platforms) => platforms,
            Err(Status::PLATFORM_NOT_FOUND_KHR) => Vec::new(),
            Err(status) => return Err(ComputeError::native("clGetPlatformIDs", status)),
        };
        if platforms.is_empty() {
            return Err(ComputeError::NoPlatform);
        }
        debug!(count = platforms.len(), "enumerated compute platforms");

        for platform in platforms {
            match self.backend.devices(platform, device_type) {
                Ok(devices) if !devices.is_empty() => {
                    info!(?platform, devices = devices.len(), "selected compute platform");
                    return Ok(platform);
                }
                Ok(_) | Err(Status::DEVICE_NOT_FOUND) => {
                    debug!(?platform, "no matching device on platform");
                }
                Err(status) => return Err(ComputeError::native("clGetDeviceIDs", status)),
            }
        }

        Err(ComputeError::NoDevice)
    }

    fn bound_device(&self, context: B::Context, platform: B::Platform) -> Result<B::Device> {
        let devices = self
            .backend
            .context_devices(context)
            .map_err(|status| ComputeError::native("clGetContextInfo", status))?;
        let device = *devices.first().ok_or(ComputeError::NoDevice)?;

        let owner = self
            .backend
            .device_platform(device)
            .map_err(|status| ComputeError::native("clGetDeviceInfo", status))?;
        if owner != platform {
            warn!(?device, ?owner, ?platform, "context bound a device from another platform");
            return Err(ComputeError::native("clGetContextInfo", Status::INVALID_DEVICE));
        }

        Ok(device)
    }

    fn build(&self, program: B::Program, device: B::Device, options: &str) -> Result<()> {
        match self.backend.build_program(program, device, options) {
            Ok(()) => Ok(()),
            Err(Status::BUILD_PROGRAM_FAILURE) => {
                let log = self.backend.build_log(program, device).unwrap_or_else(|status| {
                    warn!(%status, "build log unavailable");
                    String::new()
                });
                Err(ComputeError::build(log))
            }
            Err(status) => Err(ComputeError::native("clBuildProgram", status)),
        }
    }
}

impl<B: ComputeBackend + Debug> Debug for ComputeContextManager<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeContextManager")
            .field("backend", &self.backend)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl<B: ComputeBackend> Drop for ComputeContextManager<B> {
    fn drop(&mut self) {
        if self.slot.get_mut().is_some() {
            warn!("compute context manager dropped while live; native handles are not released");
        }
    }
}
