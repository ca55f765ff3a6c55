//! Scripted in-memory backend.
//!
//! `FakeBackend` behaves like a small OpenCL installation described up front
//! (platforms and their devices) and keeps a ledger of every handle it hands
//! out. Any native call can be made to fail with a chosen status, which is
//! how the manager's cleanup paths are exercised without hardware.

use super::{ComputeBackend, NativeResult};
use crate::config::DeviceType;
use crate::status::Status;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Native entry points, used to script failures and read the call journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeCall {
    Platforms,
    Devices,
    CreateContext,
    ContextDevices,
    DevicePlatform,
    DeviceName,
    CreateProgram,
    BuildProgram,
    BuildLog,
    CreateQueue,
    ReleaseQueue,
    ReleaseProgram,
    ReleaseContext,
}

/// Kind of an owned handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeHandleKind {
    Context,
    Program,
    Queue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FakePlatform(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FakeDevice {
    pub platform: usize,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FakeContext(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FakeProgram(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FakeQueue(pub u64);

#[derive(Debug, Clone, Copy)]
struct PlatformLayout {
    gpus: usize,
    cpus: usize,
}

#[derive(Debug, Default)]
struct Ledger {
    contexts: HashMap<u64, FakeDevice>,
    programs: HashMap<u64, String>,
    queues: HashMap<u64, (FakeDevice, bool)>,
    acquired: usize,
    released: usize,
    calls: Vec<FakeCall>,
    releases: Vec<FakeHandleKind>,
}

#[derive(Debug)]
pub struct FakeBackend {
    platforms: Vec<PlatformLayout>,
    failures: HashMap<FakeCall, Status>,
    build_log: Option<String>,
    bound_index: usize,
    bind_foreign: bool,
    bind_none: bool,
    next_handle: AtomicU64,
    ledger: Mutex<Ledger>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    /// A host with no platforms at all.
    pub fn new() -> Self {
        Self {
            platforms: Vec::new(),
            failures: HashMap::new(),
            build_log: None,
            bound_index: 0,
            bind_foreign: false,
            bind_none: false,
            next_handle: AtomicU64::new(1),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Appends a platform exposing `gpus` GPU devices.
    pub fn with_platform(self, gpus: usize) -> Self {
        self.with_mixed_platform(gpus, 0)
    }

    /// Appends a platform exposing `gpus` GPU and `cpus` CPU devices.
    pub fn with_mixed_platform(mut self, gpus: usize, cpus: usize) -> Self {
        self.platforms.push(PlatformLayout { gpus, cpus });
        self
    }

    /// Makes `call` fail with `status` every time.
    pub fn fail_on(mut self, call: FakeCall, status: Status) -> Self {
        self.failures.insert(call, status);
        self
    }

    /// Makes the compiler reject every program with the given log.
    pub fn failing_build<S: Into<String>>(mut self, log: S) -> Self {
        self.build_log = Some(log.into());
        self
    }

    /// Contexts bind to the `index`-th matching device instead of the first.
    pub fn bind_device(mut self, index: usize) -> Self {
        self.bound_index = index;
        self
    }

    /// Contexts report a device that belongs to no enumerated platform.
    pub fn bind_foreign_device(mut self) -> Self {
        self.bind_foreign = true;
        self
    }

    /// Contexts are created but report an empty device list.
    pub fn bind_no_device(mut self) -> Self {
        self.bind_none = true;
        self
    }

    /// Handles acquired and not yet released.
    pub fn live_handles(&self) -> usize {
        let ledger = self.ledger.lock();
        ledger.acquired - ledger.released
    }

    pub fn live(&self, kind: FakeHandleKind) -> usize {
        let ledger = self.ledger.lock();
        match kind {
            FakeHandleKind::Context => ledger.contexts.len(),
            FakeHandleKind::Program => ledger.programs.len(),
            FakeHandleKind::Queue => ledger.queues.len(),
        }
    }

    pub fn acquired(&self) -> usize {
        self.ledger.lock().acquired
    }

    pub fn released(&self) -> usize {
        self.ledger.lock().released
    }

    /// Release calls that succeeded, in order.
    pub fn releases(&self) -> Vec<FakeHandleKind> {
        self.ledger.lock().releases.clone()
    }

    /// Every native call made so far, in order.
    pub fn calls(&self) -> Vec<FakeCall> {
        self.ledger.lock().calls.clone()
    }

    pub fn call_count(&self, call: FakeCall) -> usize {
        self.ledger.lock().calls.iter().filter(|c| **c == call).count()
    }

    /// Device and profiling flag a live queue was created with.
    pub fn queue_binding(&self, queue: FakeQueue) -> Option<(FakeDevice, bool)> {
        self.ledger.lock().queues.get(&queue.0).copied()
    }

    /// Options the live program was last built with.
    pub fn program_options(&self, program: FakeProgram) -> Option<String> {
        self.ledger.lock().programs.get(&program.0).cloned()
    }

    fn enter(&self, call: FakeCall) -> NativeResult<()> {
        self.ledger.lock().calls.push(call);
        match self.failures.get(&call) {
            Some(status) => Err(*status),
            None => Ok(()),
        }
    }

    fn next(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    fn layout(&self, platform: usize) -> NativeResult<PlatformLayout> {
        self.platforms
            .get(platform)
            .copied()
            .ok_or(Status::INVALID_PLATFORM)
    }

    fn matching(&self, platform: usize, device_type: DeviceType) -> NativeResult<Vec<FakeDevice>> {
        let layout = self.layout(platform)?;
        let range = match device_type {
            DeviceType::Gpu => 0..layout.gpus,
            DeviceType::Cpu => layout.gpus..layout.gpus + layout.cpus,
            DeviceType::Accelerator => 0..0,
            DeviceType::All => 0..layout.gpus + layout.cpus,
        };
        Ok(range.map(|index| FakeDevice { platform, index }).collect())
    }

    fn device_exists(&self, device: FakeDevice) -> bool {
        self.platforms
            .get(device.platform)
            .map_or(false, |layout| device.index < layout.gpus + layout.cpus)
    }
}

impl ComputeBackend for FakeBackend {
    type Platform = FakePlatform;
    type Device = FakeDevice;
    type Context = FakeContext;
    type Program = FakeProgram;
    type Queue = FakeQueue;

    fn platforms(&self) -> NativeResult<Vec<FakePlatform>> {
        self.enter(FakeCall::Platforms)?;
        Ok((0..self.platforms.len()).map(FakePlatform).collect())
    }

    fn devices(&self, platform: FakePlatform, device_type: DeviceType) -> NativeResult<Vec<FakeDevice>> {
        self.enter(FakeCall::Devices)?;
        let devices = self.matching(platform.0, device_type)?;
        if devices.is_empty() {
            return Err(Status::DEVICE_NOT_FOUND);
        }
        Ok(devices)
    }

    fn create_context(&self, platform: FakePlatform, device_type: DeviceType) -> NativeResult<FakeContext> {
        self.enter(FakeCall::CreateContext)?;
        let devices = self.matching(platform.0, device_type)?;
        let bound = if self.bind_foreign {
            FakeDevice { platform: self.platforms.len(), index: 0 }
        } else {
            let index = self.bound_index.min(devices.len().saturating_sub(1));
            *devices.get(index).ok_or(Status::DEVICE_NOT_FOUND)?
        };

        let handle = self.next();
        let mut ledger = self.ledger.lock();
        ledger.contexts.insert(handle, bound);
        ledger.acquired += 1;
        Ok(FakeContext(handle))
    }

    fn context_devices(&self, context: FakeContext) -> NativeResult<Vec<FakeDevice>> {
        self.enter(FakeCall::ContextDevices)?;
        let ledger = self.ledger.lock();
        let device = ledger.contexts.get(&context.0).ok_or(Status::INVALID_CONTEXT)?;
        if self.bind_none {
            return Ok(Vec::new());
        }
        Ok(vec![*device])
    }

    fn device_platform(&self, device: FakeDevice) -> NativeResult<FakePlatform> {
        self.enter(FakeCall::DevicePlatform)?;
        if !self.bind_foreign && !self.device_exists(device) {
            return Err(Status::INVALID_DEVICE);
        }
        Ok(FakePlatform(device.platform))
    }

    fn device_name(&self, device: FakeDevice) -> NativeResult<String> {
        self.enter(FakeCall::DeviceName)?;
        Ok(format!("Fake Device {}.{}", device.platform, device.index))
    }

    fn create_program(&self, context: FakeContext, source: &str) -> NativeResult<FakeProgram> {
        self.enter(FakeCall::CreateProgram)?;
        if source.is_empty() {
            return Err(Status::INVALID_VALUE);
        }

        let handle = self.next();
        let mut ledger = self.ledger.lock();
        if !ledger.contexts.contains_key(&context.0) {
            return Err(Status::INVALID_CONTEXT);
        }
        ledger.programs.insert(handle, String::new());
        ledger.acquired += 1;
        Ok(FakeProgram(handle))
    }

    fn build_program(&self, program: FakeProgram, _device: FakeDevice, options: &str) -> NativeResult<()> {
        self.enter(FakeCall::BuildProgram)?;
        let mut ledger = self.ledger.lock();
        let slot = ledger.programs.get_mut(&program.0).ok_or(Status::INVALID_PROGRAM)?;
        *slot = options.to_string();

        if self.build_log.is_some() {
            return Err(Status::BUILD_PROGRAM_FAILURE);
        }
        Ok(())
    }

    fn build_log(&self, program: FakeProgram, _device: FakeDevice) -> NativeResult<String> {
        self.enter(FakeCall::BuildLog)?;
        if !self.ledger.lock().programs.contains_key(&program.0) {
            return Err(Status::INVALID_PROGRAM);
        }
        Ok(self.build_log.clone().unwrap_or_default())
    }

    fn create_queue(&self, context: FakeContext, device: FakeDevice, profiling: bool) -> NativeResult<FakeQueue> {
        self.enter(FakeCall::CreateQueue)?;
        let handle = self.next();
        let mut ledger = self.ledger.lock();
        match ledger.contexts.get(&context.0) {
            Some(bound) if *bound == device => {}
            Some(_) => return Err(Status::INVALID_DEVICE),
            None => return Err(Status::INVALID_CONTEXT),
        }
        ledger.queues.insert(handle, (device, profiling));
        ledger.acquired += 1;
        Ok(FakeQueue(handle))
    }

    fn release_queue(&self, queue: FakeQueue) -> NativeResult<()> {
        self.enter(FakeCall::ReleaseQueue)?;
        let mut ledger = self.ledger.lock();
        ledger.queues.remove(&queue.0).ok_or(Status::INVALID_COMMAND_QUEUE)?;
        ledger.released += 1;
        ledger.releases.push(FakeHandleKind::Queue);
        Ok(())
    }

    fn release_program(&self, program: FakeProgram) -> NativeResult<()> {
        self.enter(FakeCall::ReleaseProgram)?;
        let mut ledger = self.ledger.lock();
        ledger.programs.remove(&program.0).ok_or(Status::INVALID_PROGRAM)?;
        ledger.released += 1;
        ledger.releases.push(FakeHandleKind::Program);
        Ok(())
    }

    fn release_context(&self, context: FakeContext) -> NativeResult<()> {
        self.enter(FakeCall::ReleaseContext)?;
        let mut ledger = self.ledger.lock();
        ledger.contexts.remove(&context.0).ok_or(Status::INVALID_CONTEXT)?;
        ledger.released += 1;
        ledger.releases.push(FakeHandleKind::Context);
        Ok(())
    }
}
