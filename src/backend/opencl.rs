//! OpenCL backend over the `cl3` bindings.
//!
//! Only platform and device ids are left unreleased: they are not reference
//! counted for root devices, so there is nothing to give back.

use super::{ComputeBackend, NativeResult};
use crate::config::DeviceType;
use crate::status::Status;
use cl3::command_queue::CL_QUEUE_PROFILING_ENABLE;
use cl3::context::{CL_CONTEXT_DEVICES, CL_CONTEXT_PLATFORM};
use cl3::device::{
    CL_DEVICE_NAME, CL_DEVICE_PLATFORM, CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_ALL,
    CL_DEVICE_TYPE_CPU, CL_DEVICE_TYPE_GPU,
};
use cl3::program::CL_PROGRAM_BUILD_LOG;
use cl3::types::{
    cl_command_queue, cl_context, cl_context_properties, cl_device_id, cl_device_type,
    cl_platform_id, cl_program,
};
use std::ffi::CString;
use std::ptr;

macro_rules! cl_handle {
    ($(#[$meta:meta])* $name:ident($raw:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name($raw);

        // OpenCL objects other than kernels are safe to use from any thread.
        unsafe impl Send for $name {}
        unsafe impl Sync for $name {}

        impl $name {
            pub fn as_raw(self) -> $raw {
                self.0
            }
        }
    };
}

cl_handle!(ClPlatform(cl_platform_id));
cl_handle!(ClDevice(cl_device_id));
cl_handle!(ClContext(cl_context));
cl_handle!(ClProgram(cl_program));
cl_handle!(ClQueue(cl_command_queue));

fn device_type_bits(device_type: DeviceType) -> cl_device_type {
    match device_type {
        DeviceType::Gpu => CL_DEVICE_TYPE_GPU,
        DeviceType::Cpu => CL_DEVICE_TYPE_CPU,
        DeviceType::Accelerator => CL_DEVICE_TYPE_ACCELERATOR,
        DeviceType::All => CL_DEVICE_TYPE_ALL,
    }
}

/// The host's OpenCL installation, reached through the ICD loader.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenClBackend;

#[allow(unused_unsafe)]
impl ComputeBackend for OpenClBackend {
    type Platform = ClPlatform;
    type Device = ClDevice;
    type Context = ClContext;
    type Program = ClProgram;
    type Queue = ClQueue;

    fn platforms(&self) -> NativeResult<Vec<ClPlatform>> {
        let ids = cl3::platform::get_platform_ids().map_err(Status)?;
        Ok(ids.into_iter().map(ClPlatform).collect())
    }

    fn devices(&self, platform: ClPlatform, device_type: DeviceType) -> NativeResult<Vec<ClDevice>> {
        let ids = cl3::device::get_device_ids(platform.0, device_type_bits(device_type))
            .map_err(Status)?;
        Ok(ids.into_iter().map(ClDevice).collect())
    }

    fn create_context(&self, platform: ClPlatform, device_type: DeviceType) -> NativeResult<ClContext> {
        let properties = [
            CL_CONTEXT_PLATFORM as cl_context_properties,
            platform.0 as cl_context_properties,
            0,
        ];
        let context = unsafe {
            cl3::context::create_context_from_type(
                device_type_bits(device_type),
                properties.as_ptr(),
                None,
                ptr::null_mut(),
            )
        }
        .map_err(Status)?;
        Ok(ClContext(context))
    }

    fn context_devices(&self, context: ClContext) -> NativeResult<Vec<ClDevice>> {
        let info = cl3::context::get_context_info(context.0, CL_CONTEXT_DEVICES).map_err(Status)?;
        let raw: Vec<isize> = info.into();
        Ok(raw.into_iter().map(|id| ClDevice(id as cl_device_id)).collect())
    }

    fn device_platform(&self, device: ClDevice) -> NativeResult<ClPlatform> {
        let info = cl3::device::get_device_info(device.0, CL_DEVICE_PLATFORM).map_err(Status)?;
        let raw: isize = info.into();
        Ok(ClPlatform(raw as cl_platform_id))
    }

    fn device_name(&self, device: ClDevice) -> NativeResult<String> {
        let info = cl3::device::get_device_info(device.0, CL_DEVICE_NAME).map_err(Status)?;
        let name: String = info.into();
        Ok(name.trim_end_matches('\0').trim().to_string())
    }

    fn create_program(&self, context: ClContext, source: &str) -> NativeResult<ClProgram> {
        let program = unsafe { cl3::program::create_program_with_source(context.0, &[source]) }
            .map_err(Status)?;
        Ok(ClProgram(program))
    }

    fn build_program(&self, program: ClProgram, device: ClDevice, options: &str) -> NativeResult<()> {
        let options = CString::new(options).map_err(|_| Status::INVALID_BUILD_OPTIONS)?;
        unsafe { cl3::program::build_program(program.0, &[device.0], &options, None, ptr::null_mut()) }
            .map_err(Status)
    }

    fn build_log(&self, program: ClProgram, device: ClDevice) -> NativeResult<String> {
        let info = cl3::program::get_program_build_info(program.0, device.0, CL_PROGRAM_BUILD_LOG)
            .map_err(Status)?;
        let log: String = info.into();
        Ok(log.trim_end_matches(|c: char| c == '\0' || c.is_whitespace()).to_string())
    }

    fn create_queue(&self, context: ClContext, device: ClDevice, profiling: bool) -> NativeResult<ClQueue> {
        let properties = if profiling { CL_QUEUE_PROFILING_ENABLE } else { 0 };
        #[allow(deprecated)]
        let queue = unsafe { cl3::command_queue::create_command_queue(context.0, device.0, properties) }
            .map_err(Status)?;
        Ok(ClQueue(queue))
    }

    fn release_queue(&self, queue: ClQueue) -> NativeResult<()> {
        unsafe { cl3::command_queue::release_command_queue(queue.0) }.map_err(Status)
    }

    fn release_program(&self, program: ClProgram) -> NativeResult<()> {
        unsafe { cl3::program::release_program(program.0) }.map_err(Status)
    }

    fn release_context(&self, context: ClContext) -> NativeResult<()> {
        unsafe { cl3::context::release_context(context.0) }.map_err(Status)
    }
}
