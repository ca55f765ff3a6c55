pub use crate::backend::{ComputeBackend, FakeBackend};
pub use crate::config::{ContextConfig, ContextConfigBuilder, DeviceType};
pub use crate::error::{ComputeError, Result};
pub use crate::manager::{ComputeContext, ComputeContextManager, ContextGuard};
pub use crate::status::Status;

#[cfg(feature = "opencl")]
pub use crate::backend::OpenClBackend;

#[cfg(feature = "opencl")]
pub use crate::{get, initialize, initialize_with_config, teardown};
