use crate::error::{ComputeError, Result};
use crate::kernels::MATMUL_SOURCE;
use std::borrow::Cow;

/// Device class a context is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceType {
    #[default]
    Gpu,
    Cpu,
    Accelerator,
    All,
}

#[derive(Debug, Clone)]
pub struct ContextConfig {
    pub device_type: DeviceType,
    pub build_options: String,
    pub profiling: bool,
    pub program_source: Cow<'static, str>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            device_type: DeviceType::Gpu,
            build_options: String::new(),
            profiling: true,
            program_source: Cow::Borrowed(MATMUL_SOURCE),
        }
    }
}

impl ContextConfig {
    pub fn builder() -> ContextConfigBuilder {
        ContextConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if self.program_source.trim().is_empty() {
            return Err(ComputeError::config("program_source must not be empty"));
        }

        if self.program_source.contains('\0') {
            return Err(ComputeError::config("program_source must not contain NUL"));
        }

        if self.build_options.contains('\0') {
            return Err(ComputeError::config("build_options must not contain NUL"));
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ContextConfigBuilder {
    config: ContextConfig,
}

impl ContextConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ContextConfig::default(),
        }
    }

    pub fn device_type(mut self, device_type: DeviceType) -> Self {
        self.config.device_type = device_type;
        self
    }

    pub fn build_options<S: Into<String>>(mut self, options: S) -> Self {
        self.config.build_options = options.into();
        self
    }

    pub fn profiling(mut self, enable: bool) -> Self {
        self.config.profiling = enable;
        self
    }

    pub fn program_source<S: Into<Cow<'static, str>>>(mut self, source: S) -> Self {
        self.config.program_source = source.into();
        self
    }

    pub fn build(self) -> Result<ContextConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ContextConfig::default();
        assert_eq!(config.device_type, DeviceType::Gpu);
        assert!(config.build_options.is_empty());
        assert!(config.profiling);
        assert_eq!(config.program_source, MATMUL_SOURCE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = ContextConfig::builder()
            .device_type(DeviceType::Cpu)
            .build_options("-cl-fast-relaxed-math")
            .profiling(false)
            .program_source("__kernel void noop() {}")
            .build()
            .unwrap();

        assert_eq!(config.device_type, DeviceType::Cpu);
        assert_eq!(config.build_options, "-cl-fast-relaxed-math");
        assert!(!config.profiling);
        assert_eq!(config.program_source, "__kernel void noop() {}");
    }

    #[test]
    fn test_rejects_empty_source() {
        let err = ContextConfig::builder().program_source("  \n").build().unwrap_err();
        assert!(matches!(err, ComputeError::Config(_)));
    }

    #[test]
    fn test_rejects_nul_in_options() {
        let err = ContextConfig::builder().build_options("-D X\0").build().unwrap_err();
        assert_eq!(err, ComputeError::config("build_options must not contain NUL"));
    }
}
