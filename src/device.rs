// ===== DEVICE ENUM =====

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Compute device for tensor operations
///
/// Only the CPU backend is implemented. `Accelerator` exists so that
/// callers can ask for one; resolving it falls back to the CPU when no
/// accelerator backend is compiled in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    CPU,
    Accelerator,
}

impl Device {
    #[must_use]
    pub const fn is_cpu(&self) -> bool {
        matches!(self, Device::CPU)
    }

    #[must_use]
    pub const fn is_accelerator(&self) -> bool {
        matches!(self, Device::Accelerator)
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Device::CPU => "cpu",
            Device::Accelerator => "accelerator",
        }
    }

    /// Whether tensors can actually live on this device in this build.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        match self {
            Device::CPU => true,
            Device::Accelerator => false,
        }
    }

    /// Parse a device selector and resolve it to a usable device.
    ///
    /// Accepts `"cpu"` and `"accelerator"` in any letter case. An
    /// unavailable accelerator downgrades to the CPU with a warning.
    pub fn resolve(selector: &str) -> Result<Device> {
        let requested: Device = selector.parse()?;
        if requested.is_available() {
            return Ok(requested);
        }
        log::warn!(
            "device '{}' requested but no accelerator backend is available, using cpu",
            requested.name()
        );
        Ok(Device::CPU)
    }
}

impl FromStr for Device {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Device::CPU),
            "accelerator" => Ok(Device::Accelerator),
            other => Err(Error::InvalidArgument(format!(
                "device '{other}' is not valid, please specify 'cpu' or 'accelerator'"
            ))),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("CPU".parse::<Device>().ok(), Some(Device::CPU));
        assert_eq!(" Accelerator ".parse::<Device>().ok(), Some(Device::Accelerator));
    }

    #[test]
    fn test_rejects_unknown_selector() {
        for bad in ["gpu", "cuda", "", "cpu0"] {
            let err = bad.parse::<Device>();
            assert!(matches!(err, Err(Error::InvalidArgument(_))), "{bad:?}");
        }
    }

    #[test]
    fn test_accelerator_falls_back_to_cpu() {
        let device = Device::resolve("accelerator").ok();
        assert_eq!(device, Some(Device::CPU));
    }

    #[test]
    fn test_display_matches_selector() {
        assert_eq!(Device::CPU.to_string(), "cpu");
        assert_eq!(Device::Accelerator.to_string(), "accelerator");
    }
}
