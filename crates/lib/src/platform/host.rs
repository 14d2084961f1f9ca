//! Host detection.
//!
//! Only used to pick a default [`PlatformId`](super::PlatformId) and for
//! `atmake info`; toolchain behaviour never depends on the host directly.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
  Linux,
  Darwin,
  Windows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
  X86_64,
  Aarch64,
}

impl Os {
  pub fn current() -> Option<Self> {
    Self::from_rust_os(std::env::consts::OS)
  }

  fn from_rust_os(os: &str) -> Option<Self> {
    match os {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::Darwin),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::Darwin => "darwin",
      Self::Windows => "windows",
    }
  }
}

impl Arch {
  pub fn current() -> Option<Self> {
    match std::env::consts::ARCH {
      "x86_64" => Some(Self::X86_64),
      "aarch64" => Some(Self::Aarch64),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86_64 => "x86_64",
      Self::Aarch64 => "aarch64",
    }
  }
}

/// The machine atmake runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Host {
  pub arch: Arch,
  pub os: Os,
}

impl Host {
  pub fn new(arch: Arch, os: Os) -> Self {
    Self { arch, os }
  }

  /// `None` if either the OS or the architecture is unknown.
  pub fn current() -> Option<Self> {
    Some(Self {
      arch: Arch::current()?,
      os: Os::current()?,
    })
  }

  /// "arch-os", e.g. "x86_64-linux".
  pub fn triple(&self) -> String {
    format!("{}-{}", self.arch.as_str(), self.os.as_str())
  }
}

impl fmt::Display for Host {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.triple())
  }
}
