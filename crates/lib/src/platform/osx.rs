use super::{PlatformId, Toolchain};
use crate::naming::ArtifactKind;

/// Apple toolchain: `clang++`, Mach-O dynamic libraries.
#[derive(Debug, Clone, Copy, Default)]
pub struct Osx;

impl Toolchain for Osx {
  fn id(&self) -> PlatformId {
    PlatformId::Osx
  }

  fn suffix(&self, kind: ArtifactKind) -> &'static str {
    match kind {
      ArtifactKind::SharedLibrary => ".dylib",
      ArtifactKind::Archive => ".a",
      ArtifactKind::Executable | ArtifactKind::Server => "",
      ArtifactKind::Bind => ".bnd",
    }
  }

  fn linker(&self) -> &'static str {
    "clang++"
  }

  fn shared_flag(&self) -> &'static str {
    "-dynamiclib"
  }
}
