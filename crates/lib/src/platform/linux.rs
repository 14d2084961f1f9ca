use super::{PlatformId, Toolchain};
use crate::naming::ArtifactKind;

/// GNU toolchain: `g++` for linking, `ar` for archives, ELF shared objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct Linux;

impl Toolchain for Linux {
  fn id(&self) -> PlatformId {
    PlatformId::Linux
  }

  fn suffix(&self, kind: ArtifactKind) -> &'static str {
    match kind {
      ArtifactKind::SharedLibrary => ".so",
      ArtifactKind::Archive => ".a",
      ArtifactKind::Executable | ArtifactKind::Server => "",
      ArtifactKind::Bind => ".bnd",
    }
  }

  fn linker(&self) -> &'static str {
    "g++"
  }

  fn shared_flag(&self) -> &'static str {
    "-shared"
  }
}
