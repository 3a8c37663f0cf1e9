//! Platform window probes: the OS-facing edge of the sampler.

pub mod command;
pub mod pal;
pub mod win32;
#[cfg(all(target_os = "linux", feature = "x11"))]
pub mod x11;
