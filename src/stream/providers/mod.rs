//! Source-site providers

pub mod guardahd;
pub mod vix;

pub use guardahd::GuardaHdProvider;
pub use vix::VixProvider;
