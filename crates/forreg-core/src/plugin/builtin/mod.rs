/// Plugins shipped with ForReg.
mod dummy;
mod os_info;
mod report;

pub use dummy::Dummy;
pub use os_info::OsInfo;
