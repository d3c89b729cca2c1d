//! Command implementations.

mod info;
mod mock_device;
mod run;
mod validate;

pub use info::run_info;
pub use mock_device::run_mock_device;
pub use run::run_pipeline;
pub use validate::run_validate;
