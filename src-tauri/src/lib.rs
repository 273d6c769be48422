pub mod backend_config;
pub mod backend_readiness;
pub mod client_config;
pub mod client_identity;
pub mod directory_picker;
pub mod errors;
pub mod launch_plan;
pub mod logging;
pub mod origin_policy;
pub mod port_allocator;
pub mod process_control;
pub mod process_monitor;
pub mod run_mode;
pub mod runtime_config;
pub mod runtime_paths;
pub mod shutdown_gate;
pub mod supervisor;
pub mod supervisor_state;

pub use errors::{startup_failure_message, ConfigDegraded, SupervisorError};
pub use supervisor::{BackendEndpoint, Supervisor, SupervisorOptions};
pub use supervisor_state::SupervisorState;
