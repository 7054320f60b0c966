//! Balance control subsystem

pub mod mapper;
pub mod pid;
pub mod supervisor;

pub use mapper::MotorMapper;
pub use pid::{PidRegulator, PidTerms};
pub use supervisor::{BalanceSupervisor, StopReason, SupervisorState};
