pub mod backoff;
pub mod client;
pub mod clock;
pub mod config;
pub mod lifecycle;
pub mod session;
pub mod testing;
pub mod ticket;

pub use backoff::{AdmissionBackoffPolicy, BackoffPolicy, DelaySampler};
pub use client::{
    AdmissionSignal, HttpWaitingRoomClient, SiteClient, TicketClient, TicketClientError,
    TicketResponse,
};
pub use clock::{Clock, SystemClock};
pub use config::{
    load_config, load_config_from_str, validate_config, BackoffConfig, Config, ConfigError,
    SessionConfig, SwarmConfig, TargetConfig, TimingConfig,
};
pub use lifecycle::{Admission, LifecycleError, LifecycleOptions, TicketPhase, TicketStateMachine};
pub use session::{IterationReport, SessionError, VirtualUserSession};
pub use ticket::{CheckInRequest, Ticket, TicketStatus};
