mod class;
mod config;
mod error;
mod job;
mod username;

pub use class::{classify, Class};
pub use config::{ClientConfig, RegistryConfig, WorkerConfig};
pub use error::ConfigError;
pub use job::{n_packets_for, ClientStage, Job, WorkerStage, PACKET_SIZE};
pub use username::Username;
