pub mod connector;
pub mod env;
pub mod llm;

pub use connector::{ConnectorCheck, ConnectorCredentials, ConnectorError, ConnectorReport};
pub use env::{EnvEntry, EnvReport};
pub use llm::{FailureReason, GatewayCheck, ModelProbe, ProbeOutcome};
