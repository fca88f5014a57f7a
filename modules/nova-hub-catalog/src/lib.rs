//! Postgres-backed catalog: typed models and hand-written queries over the
//! schema in `migrations/`. No ORM — each model is a thin `sqlx::FromRow`
//! struct with inherent async methods, one file per table.

pub mod client;
pub mod league;
pub mod membership;
pub mod packet;
pub mod processing_artifact;
pub mod processing_run;
pub mod sequence_alert;
#[cfg(feature = "test-utils")]
pub mod testutil;

pub use client::Client;
pub use league::League;
pub use membership::Membership;
pub use packet::Packet;
pub use processing_artifact::ProcessingArtifact;
pub use processing_run::ProcessingRun;
pub use sequence_alert::SequenceAlert;
