pub mod config;
pub mod controller;
pub mod templates;
pub mod voter;

pub use config::{LpcMatcherMode, VoiceConfig, VotingMode};
pub use controller::{CalibrationHandle, VoiceController};
pub use templates::{load_template_directory, CommandMapping};
pub use voter::{vote, AdaptiveWeightTable, Label, VoteOutcome};
