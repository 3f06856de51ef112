pub mod lpc;
pub mod matrix;
pub mod mel;
pub mod melspec;
pub mod mfcc;
pub mod preprocess;
pub mod snr;

pub use lpc::{extract_lpcc, LpcConfig};
pub use matrix::Matrix;
pub use melspec::{extract_mel_template, MelTemplateConfig};
pub use mfcc::{extract_mfcc, MfccConfig};
pub use preprocess::preprocess;
pub use snr::estimate_snr_db;
