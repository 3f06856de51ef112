pub mod config;
pub mod filter_chain;
pub mod manager;
pub mod peak_detector;
pub mod serial;

pub use config::EcgConfig;
pub use filter_chain::EcgFilterChain;
pub use manager::{default_opener, EcgManager, ManagerState};
pub use peak_detector::{PeakDetector, PeakDetectorConfig, PeakEvent};
pub use serial::{parse_ecg_line, SerialPort};
