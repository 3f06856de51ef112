pub mod distance;
pub mod dtw;
pub mod method;
pub mod methods;
pub mod registry;
pub mod template_store;

pub use method::{Decision, FeatureKind, MatchMethod, MethodResult, RankedTemplate};
pub use methods::{FastLpcMatcher, MelCosineMatcher, MfccDtwMatcher, SlowLpcDtwMatcher};
pub use registry::MatchMethodRegistry;
pub use template_store::{Template, TemplateStore};
