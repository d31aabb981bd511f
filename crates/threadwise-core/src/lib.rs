pub mod ai;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod telemetry;

pub use ai::{Analyzer, Moderator, ProviderRegistry};
pub use clients::{ClientConfigSource, ClientConfiguration, ConfigDomain, StaticConfigSource};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use models::{
    AnalysisOutcome, AnalysisResult, Comment, CreatedAt, HighlightedComment, ModerationVerdict,
    PreviousAnalysis, Sentiment,
};
