//! 引擎基础设施：统一错误类型与配置模型

pub mod config;
pub mod errors;

pub use config::{
    ApiConfig, AppConfig, AssignmentConfig, ConflictConfig, MatcherConfig, ObservabilityConfig,
    PipelineConfig,
};
pub use errors::{EngineError, EngineResult};
