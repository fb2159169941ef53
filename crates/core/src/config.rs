//! 应用配置
//!
//! 配置加载顺序：内置默认值 -> TOML 配置文件 -> `VOLUNTEER__` 前缀环境变量。
//! 匹配权重、冲突提前量等阈值均为可覆盖的配置项，而非硬编码常量。

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{EngineError, EngineResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub matcher: MatcherConfig,
    pub assignment: AssignmentConfig,
    pub conflict: ConflictConfig,
    pub pipeline: PipelineConfig,
    pub api: ApiConfig,
    pub observability: ObservabilityConfig,
}

/// 匹配评分权重，三项权重之和必须为 1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    pub skill_weight: f64,
    pub availability_weight: f64,
    pub reliability_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentConfig {
    /// 超出 volunteers_needed 的允许缓冲名额
    pub overbook_allowance: i32,
    /// 任务完成时的可靠度加分
    pub completion_bonus: i32,
    /// 缺席时的可靠度扣分（大于完成加分，惩罚不对称）
    pub no_show_penalty: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictConfig {
    /// 人员不足告警提前量（小时）
    pub understaffed_lead_hours: i64,
    /// 后台周期巡检间隔（秒）
    pub sweep_interval_seconds: u64,
    /// 是否启用后台巡检
    pub sweep_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 候选人转正后的初始可靠度
    pub initial_reliability: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enabled: bool,
    pub bind_address: String,
    pub cors_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig {
                skill_weight: 0.45,
                availability_weight: 0.35,
                reliability_weight: 0.20,
            },
            assignment: AssignmentConfig {
                overbook_allowance: 0,
                completion_bonus: 3,
                no_show_penalty: 8,
            },
            conflict: ConflictConfig {
                understaffed_lead_hours: 48,
                sweep_interval_seconds: 300,
                sweep_enabled: true,
            },
            pipeline: PipelineConfig {
                initial_reliability: 75,
            },
            api: ApiConfig {
                enabled: true,
                bind_address: "0.0.0.0:8080".to_string(),
                cors_enabled: true,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                log_format: "pretty".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// 加载配置；`config_path` 为 None 时仅使用默认值与环境变量
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let defaults = toml::to_string(&AppConfig::default())
            .context("序列化默认配置失败")?;

        let mut builder = ConfigBuilder::builder()
            .add_source(File::from_str(&defaults, FileFormat::Toml));

        if let Some(path) = config_path {
            if !Path::new(path).exists() {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        let config = builder
            .add_source(Environment::with_prefix("VOLUNTEER").separator("__"))
            .build()
            .context("构建配置失败")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("解析配置失败")?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// 配置合法性校验
    pub fn validate(&self) -> EngineResult<()> {
        let weight_sum = self.matcher.skill_weight
            + self.matcher.availability_weight
            + self.matcher.reliability_weight;
        if (weight_sum - 1.0).abs() > 1e-6 {
            return Err(EngineError::config_error(format!(
                "匹配权重之和必须为1，当前为 {weight_sum}"
            )));
        }
        if self.matcher.skill_weight < 0.0
            || self.matcher.availability_weight < 0.0
            || self.matcher.reliability_weight < 0.0
        {
            return Err(EngineError::config_error("匹配权重不能为负"));
        }
        if self.assignment.overbook_allowance < 0 {
            return Err(EngineError::config_error("超额缓冲名额不能为负"));
        }
        if self.assignment.completion_bonus < 0 || self.assignment.no_show_penalty < 0 {
            return Err(EngineError::config_error("可靠度调整值不能为负"));
        }
        if self.assignment.no_show_penalty <= self.assignment.completion_bonus {
            return Err(EngineError::config_error(
                "缺席扣分必须大于完成加分（不对称惩罚）",
            ));
        }
        if self.conflict.understaffed_lead_hours <= 0 {
            return Err(EngineError::config_error("人员不足提前量必须大于0"));
        }
        if self.conflict.sweep_interval_seconds == 0 {
            return Err(EngineError::config_error("巡检间隔必须大于0"));
        }
        if !(0..=100).contains(&self.pipeline.initial_reliability) {
            return Err(EngineError::config_error("初始可靠度必须在0-100之间"));
        }
        Ok(())
    }
}
