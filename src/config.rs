//! 配置模块，负责加载编译器的JSON配置文件

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// 配置加载错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {0}")]
    Missing(String),
    #[error("无法读取配置文件 {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("无法解析JSON配置文件 {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// `max_conditions` 可配置的最大值：输出树的高度不超过条件数，
/// 而序列化、比较和释放都按树高递归
pub const MAX_CONDITIONS_CEILING: usize = 2048;

/// 编译管线中三处可能累积深度的地方的上限
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// 括号嵌套的最大深度
    pub max_group_depth: usize,
    /// 运算符栈和求值栈的最大深度
    pub max_stack_depth: usize,
    /// 一个谓词中条件的最大数量，同时限制输出树的高度
    pub max_conditions: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_group_depth: 64,
            max_stack_depth: 256,
            max_conditions: 1024,
        }
    }
}

impl Limits {
    /// 把 `max_conditions` 压到 [`MAX_CONDITIONS_CEILING`] 以内
    pub fn clamped(self) -> Self {
        Self {
            max_conditions: self.max_conditions.min(MAX_CONDITIONS_CEILING),
            ..self
        }
    }
}

/// 编译器配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub limits: Limits,
}

impl CompilerConfig {
    /// 从JSON文件加载编译器配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let display = path_ref.display().to_string();

        // 检查文件是否存在
        if !path_ref.exists() {
            return Err(ConfigError::Missing(display));
        }

        // 读取文件内容
        let content = fs::read_to_string(path_ref)
            .map_err(|source| ConfigError::Read { path: display.clone(), source })?;

        Self::from_json_str(&content).map_err(|source| ConfigError::Parse { path: display, source })
    }

    /// 从JSON字符串解析配置，缺失的字段使用默认值
    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}
