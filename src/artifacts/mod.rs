//! 产物存储 - 确定性路径分配与工具产出的持久化
//!
//! 磁盘命名空间按 {输出根目录}/{执行标识}/{主体}/{工具}/{调用标识}-* 划分，
//! 同一次运行的全部产物都可以通过执行标识前缀扫描发现。

use anyhow::{Context, Result};
use chrono::Utc;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::fs;
use walkdir::WalkDir;

static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("invalid slug pattern"));

/// 将主体名称转换为路径安全的slug
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let slug = SLUG_PATTERN.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "unnamed".to_string()
    } else {
        slug
    }
}

fn random_hex(len: usize) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut rng = rand::rng();
    (0..len)
        .map(|_| HEX[rng.random_range(0..HEX.len())] as char)
        .collect()
}

/// 执行标识 - 每次运行铸造一次，全局唯一且可按字典序排序
/// 形如 20260830T142501-3fa9c27b，时间戳前缀保证排序性，随机后缀保证并发运行互不相撞
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionId(String);

impl ExecutionId {
    pub fn mint() -> Self {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S");
        Self(format!("{}-{}", stamp, random_hex(8)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 调用标识 - 每次工具调用在写盘前铸造，同一 工具+主体 下也不会相撞
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallId(String);

impl CallId {
    pub fn mint() -> Self {
        let stamp = Utc::now().format("%H%M%S%3f");
        Self(format!("{}-{}", stamp, random_hex(6)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 产物类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    #[serde(rename = "data")]
    Data,
    #[serde(rename = "chart")]
    Chart,
}

/// 产物引用 - 写盘时创建，替代原始负载返回给模型与报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactReference {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub tool_name: String,
    pub subject: String,
}

/// 产物存储 - 独占一次运行的磁盘命名空间，其他组件不得直接写入
#[derive(Clone)]
pub struct ArtifactStore {
    output_root: PathBuf,
    execution_id: ExecutionId,
}

impl ArtifactStore {
    pub fn new(output_root: impl Into<PathBuf>, execution_id: ExecutionId) -> Self {
        Self {
            output_root: output_root.into(),
            execution_id,
        }
    }

    pub fn execution_id(&self) -> &ExecutionId {
        &self.execution_id
    }

    /// 本次运行的命名空间根目录
    pub fn run_root(&self) -> PathBuf {
        self.output_root.join(self.execution_id.as_str())
    }

    /// 数据产物路径，仅由 (执行标识, 主体, 工具, 调用标识) 推导
    pub fn data_path(&self, subject: &str, tool_name: &str, call_id: &CallId) -> PathBuf {
        self.call_dir(subject, tool_name)
            .join(format!("{}-data.json", call_id))
    }

    /// 图表产物路径，仅由 (执行标识, 主体, 工具, 调用标识) 推导
    pub fn chart_path(&self, subject: &str, tool_name: &str, call_id: &CallId) -> PathBuf {
        self.call_dir(subject, tool_name)
            .join(format!("{}-chart.png", call_id))
    }

    /// 最终报告路径
    pub fn report_path(&self) -> PathBuf {
        self.run_root().join("report.md")
    }

    fn call_dir(&self, subject: &str, tool_name: &str) -> PathBuf {
        self.run_root().join(slugify(subject)).join(slugify(tool_name))
    }

    /// 持久化数据负载，返回产物引用
    /// 写入在返回前完成落盘，不跨调用边界缓冲
    pub async fn persist_data(
        &self,
        subject: &str,
        tool_name: &str,
        call_id: &CallId,
        datapoints: &Value,
    ) -> Result<ArtifactReference> {
        let path = self.data_path(subject, tool_name, call_id);
        self.ensure_parent(&path).await?;

        let content = serde_json::to_string_pretty(datapoints)?;
        fs::write(&path, content)
            .await
            .context(format!("写入数据产物失败: {}", path.display()))?;

        Ok(ArtifactReference {
            kind: ArtifactKind::Data,
            path,
            tool_name: tool_name.to_string(),
            subject: subject.to_string(),
        })
    }

    /// 为图表渲染预留路径并确保父目录存在
    pub async fn reserve_chart(
        &self,
        subject: &str,
        tool_name: &str,
        call_id: &CallId,
    ) -> Result<PathBuf> {
        let path = self.chart_path(subject, tool_name, call_id);
        self.ensure_parent(&path).await?;
        Ok(path)
    }

    /// 构建图表产物引用（渲染器已将图片写入预留路径之后调用）
    pub fn chart_reference(
        &self,
        subject: &str,
        tool_name: &str,
        call_id: &CallId,
    ) -> ArtifactReference {
        ArtifactReference {
            kind: ArtifactKind::Chart,
            path: self.chart_path(subject, tool_name, call_id),
            tool_name: tool_name.to_string(),
            subject: subject.to_string(),
        }
    }

    /// 写入最终报告（一次运行只写一次）
    pub async fn persist_report(&self, content: &str) -> Result<PathBuf> {
        let path = self.report_path();
        self.ensure_parent(&path).await?;
        fs::write(&path, content)
            .await
            .context(format!("写入报告失败: {}", path.display()))?;
        Ok(path)
    }

    /// 扫描本次运行命名空间下的全部产物文件
    pub fn scan(&self) -> Vec<PathBuf> {
        let root = self.run_root();
        if !root.exists() {
            return Vec::new();
        }

        let mut paths: Vec<PathBuf> = WalkDir::new(&root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.path().to_path_buf())
            .collect();
        paths.sort();
        paths
    }

    async fn ensure_parent(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context(format!("创建产物目录失败: {}", parent.display()))?;
        }
        Ok(())
    }
}

// Include tests
#[cfg(test)]
mod tests;
