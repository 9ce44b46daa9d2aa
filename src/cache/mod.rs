use anyhow::Result;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;

use crate::config::CacheConfig;

/// 缓存管理器
pub struct CacheManager {
    config: CacheConfig,
}

/// 缓存条目
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: u64,
    /// prompt的MD5哈希值，用于缓存键的生成和验证
    pub prompt_hash: String,
    /// 使用的模型名称（可选）
    pub model_name: Option<String>,
}

impl CacheManager {
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    /// 生成prompt的MD5哈希
    pub fn hash_prompt(&self, prompt: &str) -> String {
        let mut hasher = Md5::new();
        hasher.update(prompt.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// 获取缓存文件路径
    fn get_cache_path(&self, category: &str, hash: &str) -> PathBuf {
        self.config
            .cache_dir
            .join(category)
            .join(format!("{}.json", hash))
    }

    /// 检查缓存是否过期
    fn is_expired(&self, timestamp: u64) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let expire_seconds = self.config.expire_hours * 3600;
        now.saturating_sub(timestamp) > expire_seconds
    }

    /// 获取缓存
    pub async fn get<T>(&self, category: &str, prompt: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        if !self.config.enabled {
            return Ok(None);
        }

        let hash = self.hash_prompt(prompt);
        let cache_path = self.get_cache_path(category, &hash);

        if !cache_path.exists() {
            return Ok(None);
        }

        match fs::read_to_string(&cache_path).await {
            Ok(content) => match serde_json::from_str::<CacheEntry<T>>(&content) {
                Ok(entry) => {
                    if self.is_expired(entry.timestamp) {
                        // 删除过期缓存
                        let _ = fs::remove_file(&cache_path).await;
                        return Ok(None);
                    }
                    Ok(Some(entry.data))
                }
                Err(_) => Ok(None),
            },
            Err(_) => Ok(None),
        }
    }

    /// 写入缓存
    pub async fn store<T>(
        &self,
        category: &str,
        prompt: &str,
        data: &T,
        model_name: Option<String>,
    ) -> Result<()>
    where
        T: Serialize,
    {
        if !self.config.enabled {
            return Ok(());
        }

        let hash = self.hash_prompt(prompt);
        let cache_path = self.get_cache_path(category, &hash);

        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let entry = CacheEntry {
            data,
            timestamp,
            prompt_hash: hash,
            model_name,
        };

        let content = serde_json::to_string(&entry)?;
        fs::write(&cache_path, content).await?;
        Ok(())
    }

    /// 清空全部缓存（force_regenerate时使用）
    pub async fn clear(&self) -> Result<()> {
        if self.config.cache_dir.exists() {
            fs::remove_dir_all(&self.config.cache_dir).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_cache(temp_dir: &TempDir, enabled: bool) -> CacheManager {
        CacheManager::new(CacheConfig {
            enabled,
            cache_dir: temp_dir.path().join("cache"),
            expire_hours: 1,
        })
    }

    #[tokio::test]
    async fn test_cache_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let cache = test_cache(&temp_dir, true);

        cache
            .store("plan", "prompt-a", &"value-a".to_string(), None)
            .await
            .unwrap();

        let hit: Option<String> = cache.get("plan", "prompt-a").await.unwrap();
        assert_eq!(hit.as_deref(), Some("value-a"));

        let miss: Option<String> = cache.get("plan", "prompt-b").await.unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_cache_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let cache = test_cache(&temp_dir, false);

        cache
            .store("plan", "prompt-a", &"value-a".to_string(), None)
            .await
            .unwrap();

        let hit: Option<String> = cache.get("plan", "prompt-a").await.unwrap();
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn test_cache_clear() {
        let temp_dir = TempDir::new().unwrap();
        let cache = test_cache(&temp_dir, true);

        cache
            .store("synthesis", "prompt", &42u32, Some("model-x".to_string()))
            .await
            .unwrap();
        cache.clear().await.unwrap();

        let hit: Option<u32> = cache.get("synthesis", "prompt").await.unwrap();
        assert!(hit.is_none());
    }
}
