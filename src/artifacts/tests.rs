#[cfg(test)]
mod tests {
    use crate::artifacts::{ArtifactKind, ArtifactStore, CallId, ExecutionId, slugify};
    use serde_json::json;
    use tempfile::TempDir;

    fn test_store(temp_dir: &TempDir) -> ArtifactStore {
        ArtifactStore::new(temp_dir.path(), ExecutionId::mint())
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Amazon Elastic Compute Cloud - Compute"), "amazon-elastic-compute-cloud-compute");
        assert_eq!(slugify("AWS Lambda"), "aws-lambda");
        assert_eq!(slugify("  S3  "), "s3");
        assert_eq!(slugify("***"), "unnamed");
    }

    #[test]
    fn test_execution_id_unique_and_sortable_shape() {
        let a = ExecutionId::mint();
        let b = ExecutionId::mint();

        assert_ne!(a, b);
        // 形如 20260830T142501-3fa9c27b
        assert_eq!(a.as_str().len(), "20260830T142501-3fa9c27b".len());
        assert!(a.as_str().chars().next().unwrap().is_ascii_digit());
    }

    #[test]
    fn test_call_id_unique() {
        let ids: Vec<CallId> = (0..50).map(|_| CallId::mint()).collect();
        for (i, a) in ids.iter().enumerate() {
            for b in ids.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_paths_derivable_from_components() {
        let temp_dir = TempDir::new().unwrap();
        let execution_id = ExecutionId::mint();
        let call_id = CallId::mint();

        let store = ArtifactStore::new(temp_dir.path(), execution_id.clone());
        let rebuilt = ArtifactStore::new(temp_dir.path(), execution_id);

        // 路径必须仅由 (执行标识, 主体, 工具, 调用标识) 推导，可稳定重建
        assert_eq!(
            store.data_path("EC2", "get_cost_by_usage_type", &call_id),
            rebuilt.data_path("EC2", "get_cost_by_usage_type", &call_id)
        );
        assert_eq!(
            store.chart_path("EC2", "get_cost_by_usage_type", &call_id),
            rebuilt.chart_path("EC2", "get_cost_by_usage_type", &call_id)
        );

        let data_path = store.data_path("EC2", "get_cost_by_usage_type", &call_id);
        assert!(data_path.ends_with(format!("ec2/get-cost-by-usage-type/{}-data.json", call_id)));
    }

    #[tokio::test]
    async fn test_persist_data_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let payload = json!({"rows": [{"date": "2026-07-01", "amount": 120.5}]});
        let reference = store
            .persist_data("EC2", "get_daily_cost", &CallId::mint(), &payload)
            .await
            .unwrap();

        assert_eq!(reference.kind, ArtifactKind::Data);
        assert_eq!(reference.tool_name, "get_daily_cost");
        assert_eq!(reference.subject, "EC2");
        assert!(reference.path.exists());

        let content = std::fs::read_to_string(&reference.path).unwrap();
        let read_back: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(read_back, payload);
    }

    #[tokio::test]
    async fn test_namespace_isolation_between_call_ids() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let call_a = CallId::mint();
        let call_b = CallId::mint();

        store
            .persist_data("EC2", "get_daily_cost", &call_a, &json!({"v": "a"}))
            .await
            .unwrap();
        store
            .persist_data("EC2", "get_daily_cost", &call_b, &json!({"v": "b"}))
            .await
            .unwrap();

        // 以不同负载重写call_a，不得影响call_b的产物
        store
            .persist_data("EC2", "get_daily_cost", &call_a, &json!({"v": "a2"}))
            .await
            .unwrap();

        let content_b =
            std::fs::read_to_string(store.data_path("EC2", "get_daily_cost", &call_b)).unwrap();
        let value_b: serde_json::Value = serde_json::from_str(&content_b).unwrap();
        assert_eq!(value_b, json!({"v": "b"}));
    }

    #[tokio::test]
    async fn test_scan_discovers_all_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        store
            .persist_data("EC2", "get_daily_cost", &CallId::mint(), &json!({}))
            .await
            .unwrap();
        store
            .persist_data("S3", "get_storage_cost", &CallId::mint(), &json!({}))
            .await
            .unwrap();
        store.persist_report("# report").await.unwrap();

        let paths = store.scan();
        assert_eq!(paths.len(), 3);
        for path in &paths {
            assert!(path.starts_with(store.run_root()));
        }
    }

    #[tokio::test]
    async fn test_scan_empty_run() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        assert!(store.scan().is_empty());
    }

    #[tokio::test]
    async fn test_reserve_chart_creates_parent() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let call_id = CallId::mint();
        let path = store
            .reserve_chart("EC2", "get_daily_cost", &call_id)
            .await
            .unwrap();

        assert!(path.parent().unwrap().exists());
        assert_eq!(path, store.chart_path("EC2", "get_daily_cost", &call_id));

        let reference = store.chart_reference("EC2", "get_daily_cost", &call_id);
        assert_eq!(reference.kind, ArtifactKind::Chart);
        assert_eq!(reference.path, path);
    }
}
