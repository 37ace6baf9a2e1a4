// ==========================================
// 故障知识库 - 应用状态
// ==========================================
// 职责: 打开/初始化数据库，装配 Repository 与 API 实例
// 约束: 全部仓储共享同一连接 Arc<Mutex<Connection>>
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{DashboardApi, EntryApi, EquipmentApi, ImportApi, SearchApi, TopicApi};
use crate::config::AppConfig;
use crate::db::{init_schema, open_sqlite_connection};
use crate::importer::{EntryImporter, EntryImporterImpl};
use crate::perf::install_sqlite_tracing;
use crate::repository::{
    DashboardRepository, EntryImportRepository, EntryRepository, EquipmentRepository,
    SearchRepository, TopicRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源，传输层（HTTP / CLI）持有一份即可
pub struct AppState {
    /// 生效配置
    pub config: AppConfig,

    /// 知识条目API
    pub entry_api: Arc<EntryApi>,

    /// 设备API
    pub equipment_api: Arc<EquipmentApi>,

    /// 主题API
    pub topic_api: Arc<TopicApi>,

    /// 检索API
    pub search_api: Arc<SearchApi>,

    /// 统计看板API
    pub dashboard_api: Arc<DashboardApi>,

    /// 批量导入API
    pub import_api: Arc<ImportApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - config: 应用配置
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 创建数据库目录并打开连接（外键 / busy_timeout）
    /// 2. 幂等建表并写入默认主题
    /// 3. 创建所有Repository与API实例
    pub fn new(config: AppConfig) -> Result<Self, String> {
        tracing::info!(
            db_path = %config.db_path.display(),
            upload_dir = %config.upload_dir.display(),
            "初始化AppState"
        );

        if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("无法创建数据目录 {}: {}", parent.display(), e))?;
        }

        let db_path = config.db_path.to_string_lossy().to_string();
        let mut conn =
            open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        install_sqlite_tracing(&mut conn);
        init_schema(&conn).map_err(|e| format!("数据库初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let entry_repo = Arc::new(EntryRepository::new(conn.clone()));
        let equipment_repo = Arc::new(EquipmentRepository::new(conn.clone()));
        let topic_repo = Arc::new(TopicRepository::new(conn.clone()));
        let search_repo = Arc::new(SearchRepository::new(conn.clone()));
        let dashboard_repo = Arc::new(DashboardRepository::new(conn.clone()));

        // ==========================================
        // 初始化导入器
        // ==========================================
        let importer: Arc<dyn EntryImporter> = Arc::new(EntryImporterImpl::new(
            EntryImportRepository::new(conn),
            config.import_limits,
        ));

        // ==========================================
        // 初始化API层
        // ==========================================
        let import_api = Arc::new(ImportApi::new(
            importer,
            config.upload_dir.clone(),
            config.max_upload_bytes,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            entry_api: Arc::new(EntryApi::new(entry_repo)),
            equipment_api: Arc::new(EquipmentApi::new(equipment_repo)),
            topic_api: Arc::new(TopicApi::new(topic_repo)),
            search_api: Arc::new(SearchApi::new(search_repo)),
            dashboard_api: Arc::new(DashboardApi::new(dashboard_repo)),
            import_api,
            config,
        })
    }
}
