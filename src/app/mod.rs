// ==========================================
// 故障知识库 - 应用层
// ==========================================
// 职责: 装配共享状态，供传输层（CLI / HTTP）使用
// ==========================================

pub mod state;

// 重导出
pub use state::AppState;
