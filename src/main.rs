// ==========================================
// 故障知识库 - 命令行入口
// ==========================================
// 用法:
//   troubleshoot-kb preview <file>
//   troubleshoot-kb import <file> <mapping.json>
//   troubleshoot-kb stats
// 配置: TROUBLESHOOT_KB_* 环境变量
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;
use troubleshoot_kb::api::ExecuteRequest;
use troubleshoot_kb::domain::ColumnMapping;
use troubleshoot_kb::{logging, AppConfig, AppState};

const USAGE: &str = "usage:
  troubleshoot-kb preview <file>
  troubleshoot-kb import <file> <mapping.json>
  troubleshoot-kb stats";

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// 读取本地文件并走上传流程（暂存到 upload_dir）
async fn stage(state: &AppState, file: &str) -> Result<troubleshoot_kb::api::UploadPreview> {
    let bytes = std::fs::read(file).with_context(|| format!("无法读取文件 {}", file))?;
    let original_name = Path::new(file)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.to_string());

    state
        .import_api
        .upload(&original_name, &bytes)
        .await
        .map_err(|e| anyhow!("[{}] {}", e.code(), e))
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("");

    let config = AppConfig::from_env();
    tracing::info!(version = troubleshoot_kb::VERSION, command, "troubleshoot-kb 启动");

    match (command, &args[1.min(args.len())..]) {
        ("preview", [file]) => {
            let state = AppState::new(config).map_err(|e| anyhow!(e))?;
            let preview = stage(&state, file).await?;
            troubleshoot_kb::importer::remove_upload(Path::new(&preview.file_path));
            print_json(&preview.preview)
        }
        ("import", [file, mapping_file]) => {
            let raw = std::fs::read_to_string(mapping_file)
                .with_context(|| format!("无法读取映射文件 {}", mapping_file))?;
            let mapping: ColumnMapping =
                serde_json::from_str(&raw).context("映射文件不是合法的 JSON")?;

            let state = AppState::new(config).map_err(|e| anyhow!(e))?;
            let preview = stage(&state, file).await?;
            let summary = state
                .import_api
                .execute(&ExecuteRequest {
                    file_path: preview.file_path,
                    mapping,
                })
                .await
                .map_err(|e| anyhow!("[{}] {}", e.code(), e))?;
            print_json(&summary)
        }
        ("stats", []) => {
            let state = AppState::new(config).map_err(|e| anyhow!(e))?;
            let dashboard = &state.dashboard_api;
            print_json(&serde_json::json!({
                "stats": dashboard.stats()?,
                "frequentIssues": dashboard.frequent_issues(None)?,
            }))
        }
        _ => bail!("{}", USAGE),
    }
}
