// ==========================================
// 批量导入端到端测试
// ==========================================
// 上传 → 预览 → 执行，断言落库结果与汇总计数

use troubleshoot_kb::api::ExecuteRequest;
use troubleshoot_kb::domain::ImportSummary;

use test_helpers::{create_test_env, create_test_env_with, mapping, TestEnv};

async fn upload_and_import(
    env: &TestEnv,
    name: &str,
    content: &[u8],
    pairs: &[(&str, &str)],
) -> ImportSummary {
    let preview = env
        .state
        .import_api
        .upload(name, content)
        .await
        .expect("上传失败");

    env.state
        .import_api
        .execute(&ExecuteRequest {
            file_path: preview.file_path,
            mapping: mapping(pairs),
        })
        .await
        .expect("导入失败")
}

/// 三行场景: 一行完整、一行空、一行只有 question
#[tokio::test]
async fn test_three_row_scenario() {
    let env = create_test_env();
    let csv = "Title,Problem,Fix,Machine\n\
               Motor overheats,Motor hot after 2h,Clean fan,Press 1\n\
               ,,,\n\
               ,Why does belt slip?,Tighten belt,Press 1\n";

    let summary = upload_and_import(
        &env,
        "issues.csv",
        csv.as_bytes(),
        &[
            ("title", "Title"),
            ("question", "Problem"),
            ("answer", "Fix"),
            ("equipment", "Machine"),
        ],
    )
    .await;

    assert_eq!(summary.imported, 2);
    assert_eq!(summary.skipped, 1);
    assert!(summary.errors.is_empty());

    assert_eq!(env.count("SELECT COUNT(*) FROM entries"), 2);
    assert_eq!(
        env.count("SELECT COUNT(*) FROM equipment WHERE name = 'Press 1'"),
        1
    );
    assert_eq!(
        env.count("SELECT COUNT(*) FROM entries WHERE title = 'Why does belt slip?'"),
        1
    );
}

#[tokio::test]
async fn test_preview_contract() {
    let env = create_test_env();
    let mut csv = String::from("Title,Problem,\n");
    for i in 0..8 {
        csv.push_str(&format!("t{},q{},x\n", i, i));
    }

    let preview = env
        .state
        .import_api
        .upload("Weekly Report.CSV", csv.as_bytes())
        .await
        .unwrap();

    assert_eq!(preview.preview.columns, vec!["Title", "Problem", "__EMPTY"]);
    assert_eq!(preview.preview.rows.len(), 5);
    assert_eq!(preview.preview.total_rows, 8);
    assert_eq!(preview.preview.file_name, "Weekly Report.CSV");
    assert!(std::path::Path::new(&preview.file_path).starts_with(env.upload_dir()));

    let json = serde_json::to_value(&preview).unwrap();
    assert_eq!(json["totalRows"], 8);
    assert!(json["filePath"].is_string());
    assert_eq!(json["fileName"], "Weekly Report.CSV");
}

#[tokio::test]
async fn test_txt_rejected_before_reading() {
    let env = create_test_env();
    let err = env
        .state
        .import_api
        .upload("notes.txt", b"Title\nhello\n")
        .await
        .unwrap_err();

    assert_eq!(err.http_status(), 400);
    let message = err.to_string();
    assert!(message.contains(".txt"));
    assert!(message.contains(".csv"));
    assert!(message.contains(".xlsx"));
    assert!(message.contains(".xls"));
    assert!(!env.upload_dir().exists() || std::fs::read_dir(env.upload_dir()).unwrap().count() == 0);
}

#[tokio::test]
async fn test_missing_mapping_rejected_and_file_removed() {
    let env = create_test_env();
    let preview = env
        .state
        .import_api
        .upload("a.csv", b"Title,Fix\nx,y\n")
        .await
        .unwrap();
    let stored = preview.file_path.clone();

    let err = env
        .state
        .import_api
        .execute(&ExecuteRequest {
            file_path: preview.file_path,
            mapping: mapping(&[("answer", "Fix"), ("title", "  ")]),
        })
        .await
        .unwrap_err();

    assert_eq!(err.http_status(), 400);
    assert!(err.to_string().contains("title or question"));
    assert_eq!(env.count("SELECT COUNT(*) FROM entries"), 0);
    assert!(!std::path::Path::new(&stored).exists());
}

/// 同名引用在一次运行内只创建一次；已存在的名称直接复用
#[tokio::test]
async fn test_reference_created_once_per_name() {
    let env = create_test_env();
    env.conn()
        .execute("INSERT INTO equipment (name) VALUES ('Lathe')", [])
        .unwrap();

    let csv = "Title,Machine,Area\n\
               a,Lathe,Electrical\n\
               b, Mill ,Coolant\n\
               c,Mill,Coolant\n\
               d,Lathe,\n\
               e,mill,Coolant\n";
    let summary = upload_and_import(
        &env,
        "refs.csv",
        csv.as_bytes(),
        &[("title", "Title"), ("equipment", "Machine"), ("topic", "Area")],
    )
    .await;

    assert_eq!(summary.imported, 5);
    assert_eq!(env.count("SELECT COUNT(*) FROM equipment WHERE name = 'Lathe'"), 1);
    assert_eq!(env.count("SELECT COUNT(*) FROM equipment WHERE name = 'Mill'"), 1);
    // 名称区分大小写
    assert_eq!(env.count("SELECT COUNT(*) FROM equipment WHERE name = 'mill'"), 1);
    assert_eq!(env.count("SELECT COUNT(*) FROM topics WHERE name = 'Coolant'"), 1);
    assert_eq!(
        env.count("SELECT COUNT(*) FROM topics WHERE name = 'Coolant' AND color = '#6B7280'"),
        1
    );
    // 默认主题 Electrical 被复用
    assert_eq!(env.count("SELECT COUNT(*) FROM topics"), 9);
    assert_eq!(
        env.count("SELECT COUNT(*) FROM entries WHERE topic_id IS NULL AND title = 'd'"),
        1
    );
}

#[tokio::test]
async fn test_severity_tags_and_dates() {
    let env = create_test_env();
    let csv = "Title,Sev,Tags,Date\n\
               a,HIGH,\"pump, seal;pump|  \",2025-04-01\n\
               b,urgent,,2025-04-03\n\
               c,,x,not-a-date\n\
               d, Critical ,,2025/04/02\n\
               e,low,y,\n";
    let summary = upload_and_import(
        &env,
        "sev.csv",
        csv.as_bytes(),
        &[
            ("title", "Title"),
            ("severity", "Sev"),
            ("tags", "Tags"),
            ("date_reported", "Date"),
        ],
    )
    .await;

    assert_eq!(summary.imported, 3);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.errors.len(), 2);
    assert!(summary.errors[0].starts_with("Row 3: "));
    assert!(summary.errors[0].contains("not-a-date"));
    // 已映射但为空的日期不回落到当天
    assert_eq!(summary.errors[1], "Row 5: invalid date_reported value ''");

    assert_eq!(
        env.count("SELECT COUNT(*) FROM entries WHERE title = 'a' AND severity = 'high' AND date_reported = '2025-04-01'"),
        1
    );
    assert_eq!(
        env.count("SELECT COUNT(*) FROM entries WHERE title = 'b' AND severity = 'medium' AND date_reported = '2025-04-03'"),
        1
    );
    assert_eq!(
        env.count("SELECT COUNT(*) FROM entries WHERE title = 'd' AND severity = 'critical' AND date_reported = '2025-04-02'"),
        1
    );
    assert_eq!(env.count("SELECT COUNT(*) FROM entry_tags"), 2);
    // 失败行不留下任何标签
    assert_eq!(env.count("SELECT COUNT(*) FROM entry_tags WHERE tag IN ('x', 'y')"), 0);
}

#[tokio::test]
async fn test_imported_plus_skipped_equals_total() {
    let env = create_test_env();
    let mut csv = String::from("Title,Problem,Date\n");
    for i in 0..30 {
        match i % 3 {
            0 => csv.push_str(&format!("t{},,2025-01-{:02}\n", i, i / 3 + 1)),
            1 => csv.push_str(",,\n"),
            _ => csv.push_str(&format!(",q{},bad{}\n", i, i)),
        }
    }

    let summary = upload_and_import(
        &env,
        "bulk.csv",
        csv.as_bytes(),
        &[("title", "Title"), ("question", "Problem"), ("date_reported", "Date")],
    )
    .await;

    assert_eq!(summary.imported + summary.skipped, 30);
    assert_eq!(summary.imported, 10);
    assert_eq!(summary.errors.len(), 10);
    assert_eq!(env.count("SELECT COUNT(*) FROM entries"), 10);
}

#[tokio::test]
async fn test_corrupt_workbook_is_parse_failure() {
    let env = create_test_env();
    let err = env
        .state
        .import_api
        .upload("broken.xlsx", b"this is not a zip archive")
        .await
        .unwrap_err();

    assert_eq!(err.http_status(), 400);
    assert_eq!(err.code(), "IMPORT_REJECTED");
    assert_eq!(std::fs::read_dir(env.upload_dir()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_upload_size_limit_from_config() {
    let env = create_test_env_with(|config| config.max_upload_bytes = 16);
    let err = env
        .state
        .import_api
        .upload("big.csv", "Title\nsomething long enough\n".as_bytes())
        .await
        .unwrap_err();

    assert_eq!(err.http_status(), 413);
    assert_eq!(err.code(), "PAYLOAD_TOO_LARGE");
}
