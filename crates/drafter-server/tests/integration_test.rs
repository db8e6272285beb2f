use drafter_core::*;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

const BRIEF_JSON: &str = r#"{
    "background_technology": "现有门禁依赖刷卡",
    "problem_statement": "卡片易丢失且可被复制",
    "core_inventive_concept": "步态与人脸双模态认证",
    "technical_solution_summary": "采集步态序列与人脸图像，融合两路特征后比对",
    "key_components_or_steps": ["采集单元", "融合单元"],
    "achieved_effects": "冒用率降低"
}"#;

fn model() -> Arc<ScriptedModel> {
    Arc::new(
        ScriptedModel::new("默认段落。")
            .on("作为总编", "润色后的段落。")
            .on("提炼为一个 JSON 对象", BRIEF_JSON)
            .on("中文发明名称", r#"["一种双模态门禁认证方法"]"#)
            .on("拆解为 3 至 6 个", r#"["步态采集", "特征融合"]"#)
            .on("撰写“技术领域”段落", "本发明涉及身份认证技术领域。"),
    )
}

fn open(path: &Path, logs: &Path) -> DraftSession<RedbStore> {
    let config = SessionConfig::new().with_audit(AuditConfig::new().with_log_dir(logs));
    DraftSession::new(RedbStore::open(path).unwrap(), model(), config, "it").unwrap()
}

// ── Persistence ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_draft_survives_reopen() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("it.redb");
    let logs = dir.path().join("logs");

    let exported = {
        let session = open(&db_path, &logs);
        session.analyze_brief("门禁交底书").await.unwrap();
        let summary = session.generate_all(GenerateScope::All).await.unwrap();
        assert!(!summary.aborted, "{:?}", summary.failures);
        session
            .submit_edited_version(
                Key::Section(SectionKey::TechnicalField),
                Content::text("本发明涉及门禁领域。"),
            )
            .unwrap();
        session.export_markdown(false).unwrap()
    };

    let session = open(&db_path, &logs);
    assert_eq!(session.export_markdown(false).unwrap(), exported);
    assert_eq!(
        session.versions(Key::Section(SectionKey::TechnicalField)).unwrap().len(),
        2
    );
    assert_eq!(
        session
            .brief()
            .unwrap()
            .field_text(BriefField::CoreInventiveConcept),
        "步态与人脸双模态认证"
    );
    assert!(exported.contains("# 二、技术领域\n本发明涉及门禁领域。"));
}

#[tokio::test]
async fn test_staleness_and_selection_survive_reopen() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("it.redb");
    let logs = dir.path().join("logs");
    let field = Key::Section(SectionKey::TechnicalField);

    {
        let session = open(&db_path, &logs);
        session.analyze_brief("门禁交底书").await.unwrap();
        session.generate_section(SectionKey::TechnicalField).await.unwrap();
        session.generate_section(SectionKey::TechnicalField).await.unwrap();
        session.set_active_version(field, 0).unwrap();
        session
            .update_brief_field(BriefField::AchievedEffects, "冒用率显著降低")
            .unwrap();
    }

    let session = open(&db_path, &logs);
    let artifact = session.artifact(field).unwrap().unwrap();
    assert_eq!(artifact.active, 0);
    assert_eq!(artifact.versions.len(), 2);
    // tech_field does not read achieved_effects, but the section is gated on
    // the whole brief
    assert!(session.is_stale(field).unwrap());

    session.generate_section(SectionKey::TechnicalField).await.unwrap();
    assert!(!session.is_stale(field).unwrap());
}

#[tokio::test]
async fn test_refined_draft_survives_reopen() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("it.redb");
    let logs = dir.path().join("logs");

    let primary = {
        let session = open(&db_path, &logs);
        session.analyze_brief("门禁交底书").await.unwrap();
        session.generate_all(GenerateScope::All).await.unwrap();
        session.refine_all().await.unwrap();
        session.export_markdown(false).unwrap()
    };

    let session = open(&db_path, &logs);
    let refined = session.refined().unwrap().expect("refined draft persisted");
    assert_eq!(
        refined.get(SectionKey::Claims).and_then(Content::as_text),
        Some("润色后的段落。")
    );
    assert_eq!(session.export_markdown(false).unwrap(), primary);
    assert!(session
        .export_markdown(true)
        .unwrap()
        .contains("# 七、权利要求书\n润色后的段落。"));
}

// ── Audit trail ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_audit_steps_continue_across_runs() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("it.redb");
    let logs = dir.path().join("logs");

    let first_run_steps = {
        let session = open(&db_path, &logs);
        session.analyze_brief("门禁交底书").await.unwrap();
        session.generate_section(SectionKey::TechnicalField).await.unwrap();
        session.audit().current_step()
    };
    assert_eq!(first_run_steps, 2);

    let session = open(&db_path, &logs);
    session.generate_section(SectionKey::TechnicalField).await.unwrap();
    assert_eq!(session.audit().current_step(), 3);

    let artifacts = logs.join("artifacts").join("run_it");
    assert!(artifacts.join("0003_unit-tech_field_prompt.txt").exists());
    let calls = session
        .audit()
        .query(&AuditFilter {
            action: Some(AuditAction::ModelCall),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(calls.len(), 3);
}
