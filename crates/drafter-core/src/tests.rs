//! End-to-end pipeline tests against the scripted model.

use crate::*;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const BRIEF_JSON: &str = r#"{
    "background_technology": "现有图像识别依赖人工设计的特征",
    "problem_statement": "复杂光照下识别率低",
    "core_inventive_concept": "多尺度边缘融合",
    "technical_solution_summary": "先进行自适应滤波，再融合多尺度边缘特征进行分类",
    "key_components_or_steps": [
        {"name": "滤波模块", "function": "去除噪声"},
        {"name": "融合模块", "function": "融合边缘特征"}
    ],
    "achieved_effects": "识别准确率提升"
}"#;

fn scripted() -> ScriptedModel {
    ScriptedModel::new("默认输出")
        .on("作为总编", "润色后的章节")
        .on("提炼为一个 JSON 对象", BRIEF_JSON)
        .on("中文发明名称", r#"{"titles": ["一种基于多尺度边缘融合的图像识别方法", "items", "一种图像识别系统"]}"#)
        .on("撰写“技术领域”段落", "本发明涉及图像处理技术领域。")
        .on("撰写“现有技术存在的问题”段落", "现有方法在复杂光照下误识别较多。")
        .on("最接近的现有技术状况的分析说明", "现有方案采用固定阈值提取边缘。")
        .on("撰写“发明目的”段落", "本发明的目的在于提高识别率。")
        .on("拆解为 3 至 6 个", r#"["自适应滤波", "多尺度边缘提取", "特征融合分类"]"#)
        .on("撰写“技术解决方案”", "系统包括滤波模块和融合模块。")
        .on("撰写“技术效果”段落", "通过融合多尺度边缘，提升了识别准确率。")
        .on("构思 2 至 4 幅专利附图", r#"{"ideas": [{"title": "系统结构图", "description": "模块组成"}, {"title": "方法流程图", "description": "处理步骤"}]}"#)
        .on("撰写“附图说明”", "图1为系统结构图；\n图2为方法流程图。")
        .on("分配附图标记", r#"[{"label": "10", "name": "滤波模块"}, {"label": "20", "name": "融合模块"}]"#)
        .on("编写 Mermaid 图代码", "```mermaid\ngraph TD\nA[滤波]-->B[融合]\n```")
        .on("一段具体实施方式", "实施例：按要点实施。")
        .on("逐项检查权利要求", r#"{"supported": false, "issues": [{"claim": 2, "problem": "术语不一致", "suggestion": "统一为融合模块"}]}"#)
        .on("撰写权利要求书", "1. 一种图像识别方法，包括自适应滤波和多尺度边缘融合。")
        .on("说明书摘要", "本发明公开了一种图像识别方法。")
}

fn config(skip_drawings: bool) -> SessionConfig {
    SessionConfig::new()
        .with_skip_drawings(skip_drawings)
        .with_audit(AuditConfig::disabled())
}

fn session_with(model: Arc<ScriptedModel>, skip_drawings: bool) -> DraftSession<MemoryStore> {
    DraftSession::new(MemoryStore::new(), model, config(skip_drawings), "test").unwrap()
}

async fn analyzed(model: Arc<ScriptedModel>, skip_drawings: bool) -> DraftSession<MemoryStore> {
    let session = session_with(model, skip_drawings);
    session.analyze_brief("一种图像识别方法的技术交底书").await.unwrap();
    session
}

fn section_text(session: &DraftSession<MemoryStore>, section: SectionKey) -> String {
    session
        .active_content(Key::Section(section))
        .unwrap()
        .map(|c| c.render_text())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_analyze_brief_commits_brief() {
    let session = analyzed(Arc::new(scripted()), true).await;
    let brief = session.brief().unwrap();
    assert_eq!(brief.field_text(BriefField::CoreInventiveConcept), "多尺度边缘融合");
    assert_eq!(brief.key_components_or_steps.len(), 2);
    assert_eq!(session.versions(Key::Brief).unwrap().len(), 1);
}

#[tokio::test]
async fn test_generate_all_with_drawings_skipped() {
    let model = Arc::new(scripted());
    let session = analyzed(model.clone(), true).await;

    let summary = session.generate_all(GenerateScope::All).await.unwrap();
    assert!(summary.is_complete(), "{:?}", summary.failures);
    assert_eq!(summary.reports.len(), SectionKey::ALL.len());

    assert_eq!(section_text(&session, SectionKey::Title), "一种图像识别系统");
    assert_eq!(
        session.versions(Key::Section(SectionKey::Title)).unwrap(),
        vec![
            Content::text("一种基于多尺度边缘融合的图像识别方法"),
            Content::text("一种图像识别系统"),
        ]
    );
    assert_eq!(
        session.active_content(Key::Unit(UnitKey::TitleOptions)).unwrap(),
        Some(Content::List(vec![
            "一种基于多尺度边缘融合的图像识别方法".into(),
            "一种图像识别系统".into(),
        ]))
    );
    assert!(section_text(&session, SectionKey::Background)
        .contains("## 2.2 实事求是地指出现有技术存在的问题，尽可能分析存在的原因。\n现有方法在复杂光照下误识别较多。"));
    assert_eq!(
        section_text(&session, SectionKey::Implementation),
        "1. 实施例：按要点实施。\n2. 实施例：按要点实施。\n3. 实施例：按要点实施。"
    );
    assert_eq!(section_text(&session, SectionKey::FigureDescription), "（本申请无附图）");
    assert_eq!(
        session.active_content(Key::Section(SectionKey::Drawings)).unwrap(),
        Some(Content::Drawings(Vec::new()))
    );

    let calls = model.calls();
    assert!(calls.iter().all(|(p, _)| !p.contains("构思 2 至 4 幅专利附图")));
    assert!(calls.iter().all(|(p, _)| !p.contains("Mermaid")));
}

#[tokio::test]
async fn test_generate_all_with_drawings() {
    let session = analyzed(Arc::new(scripted()), false).await;
    let summary = session.generate_all(GenerateScope::All).await.unwrap();
    assert!(summary.is_complete(), "{:?}", summary.failures);

    let drawings = match session.active_content(Key::Section(SectionKey::Drawings)).unwrap() {
        Some(Content::Drawings(d)) => d,
        other => panic!("unexpected drawings content: {:?}", other),
    };
    assert_eq!(drawings.len(), 2);
    assert_eq!(drawings[0].title, "系统结构图");
    assert_eq!(drawings[0].code, "graph TD\nA[滤波]-->B[融合]");
    assert_eq!(
        section_text(&session, SectionKey::FigureDescription),
        "图1为系统结构图；\n图2为方法流程图。"
    );

    let markdown = session.export_markdown(false).unwrap();
    assert!(markdown.contains("## 附图2：方法流程图\n```mermaid\n"));
}

#[tokio::test]
async fn test_malformed_json_commits_nothing() {
    let model = Arc::new(
        ScriptedModel::new("x")
            .on("提炼为一个 JSON 对象", BRIEF_JSON)
            .on("中文发明名称", "不是 JSON"),
    );
    let session = analyzed(model, true).await;

    let err = session.run_unit(UnitKey::TitleOptions).await.unwrap_err();
    assert!(matches!(err, DraftError::MalformedStructuredOutput { .. }));
    assert_eq!(err.raw_output(), Some("不是 JSON"));
    assert!(session.versions(Key::Unit(UnitKey::TitleOptions)).unwrap().is_empty());

    // The section still assembles from the brief.
    let report = session.generate_section(SectionKey::Title).await.unwrap();
    assert!(matches!(report.units[0], UnitOutcome::Skipped { .. }));
    assert_eq!(report.fallbacks, vec!["title_options".to_string()]);
    assert_eq!(
        section_text(&session, SectionKey::Title),
        "一种基于多尺度边缘融合的先进行自适应滤波，再融合多尺度边缘特征进行分类"
    );
}

#[tokio::test]
async fn test_generic_title_candidates_fall_back_to_brief_title() {
    let model = Arc::new(
        ScriptedModel::new("x")
            .on("提炼为一个 JSON 对象", BRIEF_JSON)
            .on("中文发明名称", r#"["items", "", "data"]"#),
    );
    let session = analyzed(model, true).await;
    let fallback_title = "一种基于多尺度边缘融合的先进行自适应滤波，再融合多尺度边缘特征进行分类";

    let update = session.run_unit(UnitKey::TitleOptions).await.unwrap();
    assert_eq!(update.index, 0);
    assert_eq!(
        session.active_content(Key::Unit(UnitKey::TitleOptions)).unwrap(),
        Some(Content::List(vec![fallback_title.into()]))
    );

    let report = session.generate_section(SectionKey::Title).await.unwrap();
    assert!(matches!(report.units[0], UnitOutcome::Committed { .. }));
    assert!(report.fallbacks.is_empty());
    assert_eq!(section_text(&session, SectionKey::Title), fallback_title);
    assert_eq!(session.versions(Key::Section(SectionKey::Title)).unwrap().len(), 1);
}

#[tokio::test]
async fn test_each_title_candidate_is_selectable() {
    let model = Arc::new(
        ScriptedModel::new("x")
            .on("提炼为一个 JSON 对象", BRIEF_JSON)
            .on("中文发明名称", r#"{"titles": ["甲方法", "乙系统", "丙装置"]}"#),
    );
    let session = analyzed(model, true).await;
    let title = Key::Section(SectionKey::Title);

    let report = session.generate_section(SectionKey::Title).await.unwrap();
    assert_eq!(report.update.index, 2);
    assert_eq!(section_text(&session, SectionKey::Title), "丙装置");

    session.set_active_version(title, 0).unwrap();
    assert_eq!(section_text(&session, SectionKey::Title), "甲方法");
}

#[tokio::test]
async fn test_partial_list_failure_commits_nothing() {
    let model = Arc::new(
        ScriptedModel::new("x")
            .fail_on("技术要点：\n多尺度边缘提取", "connection reset")
            .on("一段具体实施方式", "实施例。")
            .on("提炼为一个 JSON 对象", BRIEF_JSON),
    );
    let session = analyzed(model.clone(), true).await;
    session
        .submit_edited_version(
            Key::Unit(UnitKey::SolutionPoints),
            Content::List(vec!["自适应滤波".into(), "多尺度边缘提取".into(), "特征融合分类".into()]),
        )
        .unwrap();

    let err = session.run_unit(UnitKey::ImplementationDetails).await.unwrap_err();
    assert!(matches!(err, DraftError::ModelInvocation { .. }));
    assert!(session
        .versions(Key::Unit(UnitKey::ImplementationDetails))
        .unwrap()
        .is_empty());
    // Stops at the failing item; the third point is never attempted.
    let attempted = model
        .calls()
        .iter()
        .filter(|(p, _)| p.contains("一段具体实施方式"))
        .count();
    assert_eq!(attempted, 2);
}

#[tokio::test]
async fn test_gating_dependency_blocks_section() {
    let session = analyzed(Arc::new(scripted()), true).await;
    let err = session.generate_section(SectionKey::Invention).await.unwrap_err();
    match err {
        DraftError::UnresolvedDependency { key, missing } => {
            assert_eq!(key, "invention");
            assert_eq!(missing, vec!["background".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_section_without_brief_is_blocked() {
    let session = session_with(Arc::new(scripted()), true);
    let err = session.generate_section(SectionKey::Title).await.unwrap_err();
    assert!(matches!(err, DraftError::UnresolvedDependency { .. }));
}

#[tokio::test]
async fn test_brief_edit_marks_everything_stale() {
    let session = analyzed(Arc::new(scripted()), true).await;
    session.generate_all(GenerateScope::All).await.unwrap();
    for row in session.overview().unwrap() {
        assert_eq!(row.freshness, Freshness::Fresh, "{}", row.section);
    }

    session
        .update_brief_field(BriefField::AchievedEffects, "识别速度提升")
        .unwrap();
    for row in session.overview().unwrap() {
        // Figures read the brief only through the invention section.
        let expected = match row.section {
            SectionKey::FigureDescription | SectionKey::Drawings => Freshness::UpstreamStale,
            _ => Freshness::Stale,
        };
        assert_eq!(row.freshness, expected, "{}", row.section);
    }

    let summary = session.generate_all(GenerateScope::Outdated).await.unwrap();
    assert_eq!(summary.reports.len(), SectionKey::ALL.len());
    let summary = session.generate_all(GenerateScope::Outdated).await.unwrap();
    assert!(summary.reports.is_empty());
    assert_eq!(summary.unchanged.len(), SectionKey::ALL.len());
}

#[tokio::test]
async fn test_selecting_older_version_marks_downstream_stale() {
    let session = analyzed(Arc::new(scripted()), true).await;
    session.generate_all(GenerateScope::All).await.unwrap();
    session.generate_section(SectionKey::Background).await.unwrap();
    session.generate_all(GenerateScope::Outdated).await.unwrap();
    assert!(!session.is_stale(Key::Section(SectionKey::Claims)).unwrap());

    session
        .set_active_version(Key::Section(SectionKey::Background), 0)
        .unwrap();
    assert!(session.is_stale(Key::Section(SectionKey::Invention)).unwrap());
    assert!(!session.is_stale(Key::Section(SectionKey::Claims)).unwrap());
    assert_eq!(
        session.status(Key::Section(SectionKey::Claims)).unwrap(),
        Freshness::UpstreamStale
    );
    assert!(!session.is_stale(Key::Section(SectionKey::Title)).unwrap());
}

#[tokio::test]
async fn test_regenerated_section_is_not_stale_while_upstream_is() {
    let session = analyzed(Arc::new(scripted()), true).await;
    session.generate_all(GenerateScope::All).await.unwrap();
    session
        .update_brief_field(BriefField::AchievedEffects, "识别速度提升")
        .unwrap();
    let invention = Key::Section(SectionKey::Invention);
    assert!(session.is_stale(invention).unwrap());

    session.generate_section(SectionKey::Invention).await.unwrap();
    assert!(session.is_stale(Key::Section(SectionKey::Background)).unwrap());
    assert!(!session.is_stale(invention).unwrap());
    assert_eq!(session.status(invention).unwrap(), Freshness::UpstreamStale);
}

#[tokio::test]
async fn test_refinement_leaves_primary_untouched() {
    let session = analyzed(Arc::new(scripted()), true).await;
    session.generate_all(GenerateScope::All).await.unwrap();

    let before: Vec<_> = SectionKey::ALL
        .iter()
        .map(|s| session.artifact(Key::Section(*s)).unwrap())
        .collect();
    let draft = session.refine_all().await.unwrap();
    let after: Vec<_> = SectionKey::ALL
        .iter()
        .map(|s| session.artifact(Key::Section(*s)).unwrap())
        .collect();
    assert_eq!(before, after);

    assert_eq!(draft.get(SectionKey::Abstract), Some(&Content::text("润色后的章节")));
    assert_eq!(draft.get(SectionKey::Drawings), Some(&Content::Drawings(Vec::new())));
    // Title has no instructions to replay.
    assert!(draft.warnings.iter().any(|w| w.starts_with("title")));
    assert_eq!(session.refined().unwrap(), Some(draft));

    let markdown = session.export_markdown(true).unwrap();
    assert!(markdown.contains("# 八、摘要\n润色后的章节\n\n"));
}

#[tokio::test]
async fn test_refine_prompt_carries_other_sections() {
    let model = Arc::new(scripted());
    let session = analyzed(model.clone(), true).await;
    session.generate_all(GenerateScope::All).await.unwrap();
    session.refine_all().await.unwrap();

    let claims_prompt = model
        .calls()
        .into_iter()
        .map(|(p, _)| p)
        .find(|p| p.contains("【目标章节】权利要求书"))
        .unwrap();
    assert!(claims_prompt.contains("--- 摘要 ---\n本发明公开了一种图像识别方法。"));
    assert!(!claims_prompt.contains("--- 权利要求书 ---"));
    // The replayed instructions are inserted verbatim, placeholders included.
    assert!(claims_prompt.contains("{solution_points_str}"));
}

#[tokio::test]
async fn test_auxiliary_units() {
    let session = analyzed(Arc::new(scripted()), false).await;
    let labels = session.generate_figure_labels().await.unwrap();
    assert_eq!(labels[1].name, "融合模块");

    assert!(matches!(
        session.check_claims().await.unwrap_err(),
        DraftError::UnresolvedDependency { .. }
    ));
    session.generate_all(GenerateScope::All).await.unwrap();
    let report = session.check_claims().await.unwrap();
    assert!(!report.supported);
    assert_eq!(report.issues[0].claim, Some(2));

    let markdown = session.export_markdown(false).unwrap();
    assert!(markdown.contains("附图标记说明：\n10 滤波模块\n20 融合模块"));
}

#[tokio::test]
async fn test_regenerate_single_drawing() {
    let session = analyzed(Arc::new(scripted()), false).await;
    session.generate_all(GenerateScope::All).await.unwrap();
    let update = session.regenerate_drawing(1).await.unwrap();
    assert_eq!(update.index, 1);
    assert_eq!(session.versions(Key::Unit(UnitKey::MermaidCode)).unwrap().len(), 2);
    assert!(session.regenerate_drawing(5).await.is_err());
}

struct SlowModel;

#[async_trait]
impl LanguageModel for SlowModel {
    async fn invoke(&self, _messages: &[Message], _json_mode: bool) -> anyhow::Result<String> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(String::new())
    }

    fn name(&self) -> &str {
        "slow"
    }
}

#[tokio::test]
async fn test_model_timeout() {
    let config = config(true).with_model_timeout(Duration::from_millis(20));
    let session = DraftSession::new(MemoryStore::new(), Arc::new(SlowModel), config, "slow").unwrap();
    let err = session.analyze_brief("交底书").await.unwrap_err();
    assert!(matches!(err, DraftError::ModelTimeout { .. }));
    assert!(session.versions(Key::Brief).unwrap().is_empty());
}

#[tokio::test]
async fn test_audit_trail_and_step_resume() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("draft.redb");
    let audit = AuditConfig::new().with_log_dir(dir.path().join("logs"));
    let config = SessionConfig::new().with_audit(audit);

    {
        let store = RedbStore::open(&db).unwrap();
        let session = DraftSession::new(store, Arc::new(scripted()), config.clone(), "run1").unwrap();
        session.analyze_brief("交底书").await.unwrap();
        session.generate_section(SectionKey::TechnicalField).await.unwrap();
        assert_eq!(session.audit().current_step(), 2);

        let calls = session
            .audit()
            .query(&AuditFilter {
                action: Some(AuditAction::ModelCall),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].context["step"], "0001_structured_brief");
        let artifact = session.audit().artifact_dir().join("0002_unit-tech_field_response.txt");
        assert_eq!(
            std::fs::read_to_string(artifact).unwrap(),
            "本发明涉及图像处理技术领域。"
        );
    }

    let store = RedbStore::open(&db).unwrap();
    let session = DraftSession::new(store, Arc::new(scripted()), config, "run1").unwrap();
    assert_eq!(session.audit().current_step(), 2);
    assert_eq!(
        section_text_redb(&session, SectionKey::TechnicalField),
        "本发明涉及图像处理技术领域。"
    );
}

fn section_text_redb(session: &DraftSession<RedbStore>, section: SectionKey) -> String {
    session
        .active_content(Key::Section(section))
        .unwrap()
        .map(|c| c.render_text())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_assembly_is_idempotent_after_generation() {
    let session = analyzed(Arc::new(scripted()), true).await;
    session.generate_all(GenerateScope::All).await.unwrap();

    let brief = session.brief().unwrap();
    let assembler = Assembler::new(session.store(), &brief, true);
    for section in SectionKey::ALL {
        let first = assembler.assemble(*section).unwrap();
        let second = assembler.assemble(*section).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            Some(first.content),
            session.active_content(Key::Section(*section)).unwrap()
        );
    }
}
