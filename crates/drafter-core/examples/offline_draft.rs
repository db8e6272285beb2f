use drafter_core::{
    AuditConfig, BriefField, DraftSession, Freshness, GenerateScope, Key, RedbStore,
    ScriptedModel, SectionKey, SessionConfig,
};
use std::sync::Arc;

const BRIEF: &str = r#"{
    "background_technology": "传统温控系统采用固定阈值启停加热器",
    "problem_statement": "温度波动大，能耗高",
    "core_inventive_concept": "基于负荷预测的分段温控",
    "technical_solution_summary": "根据历史负荷预测下一时段需求，分段调节加热功率",
    "key_components_or_steps": [
        {"name": "负荷预测模块", "function": "预测下一时段热负荷"},
        {"name": "功率调节模块", "function": "按预测结果分段调节功率"}
    ],
    "achieved_effects": "温度波动减小，能耗降低"
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    println!("=== Offline Drafting Example ===\n");

    // 1. Open a store and a scripted model
    println!("1. Opening session...");
    std::fs::create_dir_all("./data")?;
    let store = RedbStore::open("./data/example.redb")?;
    let model = Arc::new(
        ScriptedModel::new("本段内容由示例模型生成。")
            .on("提炼为一个 JSON 对象", BRIEF)
            .on("中文发明名称", r#"["一种基于负荷预测的分段温控方法"]"#)
            .on("拆解为 3 至 6 个", r#"["负荷预测", "分段功率调节"]"#),
    );
    let config = SessionConfig::new().with_audit(AuditConfig::new().with_log_dir("./data/logs"));
    let session = DraftSession::new(store, model, config, "example")?;
    println!("   ✓ Session opened at ./data/example.redb\n");

    // 2. Analyze the disclosure
    println!("2. Analyzing disclosure...");
    let brief = session.analyze_brief("一种温控方法的技术交底书").await?;
    println!("   ✓ Core concept: {}\n", brief.field_text(BriefField::CoreInventiveConcept));

    // 3. Generate every section
    println!("3. Generating sections...");
    let summary = session.generate_all(GenerateScope::All).await?;
    for report in &summary.reports {
        println!(
            "   ✓ {} (version {}, {} fallbacks)",
            report.section.label(),
            report.update.index,
            report.fallbacks.len()
        );
    }
    for failure in &summary.failures {
        println!("   ✗ {}: {}", failure.section, failure.error);
    }
    println!();

    // 4. Edit the brief and watch staleness propagate
    println!("4. Editing the brief...");
    session.update_brief_field(BriefField::AchievedEffects, "温度波动小于0.5℃")?;
    for row in session.overview()? {
        let mark = match row.freshness {
            Freshness::Fresh => "fresh",
            Freshness::Stale => "stale",
            Freshness::UpstreamStale => "upstream",
            Freshness::NotGenerated => "-",
        };
        println!("   {:<8} {}", mark, row.label);
    }
    println!();

    // 5. Regenerate what changed and export
    println!("5. Regenerating outdated sections...");
    let summary = session.generate_all(GenerateScope::Outdated).await?;
    println!("   ✓ {} sections regenerated\n", summary.reports.len());

    let title = session.active_content(Key::Section(SectionKey::Title))?;
    println!("   Title: {}", title.map(|c| c.render_text()).unwrap_or_default());
    std::fs::write("./data/example.md", session.export_markdown(false)?)?;
    println!("   ✓ Exported to ./data/example.md");

    Ok(())
}
