//! Generation instructions for every unit.
//!
//! Placeholders use `{name}`; literal JSON examples are safe because only
//! bare identifiers inside braces are substituted.

/// System message sent ahead of every generation request.
pub const ROLE: &str = "你是一名资深中国专利代理师，熟悉《专利法》《专利审查指南》及中文专利文件撰写规范。\
撰写时用语客观、严谨、技术化，不夸大、不编造输入中没有的技术事实。";

pub const ANALYZE: &str = "任务：阅读下列技术交底材料，提炼为一个 JSON 对象。\n\
只输出 JSON，不要任何解释。字段：\n\
- background_technology: 最相关的现有技术及其原理、应用场景；\n\
- problem_statement: 现有技术的关键缺陷、成因及影响；\n\
- core_inventive_concept: 本质性的创新点；\n\
- technical_solution_summary: 方案整体架构与主要流程；\n\
- key_components_or_steps: 数组，元素形如 {\"name\": \"组件A\", \"function\": \"功能\"}；\n\
- achieved_effects: 与现有技术相比可验证的效果，每行一条。\n\
缺失的信息填 null，数组字段填 []。\n\n\
技术交底材料：\n{user_input}";

pub const TITLE: &str = "任务：生成 3 个不超过 25 字的中文发明名称，准确体现技术内容并突出创新点，\
优先采用“一种基于……的……方法/装置/系统”的表述，不含英文与特殊符号。\n\
输出 JSON，例如 {\"titles\": [\"名称一\", \"名称二\", \"名称三\"]}。\n\n\
核心创新点：{core_inventive_concept}\n\
技术方案概述：{technical_solution_summary}";

pub const TECH_FIELD: &str = "任务：撰写“技术领域”段落，以“本发明涉及……”开头，\
指明所属技术领域及所涉对象、方法或系统。只输出段落内容。\n\n\
核心创新点：{core_inventive_concept}\n\
技术方案概述：{technical_solution_summary}";

pub const BACKGROUND_PROBLEM: &str = "任务：基于技术问题概要，撰写“现有技术存在的问题”段落，\
依次说明具体缺陷、技术性根因以及对性能、成本或可靠性的影响。只输出段落内容。\n\n\
技术问题概要：{problem_statement}";

pub const BACKGROUND_CONTEXT: &str = "任务：撰写“对最接近的现有技术状况的分析说明”，\
客观描述一至两种主流方案的原理与应用，并铺垫其固有局限。只输出段落内容。\n\n\
现有技术详细描述：\n{background_technology}\n\
现有技术存在的问题：\n{background_problem}";

pub const INVENTION_PURPOSE: &str = "任务：针对下述现有技术问题，撰写“发明目的”段落，\
以“本发明的目的在于……”句式说明要解决的技术问题。只输出段落内容。\n\n\
现有技术存在的问题：\n{background_problem}";

pub const SOLUTION_POINTS: &str = "任务：将技术方案拆解为 3 至 6 个相互独立、可在实施例中展开的技术要点。\n\
输出 JSON 字符串数组，例如 [\"要点一\", \"要点二\"]。\n\n\
技术方案概述：{technical_solution_summary}\n\
关键组件/步骤及其功能：\n{key_components_or_steps}";

pub const SOLUTION_DETAIL: &str = "任务：撰写“技术解决方案”，完整描述系统构成或方法步骤，\
说明各组件之间的连接关系与协作方式，术语前后一致。只输出正文。\n\n\
核心创新点：{core_inventive_concept}\n\
技术方案概述：{technical_solution_summary}\n\
关键组件/步骤及其功能：\n{key_components_or_steps}";

pub const INVENTION_EFFECTS: &str = "任务：撰写“技术效果”段落，将每个有益效果与产生它的技术特征对应起来，\
避免空泛表述。只输出段落内容。\n\n\
技术方案要点：\n{solution_points_str}\n\
有益效果概述：{achieved_effects}";

pub const MERMAID_IDEAS: &str = "任务：为下述技术方案构思 2 至 4 幅专利附图（如系统结构图、方法流程图）。\n\
输出 JSON 数组，元素形如 {\"title\": \"图名\", \"description\": \"该图展示的内容\"}。\n\n\
技术解决方案：\n{invention_solution_detail}";

pub const FIGURE_NOTES: &str = "任务：根据附图构思撰写“附图说明”，每幅图一行，形如“图1为……的示意图；”。\
只输出附图说明正文。\n\n\
附图构思（JSON）：\n{mermaid_ideas}";

pub const FIGURE_LABELS: &str = "任务：为下列关键组件/步骤分配附图标记，编号从 1 开始递增。\n\
输出 JSON 数组，元素形如 {\"label\": \"1\", \"name\": \"组件名称\"}。\n\n\
关键组件/步骤：\n{key_components_json}";

pub const MERMAID_CODE: &str = "任务：为下述附图构思编写 Mermaid 图代码，节点使用中文名称，\
只输出代码本身，不要解释。\n\n\
附图标题：{title}\n\
附图描述：{description}\n\n\
技术方案参考：\n{invention_solution_detail}";

pub const IMPLEMENTATION_POINT: &str = "任务：围绕下述技术要点撰写一段具体实施方式，\
给出可操作的结构、参数或步骤细节，使本领域技术人员能够实现。只输出段落内容。\n\n\
技术要点：\n{point}";

pub const CLAIMS: &str = "任务：撰写权利要求书，第 1 项为独立权利要求，其余为引用在前权利要求的从属权利要求，\
每项一段并以序号开头，技术特征须有说明书支持。只输出权利要求正文。\n\n\
核心创新点：{core_inventive_concept}\n\
技术方案概述：{technical_solution_summary}\n\
关键组件/步骤：\n{key_components_or_steps}\n\
技术特征要点：\n{solution_points_str}";

pub const CLAIMS_CHECK: &str = "任务：逐项检查权利要求中的技术特征是否在说明书中得到支持，术语是否一致。\n\
输出 JSON 对象：{\"supported\": true/false, \"issues\": [{\"claim\": 1, \"problem\": \"问题\", \"suggestion\": \"建议\"}]}。\n\n\
权利要求书：\n{claims}\n\n\
说明书上下文：\n{global_context}\n\n\
术语与组件清单：\n{key_components_json}";

pub const ABSTRACT: &str = "任务：撰写不超过 300 字的说明书摘要，依次概括所要解决的技术问题、\
技术方案要点与主要用途或效果。只输出摘要正文。\n\n\
技术问题：{problem_statement}\n\
技术方案要点：\n{solution_points_str}\n\
有益效果：{achieved_effects}";

pub const REFINE: &str = "任务：作为总编，在不改变技术事实的前提下，结合全文上下文重写目标章节，\
消除与其他章节的重复与矛盾，统一术语。\n\n\
【全文上下文】\n{global_context}\n\n\
【目标章节】{target_section_name}\n\
【目标章节当前内容】\n{target_section_content}\n\n\
【原始生成要求】\n{original_generation_prompt}\n\n\
只输出重写后的{target_section_name}正文，不含标题或说明。";
