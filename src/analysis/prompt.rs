use serde::{Deserialize, Serialize};

const DEFAULT_SYSTEM: &str =
    "你是一个专业的诗歌分析专家，必须严格按照用户要求的JSON格式输出。";

const DEFAULT_INSTRUCTIONS: &str = concat!(
    "你好，请严格按JSON格式分析以下诗歌：\n\n",
    "诗歌内容：\n{poem}\n\n",
    "输出要求：\n",
    "- date: 成诗年代（用公元纪年，直接用数字，公元前用负值）\n",
    "- flower: 相关花卉名称（使用完整名称，如无则写\"none\"）\n",
    "- imagery: 意象情感标签数组（中文关键词）\n\n",
    "输出格式：\n",
    "{\"date\": 年代, \"flower\": \"花卉\", \"imagery\": [\"意象1\", \"意象2\"]}\n\n",
    "重点：\n",
    "1. date字段使用公元纪年整数（公元前用负值）\n",
    "2. flower字段使用完整的花卉名称\n",
    "3. imagery字段使用简洁的关键词标签\n\n",
    "只输出一个JSON对象，不要任何其他文字说明！"
);

const POEM_PLACEHOLDER: &str = "{poem}";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub system: Option<String>,
    /// Instruction text; `{poem}` is replaced by the poem content.
    pub user: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system: Some(DEFAULT_SYSTEM.to_string()),
            user: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: PromptTemplate,
}

impl PromptBuilder {
    pub fn new(template: PromptTemplate) -> Self {
        Self { template }
    }

    pub fn system(&self) -> Option<&str> {
        self.template.system.as_deref()
    }

    pub fn build(&self, poem: &str) -> String {
        if self.template.user.contains(POEM_PLACEHOLDER) {
            self.template.user.replacen(POEM_PLACEHOLDER, poem, 1)
        } else {
            format!("{}\n\n{}", self.template.user, poem)
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(PromptTemplate::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_poem_and_requests_the_three_keys() {
        let prompt = PromptBuilder::default().build("墙角数枝梅，凌寒独自开。");
        assert!(prompt.contains("墙角数枝梅，凌寒独自开。"));
        assert!(!prompt.contains(POEM_PLACEHOLDER));
        for key in ["\"date\"", "\"flower\"", "\"imagery\""] {
            assert!(prompt.contains(key), "missing {key}");
        }
        assert!(prompt.contains("公元前用负值"));
    }

    #[test]
    fn empty_poem_still_yields_a_prompt() {
        let prompt = PromptBuilder::default().build("");
        assert!(prompt.contains("诗歌内容："));
    }

    #[test]
    fn template_without_placeholder_appends_poem() {
        let builder = PromptBuilder::new(PromptTemplate {
            system: None,
            user: "Analyse:".to_string(),
        });
        assert_eq!(builder.build("静夜思"), "Analyse:\n\n静夜思");
        assert!(builder.system().is_none());
    }
}
