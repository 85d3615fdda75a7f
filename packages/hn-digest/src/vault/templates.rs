//! Agent instruction documents embedded at compile time.

use super::files::{
    AGENT_INSTRUCTIONS_FILE_NAME, DIGEST_FILE_NAME, NEWS_DIGEST_FOLDER, STORIES_FOLDER,
    UNPROCESSED_DIGEST_DATA_FILE_NAME,
};

const ROOT_AGENT: &str = include_str!("../../resources/Agent.md");
const NEWS_DIGEST_AGENT: &str = include_str!("../../resources/NewsDigestAgent.md");
const STORIES_AGENT: &str = include_str!("../../resources/StoriesAgent.md");

/// Template token and its replacement.
const TOKENS: &[(&str, &str)] = &[
    ("{{NEWS_DIGEST_FILE_NAME}}", DIGEST_FILE_NAME),
    (
        "{{UNPROCESSED_DIGEST_DATA_FILE_NAME}}",
        UNPROCESSED_DIGEST_DATA_FILE_NAME,
    ),
    ("{{NEWS_DIGEST_FOLDER}}", NEWS_DIGEST_FOLDER),
    ("{{STORIES_FOLDER}}", STORIES_FOLDER),
];

/// An instruction file to deploy, relative to the knowledge-base root.
#[derive(Debug, Clone, Copy)]
pub struct InstructionFile {
    pub folder: Option<&'static str>,
    pub template: &'static str,
}

impl InstructionFile {
    /// Path of the deployed file relative to the knowledge-base root.
    pub fn relative_path(&self) -> String {
        match self.folder {
            Some(folder) => format!("{}/{}", folder, AGENT_INSTRUCTIONS_FILE_NAME),
            None => AGENT_INSTRUCTIONS_FILE_NAME.to_string(),
        }
    }

    /// Template with every token substituted.
    pub fn render(&self) -> String {
        render(self.template)
    }
}

/// Every instruction file the knowledge base ships with.
pub const INSTRUCTION_FILES: &[InstructionFile] = &[
    InstructionFile {
        folder: None,
        template: ROOT_AGENT,
    },
    InstructionFile {
        folder: Some(NEWS_DIGEST_FOLDER),
        template: NEWS_DIGEST_AGENT,
    },
    InstructionFile {
        folder: Some(STORIES_FOLDER),
        template: STORIES_AGENT,
    },
];

/// Substitute known `{{TOKEN}}`s; unknown tokens are left alone.
pub fn render(template: &str) -> String {
    TOKENS
        .iter()
        .fold(template.to_string(), |content, &(token, value)| {
            content.replace(token, value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_tokens() {
        assert_eq!(
            render("read {{UNPROCESSED_DIGEST_DATA_FILE_NAME}} then write {{NEWS_DIGEST_FILE_NAME}} ({{OTHER}})"),
            "read unprocessed_data_news_digest.json then write news_digest.json ({{OTHER}})"
        );
    }

    #[test]
    fn test_shipped_templates_have_no_known_tokens_left() {
        for file in INSTRUCTION_FILES {
            let rendered = file.render();
            for &(token, _) in TOKENS {
                assert!(!rendered.contains(token), "{} left in {}", token, file.relative_path());
            }
        }
    }

    #[test]
    fn test_relative_paths() {
        let paths: Vec<_> = INSTRUCTION_FILES.iter().map(InstructionFile::relative_path).collect();
        assert_eq!(paths, vec!["Agent.md", "news_digest/Agent.md", "stories/Agent.md"]);
    }
}
