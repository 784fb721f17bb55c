use serde::{Deserialize, Serialize};

use crate::config::Config;

/// 选题书文本生成服务的客户端。
/// 服务本身是黑盒：文本进文本出；未配置服务地址时退化为本地模板生成，
/// 保证选题编辑页在离线部署下仍然可用
#[derive(Clone)]
pub struct AiClient {
    http: reqwest::Client,
    base_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProposalForm {
    pub title: String,
    pub description: String,
    pub field: String,
    pub keywords: Vec<String>,
    pub project_type: String,
}

#[derive(Debug, Serialize)]
struct TextTask<'a> {
    task: &'a str,
    #[serde(flatten)]
    payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct TextResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct KeywordsResponse {
    keywords: Vec<String>,
}

impl AiClient {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.ai_service_timeout())
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: config.ai_service_url.clone(),
        }
    }

    async fn call_text(
        &self,
        base: &str,
        task: &str,
        payload: serde_json::Value,
    ) -> Result<String, reqwest::Error> {
        let resp: TextResponse = self
            .http
            .post(format!("{}/generate", base.trim_end_matches('/')))
            .json(&TextTask { task, payload })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.text)
    }

    pub async fn generate_title(
        &self,
        description: &str,
        field: &str,
    ) -> Result<String, reqwest::Error> {
        if let Some(base) = &self.base_url {
            return self
                .call_text(
                    base,
                    "title",
                    serde_json::json!({ "description": description, "field": field }),
                )
                .await;
        }
        Ok(fallback_title(description, field))
    }

    pub async fn generate_full_proposal(
        &self,
        form: &ProposalForm,
    ) -> Result<String, reqwest::Error> {
        if let Some(base) = &self.base_url {
            return self
                .call_text(base, "full_proposal", serde_json::json!(form))
                .await;
        }
        Ok(fallback_full_proposal(form))
    }

    pub async fn improve_description(
        &self,
        text: &str,
        field: &str,
    ) -> Result<String, reqwest::Error> {
        if let Some(base) = &self.base_url {
            return self
                .call_text(
                    base,
                    "improve",
                    serde_json::json!({ "text": text, "field": field }),
                )
                .await;
        }
        Ok(fallback_improve(text, field))
    }

    pub async fn suggest_keywords(
        &self,
        title: &str,
        description: &str,
    ) -> Result<Vec<String>, reqwest::Error> {
        if let Some(base) = &self.base_url {
            let resp: KeywordsResponse = self
                .http
                .post(format!("{}/keywords", base.trim_end_matches('/')))
                .json(&serde_json::json!({ "title": title, "description": description }))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            return Ok(resp.keywords);
        }
        Ok(fallback_keywords(title, description))
    }
}

fn fallback_title(description: &str, field: &str) -> String {
    let head: String = description
        .split_whitespace()
        .take(6)
        .collect::<Vec<_>>()
        .join(" ");
    if head.is_empty() {
        format!("A Study in {}", field)
    } else {
        format!("{}: A {} Study", head, field)
    }
}

fn fallback_full_proposal(form: &ProposalForm) -> String {
    format!(
        "# {title}\n\n## Background\n{description}\n\n## Field\n{field}\n\n\
         ## Keywords\n{keywords}\n\n## Methodology\nTo be elaborated by the group \
         under supervisor guidance.\n\n## Expected Outcome\nA completed {ptype} \
         with documented results and evaluation.\n",
        title = form.title,
        description = form.description,
        field = form.field,
        keywords = form.keywords.join(", "),
        ptype = form.project_type,
    )
}

fn fallback_improve(text: &str, field: &str) -> String {
    format!(
        "{} This work is situated in the area of {} and aims to produce \
         verifiable, well-documented results.",
        text.trim(),
        field
    )
}

fn fallback_keywords(title: &str, description: &str) -> Vec<String> {
    // 取标题和描述中较长的词去重作为候选关键词
    let mut seen = std::collections::HashSet::new();
    let mut keywords = Vec::new();
    for word in title.split_whitespace().chain(description.split_whitespace()) {
        let cleaned: String = word
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if cleaned.len() >= 5 && seen.insert(cleaned.clone()) {
            keywords.push(cleaned);
        }
        if keywords.len() >= 8 {
            break;
        }
    }
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_title_uses_description_head() {
        let title = fallback_title("A recommender system for campus canteens", "Data Mining");
        assert!(title.contains("recommender"));
        assert!(title.contains("Data Mining"));
    }

    #[test]
    fn fallback_keywords_deduplicates_and_caps() {
        let kws = fallback_keywords(
            "Blockchain Blockchain Voting",
            "secure voting using blockchain ledger ledger technology records metadata analysis",
        );
        assert!(kws.len() <= 8);
        assert_eq!(
            kws.iter().filter(|k| k.as_str() == "blockchain").count(),
            1
        );
    }

    #[test]
    fn fallback_proposal_contains_all_sections() {
        let form = ProposalForm {
            title: "T".into(),
            description: "D".into(),
            field: "F".into(),
            keywords: vec!["k1".into(), "k2".into()],
            project_type: "thesis".into(),
        };
        let text = fallback_full_proposal(&form);
        for section in ["Background", "Field", "Keywords", "Methodology", "Expected Outcome"] {
            assert!(text.contains(section));
        }
        assert!(text.contains("k1, k2"));
    }
}
