use super::template::describe_cube;
use super::{DescribeError, DescriptionProvider, MemberDescriptions, TableContext};
use crate::semantic_model::CubeModel;
use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

const SYSTEM_PROMPT: &str = "You write concise business descriptions for analytics data models. \
Answer with a single JSON object and nothing else.";

/// A chat-style text generation service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, DescribeError>;
}

/// Asks a [`TextGenerator`] for every description of a table in one
/// request, falling back to template text when that fails.
pub struct LlmDescriptions<G> {
    generator: G,
    retries: usize,
}

impl<G: TextGenerator> LlmDescriptions<G> {
    pub fn new(generator: G) -> Self {
        LlmDescriptions {
            generator,
            retries: 1,
        }
    }

    async fn request(
        &self,
        context: &TableContext,
        cube: &CubeModel,
    ) -> Result<MemberDescriptions, DescribeError> {
        let prompt = build_prompt(context, cube);
        let text = self.generator.generate(SYSTEM_PROMPT, &prompt).await?;
        parse_response(&text, cube)
    }
}

#[async_trait]
impl<G: TextGenerator> DescriptionProvider for LlmDescriptions<G> {
    async fn describe(&self, context: &TableContext, cube: &CubeModel) -> MemberDescriptions {
        let template = describe_cube(cube);
        for attempt in 0..=self.retries {
            match self.request(context, cube).await {
                Ok(described) => {
                    debug!("Described {} on attempt {}", cube.name, attempt + 1);
                    return template.merge(described);
                }
                Err(e) => warn!(
                    "Description request for {} failed (attempt {}): {}",
                    cube.name,
                    attempt + 1,
                    e
                ),
            }
        }
        warn!("Using template descriptions for {}", cube.name);
        template
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}

pub fn build_prompt(context: &TableContext, cube: &CubeModel) -> String {
    let measures: Vec<_> = cube
        .measures
        .iter()
        .map(|m| json!({"name": m.name, "type": m.aggregation, "column": m.column}))
        .collect();
    let dimensions: Vec<_> = cube
        .dimensions
        .iter()
        .map(|d| json!({"name": d.name, "type": d.dimension_type, "column": d.column}))
        .collect();
    let request = json!({
        "table": context,
        "measures": measures,
        "dimensions": dimensions,
    });
    format!(
        "Describe this {} table from a {} business in one sentence per item.\n\
         Respond with JSON of the form \
         {{\"cube\": \"...\", \"measures\": {{\"<name>\": \"...\"}}, \"dimensions\": {{\"<name>\": \"...\"}}}} \
         using exactly the member names given.\n\n{}",
        context.classification, context.domain, request
    )
}

#[derive(Debug, Deserialize)]
struct LlmResponse {
    cube: Option<String>,
    #[serde(default)]
    measures: BTreeMap<String, String>,
    #[serde(default)]
    dimensions: BTreeMap<String, String>,
}

/// Strips an optional markdown code fence around the JSON body.
fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Keeps non-empty entries for members the cube actually has.
pub fn parse_response(text: &str, cube: &CubeModel) -> Result<MemberDescriptions, DescribeError> {
    let response: LlmResponse = serde_json::from_str(strip_fence(text))
        .map_err(|e| DescribeError::MalformedResponse(e.to_string()))?;

    let clean = |s: String| {
        let s = s.trim().to_string();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    };

    Ok(MemberDescriptions {
        cube: response.cube.and_then(clean),
        measures: response
            .measures
            .into_iter()
            .filter(|(name, _)| cube.measure(name).is_some())
            .filter_map(|(name, text)| clean(text).map(|t| (name, t)))
            .collect(),
        dimensions: response
            .dimensions
            .into_iter()
            .filter(|(name, _)| cube.dimension(name).is_some())
            .filter_map(|(name, text)| clean(text).map(|t| (name, t)))
            .collect(),
    })
}
