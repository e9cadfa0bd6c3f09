use log::{error, info, warn};
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};

use crate::error::ServiceError;
use crate::models::{
    GoalAnalysis, LearningPathRequest, LearningPathResponse, LearningPathValidation,
    LearningPhase, PathDuration, Resource, SkillLevel,
};
use crate::openrouter::{ChatCompletion, ChatMessage, CompletionOptions};

const MAX_TOKENS: u32 = 2000;
const TEMPERATURE: f32 = 0.7;
const TITLE_GOAL_CHARS: usize = 50;

const TECH_KEYWORDS: &[&str] = &[
    "python",
    "javascript",
    "react",
    "fastapi",
    "django",
    "flask",
    "nodejs",
    "typescript",
    "vue",
    "angular",
    "docker",
    "kubernetes",
    "aws",
    "azure",
    "gcp",
    "sql",
    "mongodb",
    "postgresql",
];

const TIMEFRAME_KEYWORDS: &[&str] = &["week", "month", "year", "quickly", "fast", "slow", "gradual"];

static FENCED_JSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("Invalid fenced block regex")
});

const SYSTEM_PROMPT: &str = "You are an expert learning path designer and educational consultant. Create comprehensive, structured learning paths that are practical, achievable, and tailored to the learner's goals and skill level.";

fn build_prompt(
    goals: &str,
    skill_level: SkillLevel,
    duration: PathDuration,
    focus_areas: &[String],
) -> String {
    let plan = duration.phase_plan();
    let focus = if focus_areas.is_empty() {
        String::new()
    } else {
        format!("\nSpecific focus areas: {}", focus_areas.join(", "))
    };

    format!(
        r#"Create a comprehensive learning path with the following specifications:

**Learning Goals:** {goals}
**Current Skill Level:** {skill_level}
**Duration:** {duration}
**Number of Phases:** {phases}
**Phase Duration:** {phase_duration}{focus}

Please provide a structured learning path in the following JSON format:

{{
    "title": "Descriptive title for the learning path",
    "phases": [
        {{
            "phase_number": 1,
            "title": "Phase title",
            "description": "What the learner will accomplish in this phase",
            "duration": "{phase_duration}",
            "objectives": ["Specific learning objective 1", "Specific learning objective 2"],
            "activities": ["Practical activity 1", "Practical activity 2", "Practical activity 3"]
        }}
    ],
    "resources": [
        {{
            "title": "Resource title",
            "type": "book|video|tutorial|documentation|course",
            "url": "https://example.com (if available)",
            "description": "Brief description of the resource"
        }}
    ]
}}

Requirements:
- Create exactly {phases} phases
- Each phase should build upon the previous one
- Include 3-5 specific objectives per phase
- Include 3-6 practical activities per phase
- Recommend 5-10 high-quality learning resources
- Tailor content to {skill_level} level
- Ensure activities are hands-on and practical
- Include a mix of resource types (books, videos, tutorials, etc.)
- Make objectives measurable and achievable

Respond with valid JSON only, no additional text."#,
        phases = plan.phases,
        phase_duration = plan.phase_duration,
    )
}

pub struct LearningPathService {
    client: Arc<dyn ChatCompletion>,
}

impl LearningPathService {
    pub fn new(client: Arc<dyn ChatCompletion>) -> Self {
        Self { client }
    }

    #[tracing::instrument(skip(self, goals, focus_areas))]
    pub async fn generate_path(
        &self,
        goals: &str,
        skill_level: SkillLevel,
        duration: PathDuration,
        focus_areas: &[String],
    ) -> Result<LearningPathResponse, ServiceError> {
        validate_goals(goals)?;

        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_prompt(goals, skill_level, duration, focus_areas)),
        ];
        let raw = self
            .client
            .chat_completion(messages, CompletionOptions::new(MAX_TOKENS, TEMPERATURE))
            .await
            .map_err(|e| {
                error!("Learning path generation failed: {}", e);
                if e.is_provider_error() {
                    e
                } else {
                    ServiceError::LearningPathGeneration {
                        message: format!("Learning path generation failed: {}", e),
                        goals: Some(goals.to_string()),
                        skill_level: Some(skill_level.to_string()),
                    }
                }
            })?;

        let path = structure_path(raw.trim(), goals, skill_level, duration);
        info!(
            "Generated learning path with {} phases and {} resources",
            path.phases.len(),
            path.resources.len()
        );
        Ok(path)
    }

    /// Checks a request without generating anything.
    pub fn validate_request(request: &LearningPathRequest) -> LearningPathValidation {
        let plan = request.duration.phase_plan();
        LearningPathValidation {
            valid: true,
            message: "Request parameters are valid".to_string(),
            goal_analysis: analyze_goals(&request.goals),
            estimated_phases: plan.phases,
            phase_duration: plan.phase_duration.to_string(),
        }
    }

    pub async fn health_check(&self) -> bool {
        let goals = "Learn basic programming concepts and build a simple web application";
        match self
            .generate_path(goals, SkillLevel::Beginner, PathDuration::OneMonth, &[])
            .await
        {
            Ok(path) => !path.phases.is_empty() && !path.resources.is_empty(),
            Err(e) => {
                error!("Learning path health check failed: {}", e);
                false
            }
        }
    }
}

fn validate_goals(goals: &str) -> Result<(), ServiceError> {
    let trimmed = goals.trim().chars().count();
    if trimmed < 10 {
        return Err(ServiceError::validation(
            "Goals must be at least 10 characters long",
            "goals",
            Some(trimmed.to_string()),
        ));
    }
    let total = goals.chars().count();
    if total > 1000 {
        return Err(ServiceError::validation(
            "Goals must be less than 1000 characters",
            "goals",
            Some(total.to_string()),
        ));
    }
    Ok(())
}

/// Keyword-level reading of a goals statement.
pub fn analyze_goals(goals: &str) -> GoalAnalysis {
    let lower = goals.to_lowercase();
    let word_count = goals.split_whitespace().count();
    let mentions = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    let complexity_level = if word_count > 50 || mentions(&["advanced", "complex"]) {
        "high"
    } else if word_count < 20 || mentions(&["basic", "simple"]) {
        "low"
    } else {
        "medium"
    };

    GoalAnalysis {
        original: goals.to_string(),
        length: goals.chars().count(),
        word_count,
        has_specific_technologies: mentions(TECH_KEYWORDS),
        has_timeframe: mentions(TIMEFRAME_KEYWORDS),
        complexity_level: complexity_level.to_string(),
    }
}

/// Turns the model's reply into a path, falling back to a generic plan
/// when the reply is not a JSON object.
pub fn structure_path(
    raw: &str,
    goals: &str,
    skill_level: SkillLevel,
    duration: PathDuration,
) -> LearningPathResponse {
    let json_text = FENCED_JSON_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map_or(raw, |m| m.as_str());

    match serde_json::from_str::<Value>(json_text) {
        Ok(data @ Value::Object(_)) => from_json(&data, goals, skill_level, duration),
        Ok(_) => {
            warn!("Learning path reply is not a JSON object, using fallback structure");
            fallback_path(goals, skill_level, duration)
        }
        Err(e) => {
            warn!("Failed to parse learning path JSON ({}), using fallback structure", e);
            fallback_path(goals, skill_level, duration)
        }
    }
}

fn str_or(value: &Value, key: &str, default: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn str_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn from_json(
    data: &Value,
    goals: &str,
    skill_level: SkillLevel,
    duration: PathDuration,
) -> LearningPathResponse {
    let phases = array(data, "phases")
        .iter()
        .map(|phase| LearningPhase {
            phase_number: phase
                .get("phase_number")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(1)
                .max(1),
            title: str_or(phase, "title", "Learning Phase"),
            description: str_or(phase, "description", ""),
            duration: str_or(phase, "duration", "1 week"),
            objectives: str_list(phase, "objectives"),
            activities: str_list(phase, "activities"),
        })
        .collect();

    let resources = array(data, "resources")
        .iter()
        .map(|resource| Resource {
            title: str_or(resource, "title", "Learning Resource"),
            resource_type: str_or(resource, "type", "tutorial"),
            url: resource.get("url").and_then(Value::as_str).map(str::to_string),
            description: resource
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
        .collect();

    let title = data
        .get("title")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            let head: String = goals.chars().take(TITLE_GOAL_CHARS).collect();
            format!("Learning Path: {}...", head)
        });

    LearningPathResponse {
        title,
        duration,
        skill_level,
        phases,
        resources,
    }
}

/// Generic path with the planned number of phases.
pub fn fallback_path(
    goals: &str,
    skill_level: SkillLevel,
    duration: PathDuration,
) -> LearningPathResponse {
    let plan = duration.phase_plan();
    let phases = (1..=plan.phases as u32)
        .map(|n| LearningPhase {
            phase_number: n,
            title: format!("Phase {}: Learning Fundamentals", n),
            description: format!(
                "Focus on core concepts and practical application for phase {}",
                n
            ),
            duration: plan.phase_duration.to_string(),
            objectives: vec![
                format!("Complete foundational learning for phase {}", n),
                "Apply knowledge through practical exercises".to_string(),
                "Build upon previous phase knowledge".to_string(),
            ],
            activities: vec![
                "Study relevant materials".to_string(),
                "Complete practical exercises".to_string(),
                "Review and practice concepts".to_string(),
            ],
        })
        .collect();

    let resource = |title: &str, kind: &str, description: &str| Resource {
        title: title.to_string(),
        resource_type: kind.to_string(),
        url: None,
        description: Some(description.to_string()),
    };
    let resources = vec![
        resource(
            "Online Documentation",
            "documentation",
            "Official documentation and guides",
        ),
        resource("Video Tutorials", "video", "Step-by-step video tutorials"),
        resource("Practice Exercises", "tutorial", "Hands-on practice exercises"),
    ];

    let head: String = goals.chars().take(TITLE_GOAL_CHARS).collect();
    let ellipsis = if goals.chars().count() > TITLE_GOAL_CHARS {
        "..."
    } else {
        ""
    };

    LearningPathResponse {
        title: format!("Learning Path: {}{}", head, ellipsis),
        duration,
        skill_level,
        phases,
        resources,
    }
}
