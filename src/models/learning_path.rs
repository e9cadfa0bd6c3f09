use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::{FieldError, Validate, check_length, into_result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    pub const ALL: [SkillLevel; 3] = [
        SkillLevel::Beginner,
        SkillLevel::Intermediate,
        SkillLevel::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "beginner",
            SkillLevel::Intermediate => "intermediate",
            SkillLevel::Advanced => "advanced",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "New to the subject with little to no prior experience",
            SkillLevel::Intermediate => {
                "Some experience with basic concepts and looking to expand knowledge"
            }
            SkillLevel::Advanced => "Experienced practitioner looking to master advanced concepts",
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SkillLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SkillLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid skill level: {}. Must be one of: beginner, intermediate, advanced",
                    s
                )
            })
    }
}

/// Total length of a learning path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathDuration {
    #[serde(rename = "1-week")]
    OneWeek,
    #[serde(rename = "1-month")]
    OneMonth,
    #[serde(rename = "3-months")]
    ThreeMonths,
    #[serde(rename = "6-months")]
    SixMonths,
}

/// How a duration is divided into phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhasePlan {
    pub phases: usize,
    pub phase_duration: &'static str,
}

impl PathDuration {
    pub const ALL: [PathDuration; 4] = [
        PathDuration::OneWeek,
        PathDuration::OneMonth,
        PathDuration::ThreeMonths,
        PathDuration::SixMonths,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PathDuration::OneWeek => "1-week",
            PathDuration::OneMonth => "1-month",
            PathDuration::ThreeMonths => "3-months",
            PathDuration::SixMonths => "6-months",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PathDuration::OneWeek => "Intensive crash course covering essential basics",
            PathDuration::OneMonth => "Comprehensive introduction with hands-on practice",
            PathDuration::ThreeMonths => "In-depth learning with project-based application",
            PathDuration::SixMonths => {
                "Mastery-focused path with advanced topics and specialization"
            }
        }
    }

    pub fn phase_plan(&self) -> PhasePlan {
        let (phases, phase_duration) = match self {
            PathDuration::OneWeek => (2, "3-4 days"),
            PathDuration::OneMonth => (4, "1 week"),
            PathDuration::ThreeMonths => (6, "2 weeks"),
            PathDuration::SixMonths => (8, "3 weeks"),
        };
        PhasePlan {
            phases,
            phase_duration,
        }
    }
}

impl fmt::Display for PathDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PathDuration {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PathDuration::ALL
            .into_iter()
            .find(|duration| duration.as_str() == s)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid duration: {}. Must be one of: 1-week, 1-month, 3-months, 6-months",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPathRequest {
    pub goals: String,
    pub skill_level: SkillLevel,
    pub duration: PathDuration,
    #[serde(default)]
    pub focus_areas: Vec<String>,
}

impl Validate for LearningPathRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        check_length(&mut errors, "goals", &self.goals, 10, 1000);
        into_result(errors)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    /// book, video, tutorial, documentation, course, ...
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPhase {
    /// 1-based.
    pub phase_number: u32,
    pub title: String,
    pub description: String,
    pub duration: String,
    pub objectives: Vec<String>,
    pub activities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPathResponse {
    pub title: String,
    pub duration: PathDuration,
    pub skill_level: SkillLevel,
    pub phases: Vec<LearningPhase>,
    pub resources: Vec<Resource>,
}

/// Valid choices for a learning path request, with human descriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPathOptions {
    pub skill_levels: Vec<SkillLevel>,
    pub durations: Vec<PathDuration>,
    pub skill_level_descriptions: BTreeMap<String, String>,
    pub duration_descriptions: BTreeMap<String, String>,
}

impl LearningPathOptions {
    pub fn all() -> Self {
        Self {
            skill_levels: SkillLevel::ALL.to_vec(),
            durations: PathDuration::ALL.to_vec(),
            skill_level_descriptions: SkillLevel::ALL
                .iter()
                .map(|l| (l.as_str().to_string(), l.description().to_string()))
                .collect(),
            duration_descriptions: PathDuration::ALL
                .iter()
                .map(|d| (d.as_str().to_string(), d.description().to_string()))
                .collect(),
        }
    }
}

/// Keyword-level reading of a goals statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalAnalysis {
    pub original: String,
    pub length: usize,
    pub word_count: usize,
    pub has_specific_technologies: bool,
    pub has_timeframe: bool,
    /// low, medium or high.
    pub complexity_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPathValidation {
    pub valid: bool,
    pub message: String,
    pub goal_analysis: GoalAnalysis,
    pub estimated_phases: usize,
    pub phase_duration: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_parses_enums_and_defaults_focus_areas() {
        let req: LearningPathRequest = serde_json::from_value(json!({
            "goals": "Learn Rust web development",
            "skill_level": "intermediate",
            "duration": "3-months"
        }))
        .unwrap();
        assert_eq!(req.skill_level, SkillLevel::Intermediate);
        assert_eq!(req.duration, PathDuration::ThreeMonths);
        assert!(req.focus_areas.is_empty());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_request_rejects_unknown_duration() {
        let result: Result<LearningPathRequest, _> = serde_json::from_value(json!({
            "goals": "Learn Rust web development",
            "skill_level": "beginner",
            "duration": "2-years"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_goals_too_short() {
        let req = LearningPathRequest {
            goals: "Rust".to_string(),
            skill_level: SkillLevel::Beginner,
            duration: PathDuration::OneWeek,
            focus_areas: vec![],
        };
        let errors = req.validate().unwrap_err();
        assert_eq!(errors[0].field, "goals");
    }

    #[test]
    fn test_phase_plans() {
        assert_eq!(PathDuration::OneWeek.phase_plan().phases, 2);
        assert_eq!(PathDuration::OneWeek.phase_plan().phase_duration, "3-4 days");
        assert_eq!(PathDuration::OneMonth.phase_plan().phases, 4);
        assert_eq!(PathDuration::ThreeMonths.phase_plan().phase_duration, "2 weeks");
        assert_eq!(PathDuration::SixMonths.phase_plan().phases, 8);
    }

    #[test]
    fn test_resource_type_field_name() {
        let resource = Resource {
            title: "The Book".to_string(),
            resource_type: "book".to_string(),
            url: None,
            description: None,
        };
        let value = serde_json::to_value(&resource).unwrap();
        assert_eq!(value["type"], "book");
    }

    #[test]
    fn test_options_list_everything() {
        let value = serde_json::to_value(LearningPathOptions::all()).unwrap();
        assert_eq!(
            value["durations"],
            json!(["1-week", "1-month", "3-months", "6-months"])
        );
        assert_eq!(
            value["skill_levels"],
            json!(["beginner", "intermediate", "advanced"])
        );
        assert!(value["duration_descriptions"]["6-months"].is_string());
    }

    #[test]
    fn test_from_str_round_trips_display() {
        for level in SkillLevel::ALL {
            assert_eq!(level.to_string().parse::<SkillLevel>().unwrap(), level);
        }
        assert!("expert".parse::<SkillLevel>().is_err());
        assert_eq!(
            "6-months".parse::<PathDuration>().unwrap(),
            PathDuration::SixMonths
        );
    }
}
