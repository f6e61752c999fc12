//! Project-creation wizard: draft state, step validation and the payload
//! posted to the project API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

/// Number of wizard steps (basics, details, timeline, team).
pub const TOTAL_STEPS: u8 = 4;
/// Maximum number of tags on a project.
pub const MAX_TAGS: usize = 10;

pub const CATEGORIES: &[&str] = &[
    "Web Development",
    "Mobile App",
    "AI/ML",
    "Data Science",
    "DevOps",
    "Design",
    "Blockchain",
    "Game Development",
    "Other",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Private,
    #[default]
    #[serde(rename = "Team Only")]
    TeamOnly,
    Organization,
    Public,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberRole {
    Admin,
    #[default]
    Developer,
    Designer,
    Tester,
    Viewer,
}

/// Team member row as edited in the wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMemberDraft {
    /// Client-side row key
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub github_username: String,
    #[serde(default)]
    pub discord_username: String,
    #[serde(default)]
    pub role: MemberRole,
}

/// Wizard form state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectDraft {
    pub current_step: u8,

    // Step 1: basics
    pub project_name: String,
    pub category: String,
    pub priority: Priority,

    // Step 2: details
    pub description: String,
    pub tags: Vec<String>,
    pub uploaded_files: Vec<String>,

    // Step 3: timeline
    pub start_date: String,
    pub end_date: String,
    pub duration_weeks: String,

    // Step 4: team & integration
    pub team_members: Vec<TeamMemberDraft>,
    pub github_repo: String,
    pub discord_server: String,
    pub tech_stack_preferences: Vec<String>,
    pub visibility: Visibility,
}

impl Default for ProjectDraft {
    fn default() -> Self {
        Self {
            current_step: 1,
            project_name: String::new(),
            category: String::new(),
            priority: Priority::default(),
            description: String::new(),
            tags: Vec::new(),
            uploaded_files: Vec::new(),
            start_date: String::new(),
            end_date: String::new(),
            duration_weeks: String::new(),
            team_members: Vec::new(),
            github_repo: String::new(),
            discord_server: String::new(),
            tech_stack_preferences: Vec::new(),
            visibility: Visibility::default(),
        }
    }
}

/// Why a draft cannot advance or be submitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("step {step}: {field} is required")]
    Required { step: u8, field: &'static str },

    #[error("step {step}: {field} is invalid: {reason}")]
    Invalid {
        step: u8,
        field: &'static str,
        reason: String,
    },
}

impl ProjectDraft {
    pub fn next_step(&mut self) {
        if self.current_step < TOTAL_STEPS {
            self.current_step += 1;
        }
    }

    pub fn prev_step(&mut self) {
        if self.current_step > 1 {
            self.current_step -= 1;
        }
    }

    /// Add a trimmed tag. Returns false when blank or the tag list is full.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.len() >= MAX_TAGS {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|t| t != tag);
    }

    pub fn add_tech(&mut self, tech: &str) -> bool {
        let tech = tech.trim();
        if tech.is_empty() {
            return false;
        }
        self.tech_stack_preferences.push(tech.to_string());
        true
    }

    pub fn remove_tech(&mut self, tech: &str) {
        self.tech_stack_preferences.retain(|t| t != tech);
    }

    /// Append an empty member row keyed by `id`.
    pub fn add_team_member(&mut self, id: u64) {
        self.team_members.push(TeamMemberDraft {
            id,
            ..TeamMemberDraft::default()
        });
    }

    pub fn remove_team_member(&mut self, id: u64) {
        self.team_members.retain(|m| m.id != id);
    }

    pub fn add_files<I: IntoIterator<Item = String>>(&mut self, names: I) {
        self.uploaded_files.extend(names);
    }

    pub fn remove_file(&mut self, name: &str) {
        self.uploaded_files.retain(|f| f != name);
    }

    /// Check the fields belonging to one wizard step.
    pub fn validate_step(&self, step: u8) -> Result<(), DraftError> {
        match step {
            1 => {
                if self.project_name.trim().is_empty() {
                    return Err(DraftError::Required {
                        step,
                        field: "projectName",
                    });
                }
                if self.category.trim().is_empty() {
                    return Err(DraftError::Required {
                        step,
                        field: "category",
                    });
                }
                if !CATEGORIES.contains(&self.category.as_str()) {
                    return Err(DraftError::Invalid {
                        step,
                        field: "category",
                        reason: format!("unknown category '{}'", self.category),
                    });
                }
                Ok(())
            }
            2 => {
                if self.description.trim().is_empty() {
                    return Err(DraftError::Required {
                        step,
                        field: "description",
                    });
                }
                if self.tags.len() > MAX_TAGS {
                    return Err(DraftError::Invalid {
                        step,
                        field: "tags",
                        reason: format!("at most {} tags", MAX_TAGS),
                    });
                }
                Ok(())
            }
            3 => {
                let start = parse_date(step, "startDate", &self.start_date)?;
                let end = parse_date(step, "endDate", &self.end_date)?;
                if let (Some(start), Some(end)) = (start, end) {
                    if end < start {
                        return Err(DraftError::Invalid {
                            step,
                            field: "endDate",
                            reason: "ends before it starts".to_string(),
                        });
                    }
                }
                parse_weeks(step, &self.duration_weeks)?;
                Ok(())
            }
            4 => {
                for member in &self.team_members {
                    if member.name.trim().is_empty() {
                        return Err(DraftError::Required {
                            step,
                            field: "teamMembers.name",
                        });
                    }
                    if !member.email.validate_email() {
                        return Err(DraftError::Invalid {
                            step,
                            field: "teamMembers.email",
                            reason: format!("'{}' is not an email address", member.email),
                        });
                    }
                }
                Ok(())
            }
            _ => Err(DraftError::Invalid {
                step,
                field: "currentStep",
                reason: format!("steps run from 1 to {}", TOTAL_STEPS),
            }),
        }
    }

    /// Validate every step, stopping at the first failure.
    pub fn validate(&self) -> Result<(), DraftError> {
        (1..=TOTAL_STEPS).try_for_each(|step| self.validate_step(step))
    }

    /// Build the API payload. Blank optional fields become `null`.
    pub fn into_payload(self, leader_name: String) -> Result<ProjectCreate, DraftError> {
        self.validate()?;
        let duration_weeks = parse_weeks(3, &self.duration_weeks)?;

        Ok(ProjectCreate {
            title: self.project_name.trim().to_string(),
            description: self.description,
            category: self.category,
            priority: self.priority,
            start_date: non_empty(self.start_date),
            end_date: non_empty(self.end_date),
            duration_weeks,
            leader_name,
            team_members: self
                .team_members
                .into_iter()
                .map(|m| TeamMember {
                    name: m.name,
                    email: m.email,
                    github_username: non_empty(m.github_username),
                    discord_username: non_empty(m.discord_username),
                    role: m.role,
                })
                .collect(),
            github_repo_url: non_empty(self.github_repo),
            discord_server_url: non_empty(self.discord_server),
            tech_stack_preferences: self.tech_stack_preferences,
            tags: self.tags,
            visibility: self.visibility,
        })
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_date(step: u8, field: &'static str, raw: &str) -> Result<Option<NaiveDate>, DraftError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| DraftError::Invalid {
            step,
            field,
            reason: e.to_string(),
        })
}

fn parse_weeks(step: u8, raw: &str) -> Result<Option<u32>, DraftError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u32>()
        .map(Some)
        .map_err(|_| DraftError::Invalid {
            step,
            field: "durationWeeks",
            reason: format!("'{}' is not a whole number of weeks", raw),
        })
}

/// Team member as sent to the project API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub email: String,
    pub github_username: Option<String>,
    pub discord_username: Option<String>,
    pub role: MemberRole,
}

/// Body of `POST /projects/` on the project API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCreate {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Priority,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub duration_weeks: Option<u32>,
    pub leader_name: String,
    pub team_members: Vec<TeamMember>,
    pub github_repo_url: Option<String>,
    pub discord_server_url: Option<String>,
    pub tech_stack_preferences: Vec<String>,
    pub tags: Vec<String>,
    pub visibility: Visibility,
}

/// Subset of the project API's create response we rely on.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedProject {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub title: Option<String>,
}
