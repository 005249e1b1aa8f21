use std::fmt;

/// Errors raised while building a topic path from its identifiers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicError {
    #[error("{kind} id must not be empty")]
    Empty { kind: &'static str },

    #[error("{kind} id {value:?} contains forbidden character {found:?}")]
    ForbiddenCharacter {
        kind: &'static str,
        value: String,
        found: char,
    },
}

/// Fully-qualified publish destination, `projects/{project}/topics/{topic}`.
///
/// Resolved once at startup and reused for every publish. Both identifiers
/// become literal topic levels, so separators and wildcards are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPath {
    project_id: String,
    topic_id: String,
    path: String,
}

impl TopicPath {
    pub fn new(project_id: &str, topic_id: &str) -> Result<Self, TopicError> {
        validate_id("project", project_id)?;
        validate_id("topic", topic_id)?;

        Ok(Self {
            project_id: project_id.to_string(),
            topic_id: topic_id.to_string(),
            path: format!("projects/{}/topics/{}", project_id, topic_id),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn topic_id(&self) -> &str {
        &self.topic_id
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for TopicPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.path)
    }
}

fn validate_id(kind: &'static str, value: &str) -> Result<(), TopicError> {
    if value.is_empty() {
        return Err(TopicError::Empty { kind });
    }
    if let Some(found) = value
        .chars()
        .find(|c| matches!(c, '/' | '+' | '#') || c.is_whitespace() || c.is_control())
    {
        return Err(TopicError::ForbiddenCharacter {
            kind,
            value: value.to_string(),
            found,
        });
    }
    Ok(())
}
