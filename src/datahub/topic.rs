//! Validated project/topic addressing

use crate::datahub::validate::{validate_project_name, validate_topic_name};
use crate::error::WaiterError;
use std::fmt;

/// A (project, topic) pair whose names have passed validation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicRef {
    project: String,
    topic: String,
}

impl TopicRef {
    pub fn new(project: impl Into<String>, topic: impl Into<String>) -> Result<Self, WaiterError> {
        let project = project.into();
        let topic = topic.into();
        validate_project_name(&project)?;
        validate_topic_name(&topic)?;
        Ok(Self { project, topic })
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl fmt::Display for TopicRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.topic)
    }
}
