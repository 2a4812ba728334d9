//! Identifier validation
//!
//! DataHub rejects malformed names server side; checking locally keeps
//! obviously bad input from ever reaching the network.

use crate::error::WaiterError;

pub const PROJECT_NAME_MIN_LEN: usize = 3;
pub const PROJECT_NAME_MAX_LEN: usize = 32;
pub const TOPIC_NAME_MIN_LEN: usize = 1;
pub const TOPIC_NAME_MAX_LEN: usize = 128;

/// Names start with an ASCII letter, followed by ASCII alphanumerics or `_`
fn is_valid_name(name: &str, min: usize, max: usize) -> bool {
    if name.len() < min || name.len() > max {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Check a project name
pub fn check_project_name(name: &str) -> bool {
    is_valid_name(name, PROJECT_NAME_MIN_LEN, PROJECT_NAME_MAX_LEN)
}

/// Check a topic name
pub fn check_topic_name(name: &str) -> bool {
    is_valid_name(name, TOPIC_NAME_MIN_LEN, TOPIC_NAME_MAX_LEN)
}

pub fn validate_project_name(name: &str) -> Result<(), WaiterError> {
    if check_project_name(name) {
        Ok(())
    } else {
        Err(WaiterError::InvalidParameter {
            field: "project name",
            value: name.to_string(),
        })
    }
}

pub fn validate_topic_name(name: &str) -> Result<(), WaiterError> {
    if check_topic_name(name) {
        Ok(())
    } else {
        Err(WaiterError::InvalidParameter {
            field: "topic name",
            value: name.to_string(),
        })
    }
}
