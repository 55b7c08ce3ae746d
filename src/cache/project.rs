use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectStatus {
    #[default]
    Untranslated,
    Translating,
    Translated,
}

/// Project-level progress counters, folded into under a single lock as tasks
/// complete. `line <= total_line` holds once round 0 fixes `total_line`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Extras {
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub total_line: u64,
    #[serde(default)]
    pub line: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub total_output_tokens: u64,
    #[serde(default)]
    pub time: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheProject {
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub extras: Extras,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_project_is_untranslated_with_zeroed_extras() {
        let project = CacheProject::default();
        assert_eq!(project.status, ProjectStatus::Untranslated);
        assert_eq!(project.extras.total_line, 0);
    }
}
