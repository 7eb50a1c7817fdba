//! Editor context value objects.
//!
//! [`EditorContext`] is the agent's read-only snapshot of the open video
//! project: what is selected, which entities exist, and where the playhead
//! sits. It is refreshed between iterations by an injected collaborator and
//! is the reference the doom-loop classifier checks entity ids against.

use serde::{Deserialize, Serialize};

/// Snapshot of the video project visible to the agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorContext {
    /// Project name, if a project is open
    pub project_name: Option<String>,
    /// Currently selected clip ids
    pub selected_clip_ids: Vec<String>,
    /// Currently selected track ids
    pub selected_track_ids: Vec<String>,
    /// All clip ids present in the open sequence
    pub clip_ids: Vec<String>,
    /// All track ids present in the open sequence
    pub track_ids: Vec<String>,
    /// All asset ids available in the project bin
    pub asset_ids: Vec<String>,
    /// Playhead position in timeline seconds
    pub playhead_sec: f64,
    /// Total sequence duration in seconds
    pub sequence_duration_sec: f64,
    /// Free-form notes (memory hydration, user preferences)
    pub notes: Vec<String>,
}

impl EditorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    pub fn with_clip(mut self, id: impl Into<String>) -> Self {
        self.clip_ids.push(id.into());
        self
    }

    pub fn with_track(mut self, id: impl Into<String>) -> Self {
        self.track_ids.push(id.into());
        self
    }

    pub fn with_asset(mut self, id: impl Into<String>) -> Self {
        self.asset_ids.push(id.into());
        self
    }

    pub fn with_selected_clip(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !self.clip_ids.contains(&id) {
            self.clip_ids.push(id.clone());
        }
        self.selected_clip_ids.push(id);
        self
    }

    pub fn with_selected_track(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !self.track_ids.contains(&id) {
            self.track_ids.push(id.clone());
        }
        self.selected_track_ids.push(id);
        self
    }

    pub fn with_playhead(mut self, sec: f64) -> Self {
        self.playhead_sec = sec;
        self
    }

    /// Adds a free-form note (used for memory hydration).
    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// The single selected clip, when exactly one clip is selected.
    pub fn sole_selected_clip(&self) -> Option<&str> {
        match self.selected_clip_ids.as_slice() {
            [id] => Some(id.as_str()),
            _ => None,
        }
    }

    /// The single selected track, when exactly one track is selected.
    pub fn sole_selected_track(&self) -> Option<&str> {
        match self.selected_track_ids.as_slice() {
            [id] => Some(id.as_str()),
            _ => None,
        }
    }

    /// Whether `id` names a clip, track or asset known to this context.
    pub fn knows_entity(&self, id: &str) -> bool {
        self.clip_ids.iter().any(|c| c == id)
            || self.track_ids.iter().any(|t| t == id)
            || self.asset_ids.iter().any(|a| a == id)
    }

    /// Formats the context as a string for use in LLM prompts.
    pub fn to_prompt_context(&self) -> String {
        let mut parts = Vec::new();

        if let Some(name) = &self.project_name {
            parts.push(format!("Project: {}", name));
        }
        parts.push(format!(
            "Playhead: {:.2}s / {:.2}s",
            self.playhead_sec, self.sequence_duration_sec
        ));
        if !self.selected_clip_ids.is_empty() {
            parts.push(format!(
                "Selected clips: {}",
                self.selected_clip_ids.join(", ")
            ));
        }
        if !self.selected_track_ids.is_empty() {
            parts.push(format!(
                "Selected tracks: {}",
                self.selected_track_ids.join(", ")
            ));
        }
        if !self.track_ids.is_empty() {
            parts.push(format!("Tracks: {}", self.track_ids.join(", ")));
        }
        if !self.clip_ids.is_empty() {
            parts.push(format!("Clips: {}", self.clip_ids.join(", ")));
        }
        if !self.asset_ids.is_empty() {
            parts.push(format!("Assets: {}", self.asset_ids.join(", ")));
        }
        if !self.notes.is_empty() {
            parts.push(format!("Notes:\n- {}", self.notes.join("\n- ")));
        }

        parts.join("\n")
    }
}

/// Context handed to the tool-executor port for each invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    /// Target project id
    pub project_id: Option<String>,
    /// Target sequence id
    pub sequence_id: Option<String>,
    /// When true, tools report what they would do without applying changes
    pub dry_run: bool,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, id: impl Into<String>) -> Self {
        self.project_id = Some(id.into());
        self
    }

    pub fn with_sequence(mut self, id: impl Into<String>) -> Self {
        self.sequence_id = Some(id.into());
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}
