// Data model of the Joplin Data API objects this connector touches, plus
// the serde input models for each tool. API fields outside the requested
// `fields` lists simply stay `None`.
use serde::{Deserialize, Serialize};

use crate::format::ResponseFormat;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notebook {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Notebook {
    /// Parent id with the API's empty-string root normalized away.
    pub fn parent(&self) -> &str {
        self.parent_id.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_time: Option<i64>,
    // 0/1 flags in the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_todo: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo_completed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Note {
    pub fn is_todo(&self) -> bool {
        self.is_todo.unwrap_or(0) != 0
    }

    pub fn todo_done(&self) -> bool {
        self.todo_completed.unwrap_or(0) != 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
}

// ---------------------------------------------------------------------------
// Tool input models
// ---------------------------------------------------------------------------

fn default_notes_limit() -> usize {
    50
}

fn default_search_limit() -> usize {
    20
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotesSortField {
    #[default]
    UpdatedTime,
    CreatedTime,
    Title,
    Order,
}

impl NotesSortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotesSortField::UpdatedTime => "updated_time",
            NotesSortField::CreatedTime => "created_time",
            NotesSortField::Title => "title",
            NotesSortField::Order => "order",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListNotebooksInput {
    #[serde(default)]
    pub response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
pub struct CreateNotebookInput {
    pub title: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListNotesInput {
    #[serde(default)]
    pub notebook_id: Option<String>,
    #[serde(default = "default_notes_limit")]
    pub limit: usize,
    #[serde(default)]
    pub order_by: NotesSortField,
    #[serde(default = "default_true")]
    pub order_desc: bool,
    #[serde(default)]
    pub response_format: ResponseFormat,
}

impl Default for ListNotesInput {
    fn default() -> Self {
        ListNotesInput {
            notebook_id: None,
            limit: default_notes_limit(),
            order_by: NotesSortField::default(),
            order_desc: true,
            response_format: ResponseFormat::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GetNoteInput {
    pub note_id: String,
    #[serde(default = "default_true")]
    pub include_body: bool,
    #[serde(default)]
    pub response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteInput {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub notebook_id: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub is_todo: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteInput {
    pub note_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub notebook_id: Option<String>,
    #[serde(default)]
    pub is_todo: Option<bool>,
    #[serde(default)]
    pub todo_completed: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteNoteInput {
    pub note_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchNotesInput {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
    #[serde(default)]
    pub response_format: ResponseFormat,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListTagsInput {
    #[serde(default)]
    pub response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
pub struct TagNoteInput {
    pub note_id: String,
    pub tag: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_notes_defaults() {
        let input: ListNotesInput = serde_json::from_value(json!({})).unwrap();
        assert_eq!(input.limit, 50);
        assert_eq!(input.order_by, NotesSortField::UpdatedTime);
        assert!(input.order_desc);
        assert_eq!(input.response_format, ResponseFormat::Markdown);
        assert!(input.notebook_id.is_none());
    }

    #[test]
    fn sort_field_parses_snake_case() {
        let input: ListNotesInput =
            serde_json::from_value(json!({"order_by": "created_time", "order_desc": false}))
                .unwrap();
        assert_eq!(input.order_by, NotesSortField::CreatedTime);
        assert!(!input.order_desc);
    }

    #[test]
    fn get_note_requires_id() {
        assert!(serde_json::from_value::<GetNoteInput>(json!({})).is_err());
        let input: GetNoteInput =
            serde_json::from_value(json!({"note_id": "abc"})).unwrap();
        assert!(input.include_body);
    }

    #[test]
    fn todo_flags_read_zero_as_false() {
        let note: Note = serde_json::from_value(json!({
            "id": "n1",
            "title": "t",
            "is_todo": 0,
            "todo_completed": 0,
        }))
        .unwrap();
        assert!(!note.is_todo());
        assert!(!note.todo_done());

        let todo: Note = serde_json::from_value(json!({
            "id": "n2",
            "title": "t",
            "is_todo": 1,
            "todo_completed": 1700000000000i64,
        }))
        .unwrap();
        assert!(todo.is_todo());
        assert!(todo.todo_done());
    }
}
