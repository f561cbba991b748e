use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Map as JsonMap, Value};
use tracing::warn;

use crate::client::{ApiClient, ListPage};
use crate::config::{self, JoplinConfig};
use crate::error::ConnectorError;
use crate::format::{format_timestamp, truncate_response, ResponseFormat};
use crate::launcher::{
    wait_api_ready, AppLauncher, DesktopLauncher, ENSURE_RUNNING_TIMEOUT,
};
use crate::utils::{structured_result, text_result};
use crate::Connector;
use rmcp::model::*;

mod types;
pub use types::{
    CreateNoteInput, CreateNotebookInput, DeleteNoteInput, GetNoteInput, ListNotebooksInput,
    ListNotesInput, ListTagsInput, Note, Notebook, NotesSortField, SearchNotesInput, Tag,
    TagNoteInput, UpdateNoteInput,
};

/// Cap applied to the full-listing endpoints (notebooks, tags).
const LIST_CAP: usize = 100;

const NOTE_LIST_FIELDS: &str =
    "id,title,parent_id,updated_time,created_time,is_todo,todo_completed";
const NOTE_DETAIL_FIELDS: &str =
    "id,title,parent_id,updated_time,created_time,is_todo,todo_completed,source_url";
const SEARCH_FIELDS: &str = "id,title,parent_id,updated_time,is_todo,todo_completed";

/// Short readiness probe used when Joplin already appears to be running.
const READY_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Successful handler output, one variant per response format. Only the
/// Markdown path is subject to truncation.
#[derive(Debug)]
pub enum ToolOutput {
    Markdown(String),
    Structured(Value),
}

/// Convert any error into the user-facing message the tools report instead
/// of propagating raw failures.
pub fn handle_error(err: &ConnectorError) -> String {
    match err {
        ConnectorError::Configuration(msg) => format!("Error: {}", msg),
        ConnectorError::Connection(_) => {
            let auto_launch_note = if config::auto_launch_enabled() {
                "\n\nNote: Auto-launch was attempted but Joplin may not have started in time."
            } else {
                "\n\nTip: Set JOPLIN_AUTO_LAUNCH=true to auto-start Joplin."
            };
            format!(
                "Error: Cannot connect to Joplin. Make sure:\n\
                 1. Joplin desktop is running\n\
                 2. Web Clipper service is enabled (Tools > Options > Web Clipper)\n\
                 3. The API port matches JOPLIN_PORT (default: {}){}",
                config::DEFAULT_PORT,
                auto_launch_note
            )
        }
        ConnectorError::Authentication(_) => {
            "Error: Invalid API token. Check JOPLIN_TOKEN is correct.".to_string()
        }
        ConnectorError::ResourceNotFound => {
            "Error: Resource not found. Check the ID is correct.".to_string()
        }
        ConnectorError::Timeout(_) => {
            "Error: Request timed out. Joplin may be busy or unresponsive.".to_string()
        }
        other => format!("Error: {}: {}", other.code_str(), other),
    }
}

fn parse_input<T: DeserializeOwned>(args: JsonMap<String, Value>) -> Result<T, ConnectorError> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| ConnectorError::InvalidParams(e.to_string()))
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConnectorError> {
    if value.trim().is_empty() {
        return Err(ConnectorError::InvalidParams(format!(
            "'{}' must not be empty",
            field
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// System tool
// ---------------------------------------------------------------------------

/// Ensure the API is ready, launching Joplin if needed. Useful for
/// pre-warming a session before batch operations.
pub async fn ensure_running(launcher: &dyn AppLauncher) -> String {
    let base_url = config::base_url_from_env();
    // The readiness probe tolerates a missing token; data operations don't.
    let token = config::token_from_env().unwrap_or_default();

    if launcher.is_running().await
        && wait_api_ready(&base_url, &token, READY_PROBE_TIMEOUT).await
    {
        return "Joplin is already running and API is ready.".to_string();
    }

    if !config::auto_launch_enabled() {
        return "Joplin is not running and auto-launch is disabled. \
                Please start Joplin manually and enable Web Clipper."
            .to_string();
    }

    if !launcher.launch() {
        return "Failed to launch Joplin. Could not find Joplin executable. \
                Please start Joplin manually."
            .to_string();
    }

    if wait_api_ready(&base_url, &token, ENSURE_RUNNING_TIMEOUT).await {
        "Joplin launched successfully and API is ready.".to_string()
    } else {
        format!(
            "Joplin was launched but API did not become ready within {} seconds. \
             Please check that Web Clipper is enabled in Joplin \
             (Tools > Options > Web Clipper).",
            ENSURE_RUNNING_TIMEOUT.as_secs()
        )
    }
}

// ---------------------------------------------------------------------------
// Notebook tools
// ---------------------------------------------------------------------------

async fn fetch_notebooks(client: &ApiClient) -> Result<Vec<Notebook>, ConnectorError> {
    client
        .fetch_all(
            "folders",
            &[("fields", "id,title,parent_id".to_string())],
            LIST_CAP,
        )
        .await
}

fn render_notebook_tree(notebooks: &[Notebook], parent: &str, level: usize, lines: &mut Vec<String>) {
    for notebook in notebooks.iter().filter(|nb| nb.parent() == parent) {
        let indent = "  ".repeat(level);
        lines.push(format!("{}- **{}**", indent, notebook.title));
        lines.push(format!("{}  ID: `{}`", indent, notebook.id));
        render_notebook_tree(notebooks, &notebook.id, level + 1, lines);
    }
}

pub async fn list_notebooks(
    client: &ApiClient,
    input: &ListNotebooksInput,
) -> Result<ToolOutput, ConnectorError> {
    let notebooks = fetch_notebooks(client).await?;

    if notebooks.is_empty() {
        return Ok(ToolOutput::Markdown("No notebooks found.".to_string()));
    }

    if input.response_format == ResponseFormat::Json {
        return Ok(ToolOutput::Structured(serde_json::to_value(&notebooks)?));
    }

    let mut lines = vec!["# Joplin Notebooks".to_string(), String::new()];
    render_notebook_tree(&notebooks, "", 0, &mut lines);
    Ok(ToolOutput::Markdown(lines.join("\n")))
}

/// Exact title match (case-insensitive) at the same parent level.
fn find_existing_notebook<'a>(
    notebooks: &'a [Notebook],
    title: &str,
    parent: &str,
) -> Option<&'a Notebook> {
    let wanted = title.to_lowercase();
    notebooks
        .iter()
        .find(|nb| nb.title.to_lowercase() == wanted && nb.parent() == parent)
}

pub async fn create_notebook(
    client: &ApiClient,
    input: &CreateNotebookInput,
) -> Result<ToolOutput, ConnectorError> {
    require_non_empty(&input.title, "title")?;

    // Check for an existing sibling with the same title before creating.
    let existing = fetch_notebooks(client).await?;
    let parent = input.parent_id.as_deref().unwrap_or("");
    if let Some(notebook) = find_existing_notebook(&existing, &input.title, parent) {
        return Ok(ToolOutput::Markdown(format!(
            "Notebook **{}** already exists (ID: `{}`). Using existing notebook.",
            notebook.title, notebook.id
        )));
    }

    let mut data = JsonMap::new();
    data.insert("title".to_string(), json!(input.title));
    if let Some(parent_id) = input.parent_id.as_deref().filter(|p| !p.is_empty()) {
        data.insert("parent_id".to_string(), json!(parent_id));
    }

    let notebook: Notebook = client
        .request_as(Method::POST, "folders", Some(&Value::Object(data)), &[])
        .await?;

    Ok(ToolOutput::Markdown(format!(
        "Created notebook **{}** (ID: `{}`)",
        notebook.title, notebook.id
    )))
}

// ---------------------------------------------------------------------------
// Note tools
// ---------------------------------------------------------------------------

fn push_note_entry(lines: &mut Vec<String>, note: &Note) {
    if note.is_todo() {
        let marker = if note.todo_done() { "[x]" } else { "[ ]" };
        lines.push(format!("### {} {}", marker, note.title));
    } else {
        lines.push(format!("### {}", note.title));
    }
    lines.push(format!("- **ID**: `{}`", note.id));
    lines.push(format!(
        "- **Updated**: {}",
        format_timestamp(note.updated_time)
    ));
    lines.push(String::new());
}

pub async fn list_notes(
    client: &ApiClient,
    input: &ListNotesInput,
) -> Result<ToolOutput, ConnectorError> {
    let limit = input.limit.clamp(1, 100);
    let params = [
        ("fields", NOTE_LIST_FIELDS.to_string()),
        ("order_by", input.order_by.as_str().to_string()),
        (
            "order_dir",
            if input.order_desc { "DESC" } else { "ASC" }.to_string(),
        ),
    ];

    let endpoint = match input.notebook_id.as_deref().filter(|id| !id.is_empty()) {
        Some(notebook_id) => format!("folders/{}/notes", notebook_id),
        None => "notes".to_string(),
    };

    let notes: Vec<Note> = client.fetch_all(&endpoint, &params, limit).await?;

    if notes.is_empty() {
        return Ok(ToolOutput::Markdown("No notes found.".to_string()));
    }

    if input.response_format == ResponseFormat::Json {
        return Ok(ToolOutput::Structured(serde_json::to_value(&notes)?));
    }

    let mut lines = vec![
        "# Joplin Notes".to_string(),
        format!("*Showing {} notes*", notes.len()),
        String::new(),
    ];
    for note in &notes {
        push_note_entry(&mut lines, note);
    }

    Ok(ToolOutput::Markdown(truncate_response(
        lines.join("\n"),
        notes.len(),
    )))
}

pub async fn get_note(
    client: &ApiClient,
    input: &GetNoteInput,
) -> Result<ToolOutput, ConnectorError> {
    require_non_empty(&input.note_id, "note_id")?;

    let mut fields = NOTE_DETAIL_FIELDS.to_string();
    if input.include_body {
        fields.push_str(",body");
    }

    let note: Note = client
        .request_as(
            Method::GET,
            &format!("notes/{}", input.note_id),
            None,
            &[("fields", fields)],
        )
        .await?;

    if input.response_format == ResponseFormat::Json {
        return Ok(ToolOutput::Structured(serde_json::to_value(&note)?));
    }

    let mut lines = vec![format!("# {}", note.title), String::new()];

    if note.is_todo() {
        let status = if note.todo_done() {
            "Completed [x]"
        } else {
            "Pending [ ]"
        };
        lines.push(format!("**Status**: {}", status));
    }

    lines.push(format!("- **ID**: `{}`", note.id));
    lines.push(format!(
        "- **Notebook**: `{}`",
        note.parent_id.as_deref().unwrap_or("Unknown")
    ));
    lines.push(format!(
        "- **Created**: {}",
        format_timestamp(note.created_time)
    ));
    lines.push(format!(
        "- **Updated**: {}",
        format_timestamp(note.updated_time)
    ));

    if let Some(source_url) = note.source_url.as_deref().filter(|u| !u.is_empty()) {
        lines.push(format!("- **Source**: {}", source_url));
    }

    if input.include_body {
        if let Some(body) = note.body.as_deref().filter(|b| !b.is_empty()) {
            lines.push(String::new());
            lines.push("---".to_string());
            lines.push(String::new());
            lines.push(body.to_string());
        }
    }

    Ok(ToolOutput::Markdown(lines.join("\n")))
}

/// Find a tag by name (case-insensitive) via the search endpoint.
async fn resolve_tag_id(
    client: &ApiClient,
    tag_name: &str,
) -> Result<Option<String>, ConnectorError> {
    let Some(result) = client
        .request(
            Method::GET,
            "search",
            None,
            &[
                ("query", tag_name.to_string()),
                ("type", "tag".to_string()),
            ],
        )
        .await?
    else {
        return Ok(None);
    };

    let Ok(page) = serde_json::from_value::<ListPage<Tag>>(result) else {
        return Ok(None);
    };

    let wanted = tag_name.to_lowercase();
    Ok(page
        .into_items()
        .into_iter()
        .find(|tag| tag.title.to_lowercase() == wanted)
        .map(|tag| tag.id))
}

/// Attach a tag to a note, creating the tag first if it doesn't exist.
async fn attach_tag(
    client: &ApiClient,
    note_id: &str,
    tag_name: &str,
) -> Result<(), ConnectorError> {
    let tag_id = match resolve_tag_id(client, tag_name).await? {
        Some(id) => id,
        None => {
            let tag: Tag = client
                .request_as(
                    Method::POST,
                    "tags",
                    Some(&json!({"title": tag_name})),
                    &[],
                )
                .await?;
            tag.id
        }
    };

    client
        .request(
            Method::POST,
            &format!("tags/{}/notes", tag_id),
            Some(&json!({"id": note_id})),
            &[],
        )
        .await?;
    Ok(())
}

pub async fn create_note(
    client: &ApiClient,
    input: &CreateNoteInput,
) -> Result<ToolOutput, ConnectorError> {
    require_non_empty(&input.title, "title")?;

    let mut data = JsonMap::new();
    data.insert("title".to_string(), json!(input.title));
    data.insert("body".to_string(), json!(input.body));
    if let Some(notebook_id) = input.notebook_id.as_deref().filter(|id| !id.is_empty()) {
        data.insert("parent_id".to_string(), json!(notebook_id));
    }
    if input.is_todo {
        data.insert("is_todo".to_string(), json!(1));
    }

    let note: Note = client
        .request_as(Method::POST, "notes", Some(&Value::Object(data)), &[])
        .await?;

    // Best-effort tagging: the note exists either way, so a failed tag must
    // not fail the creation.
    if let Some(tags) = &input.tags {
        for tag_name in tags {
            if let Err(err) = attach_tag(client, &note.id, tag_name).await {
                warn!(tag = %tag_name, %err, "Failed to tag new note, continuing");
            }
        }
    }

    let note_type = if input.is_todo { "to-do" } else { "note" };
    Ok(ToolOutput::Markdown(format!(
        "Created {} **{}** (ID: `{}`)",
        note_type, note.title, note.id
    )))
}

pub async fn update_note(
    client: &ApiClient,
    input: &UpdateNoteInput,
) -> Result<ToolOutput, ConnectorError> {
    require_non_empty(&input.note_id, "note_id")?;

    let mut data = JsonMap::new();
    if let Some(title) = &input.title {
        data.insert("title".to_string(), json!(title));
    }
    if let Some(body) = &input.body {
        data.insert("body".to_string(), json!(body));
    }
    if let Some(notebook_id) = &input.notebook_id {
        data.insert("parent_id".to_string(), json!(notebook_id));
    }
    if let Some(is_todo) = input.is_todo {
        data.insert("is_todo".to_string(), json!(if is_todo { 1 } else { 0 }));
    }
    if let Some(completed) = input.todo_completed {
        let stamp = if completed {
            chrono::Utc::now().timestamp_millis()
        } else {
            0
        };
        data.insert("todo_completed".to_string(), json!(stamp));
    }

    if data.is_empty() {
        return Ok(ToolOutput::Markdown(
            "Error: No fields to update. Provide at least one field to change.".to_string(),
        ));
    }

    let result = client
        .request(
            Method::PUT,
            &format!("notes/{}", input.note_id),
            Some(&Value::Object(data)),
            &[],
        )
        .await?;

    let title = input
        .title
        .clone()
        .or_else(|| {
            result
                .as_ref()
                .and_then(|v| v.get("title"))
                .and_then(|t| t.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| "Note".to_string());

    Ok(ToolOutput::Markdown(format!(
        "Updated note **{}** (ID: `{}`)",
        title, input.note_id
    )))
}

pub async fn delete_note(
    client: &ApiClient,
    input: &DeleteNoteInput,
) -> Result<ToolOutput, ConnectorError> {
    require_non_empty(&input.note_id, "note_id")?;

    client
        .request(
            Method::DELETE,
            &format!("notes/{}", input.note_id),
            None,
            &[],
        )
        .await?;

    Ok(ToolOutput::Markdown(format!(
        "Deleted note (ID: `{}`)",
        input.note_id
    )))
}

pub async fn search_notes(
    client: &ApiClient,
    input: &SearchNotesInput,
) -> Result<ToolOutput, ConnectorError> {
    require_non_empty(&input.query, "query")?;
    let limit = input.limit.clamp(1, 100);

    let result = client
        .request(
            Method::GET,
            "search",
            None,
            &[
                ("query", input.query.clone()),
                ("type", "note".to_string()),
                ("fields", SEARCH_FIELDS.to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await?;

    let notes: Vec<Note> = match result {
        Some(value) => serde_json::from_value::<ListPage<Note>>(value)
            .map(ListPage::into_items)
            .unwrap_or_default(),
        None => Vec::new(),
    };

    if notes.is_empty() {
        return Ok(ToolOutput::Markdown(format!(
            "No notes found matching '{}'.",
            input.query
        )));
    }

    if input.response_format == ResponseFormat::Json {
        return Ok(ToolOutput::Structured(serde_json::to_value(&notes)?));
    }

    let mut lines = vec![
        format!("# Search Results: '{}'", input.query),
        format!("*Found {} notes*", notes.len()),
        String::new(),
    ];
    for note in &notes {
        push_note_entry(&mut lines, note);
    }

    Ok(ToolOutput::Markdown(truncate_response(
        lines.join("\n"),
        notes.len(),
    )))
}

// ---------------------------------------------------------------------------
// Tag tools
// ---------------------------------------------------------------------------

pub async fn list_tags(
    client: &ApiClient,
    input: &ListTagsInput,
) -> Result<ToolOutput, ConnectorError> {
    let mut tags: Vec<Tag> = client
        .fetch_all("tags", &[("fields", "id,title".to_string())], LIST_CAP)
        .await?;

    if tags.is_empty() {
        return Ok(ToolOutput::Markdown("No tags found.".to_string()));
    }

    if input.response_format == ResponseFormat::Json {
        return Ok(ToolOutput::Structured(serde_json::to_value(&tags)?));
    }

    tags.sort_by_key(|tag| tag.title.to_lowercase());

    let mut lines = vec!["# Joplin Tags".to_string(), String::new()];
    for tag in &tags {
        lines.push(format!("- **{}** (ID: `{}`)", tag.title, tag.id));
    }

    Ok(ToolOutput::Markdown(lines.join("\n")))
}

pub async fn tag_note(
    client: &ApiClient,
    input: &TagNoteInput,
) -> Result<ToolOutput, ConnectorError> {
    require_non_empty(&input.note_id, "note_id")?;
    require_non_empty(&input.tag, "tag")?;

    attach_tag(client, &input.note_id, &input.tag).await?;

    Ok(ToolOutput::Markdown(format!(
        "Added tag **{}** to note `{}`",
        input.tag, input.note_id
    )))
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

pub struct JoplinConnector {
    launcher: Arc<dyn AppLauncher>,
}

impl Default for JoplinConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl JoplinConnector {
    pub fn new() -> Self {
        Self::with_launcher(Arc::new(DesktopLauncher))
    }

    pub fn with_launcher(launcher: Arc<dyn AppLauncher>) -> Self {
        JoplinConnector { launcher }
    }

    // Configuration is resolved fresh per call, never cached.
    fn client(&self) -> Result<ApiClient, ConnectorError> {
        Ok(ApiClient::with_launcher(
            JoplinConfig::from_env()?,
            Arc::clone(&self.launcher),
        ))
    }
}

fn finish(outcome: Result<ToolOutput, ConnectorError>) -> Result<CallToolResult, ConnectorError> {
    match outcome {
        Ok(ToolOutput::Markdown(text)) => Ok(text_result(text)),
        Ok(ToolOutput::Structured(value)) => structured_result(&value),
        Err(err) => Ok(text_result(handle_error(&err))),
    }
}

#[async_trait]
impl Connector for JoplinConnector {
    fn name(&self) -> &'static str {
        "joplin"
    }

    fn description(&self) -> &'static str {
        "A connector for the Joplin note-taking app via its local Data API (Web Clipper service)."
    }

    async fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities::builder().enable_tools().build()
    }

    async fn initialize(
        &self,
        _request: InitializeRequestParam,
    ) -> Result<InitializeResult, ConnectorError> {
        Ok(InitializeResult {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: self.capabilities().await,
            server_info: Implementation {
                name: self.name().to_string(),
                title: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Joplin connector for managing notes, notebooks, and tags through the local \
                 Data API. Requires JOPLIN_TOKEN (Joplin > Tools > Options > Web Clipper). \
                 Search supports title:, body:, tag:, notebook:, created:, updated: and type: \
                 prefixes. Call ensure_running before batch work to avoid cold-start delays."
                    .to_string(),
            ),
        })
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
    ) -> Result<ListResourcesResult, ConnectorError> {
        Ok(ListResourcesResult {
            resources: vec![],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        _request: ReadResourceRequestParam,
    ) -> Result<Vec<ResourceContents>, ConnectorError> {
        Err(ConnectorError::ResourceNotFound)
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
    ) -> Result<ListToolsResult, ConnectorError> {
        let tools = vec![
            Tool {
                name: Cow::Borrowed("ensure_running"),
                title: None,
                description: Some(Cow::Borrowed(
                    "Ensure the Joplin API is ready. Launches Joplin if needed and waits for \
                     the connection. Returns immediately if already running; useful for \
                     session pre-warming before batch operations.",
                )),
                input_schema: Arc::new(json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }).as_object().expect("Schema object").clone()),
                output_schema: None,
                annotations: None,
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("list_notebooks"),
                title: None,
                description: Some(Cow::Borrowed(
                    "List notebooks with IDs and hierarchy. Use to find a notebook_id for \
                     filtering. Always list notebooks before creating new ones to avoid \
                     duplicates.",
                )),
                input_schema: Arc::new(json!({
                    "type": "object",
                    "properties": {
                        "response_format": { "type": "string", "enum": ["markdown", "json"], "description": "Output format", "default": "markdown" }
                    },
                    "required": []
                }).as_object().expect("Schema object").clone()),
                output_schema: None,
                annotations: None,
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("create_notebook"),
                title: None,
                description: Some(Cow::Borrowed(
                    "Create a notebook or return the existing one. Checks for a duplicate \
                     title under the same parent first and returns the existing notebook ID \
                     if found.",
                )),
                input_schema: Arc::new(json!({
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "description": "Notebook title", "maxLength": 200 },
                        "parent_id": { "type": "string", "description": "Parent notebook ID for creating a sub-notebook" }
                    },
                    "required": ["title"]
                }).as_object().expect("Schema object").clone()),
                output_schema: None,
                annotations: None,
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("list_notes"),
                title: None,
                description: Some(Cow::Borrowed(
                    "List notes with IDs, titles and dates. Filter by notebook_id, sort by \
                     date or title. Returns metadata only; use get_note for full content.",
                )),
                input_schema: Arc::new(json!({
                    "type": "object",
                    "properties": {
                        "notebook_id": { "type": "string", "description": "Filter by notebook ID. If not set, lists all notes." },
                        "limit": { "type": "integer", "description": "Maximum notes to return", "default": 50, "minimum": 1, "maximum": 100 },
                        "order_by": { "type": "string", "enum": ["updated_time", "created_time", "title", "order"], "description": "Field to sort by", "default": "updated_time" },
                        "order_desc": { "type": "boolean", "description": "Sort descending (newest first)", "default": true },
                        "response_format": { "type": "string", "enum": ["markdown", "json"], "default": "markdown" }
                    },
                    "required": []
                }).as_object().expect("Schema object").clone()),
                output_schema: None,
                annotations: None,
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("get_note"),
                title: None,
                description: Some(Cow::Borrowed(
                    "Get a note by ID with its full Markdown content. Set include_body=false \
                     for metadata only.",
                )),
                input_schema: Arc::new(json!({
                    "type": "object",
                    "properties": {
                        "note_id": { "type": "string", "description": "The note ID" },
                        "include_body": { "type": "boolean", "description": "Include the full note body/content", "default": true },
                        "response_format": { "type": "string", "enum": ["markdown", "json"], "default": "markdown" }
                    },
                    "required": ["note_id"]
                }).as_object().expect("Schema object").clone()),
                output_schema: None,
                annotations: None,
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("create_note"),
                title: None,
                description: Some(Cow::Borrowed(
                    "Create a note with a Markdown body, optional tags, and to-do support. \
                     Tags are created automatically if they don't exist.",
                )),
                input_schema: Arc::new(json!({
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "description": "Note title", "maxLength": 500 },
                        "body": { "type": "string", "description": "Note content in Markdown format", "default": "" },
                        "notebook_id": { "type": "string", "description": "Notebook ID to create the note in. Uses the default notebook if not specified." },
                        "tags": { "type": "array", "items": { "type": "string" }, "description": "Tag names to apply (created if they don't exist)" },
                        "is_todo": { "type": "boolean", "description": "Create as a to-do item instead of a regular note", "default": false }
                    },
                    "required": ["title"]
                }).as_object().expect("Schema object").clone()),
                output_schema: None,
                annotations: None,
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("update_note"),
                title: None,
                description: Some(Cow::Borrowed(
                    "Update a note's title, body or notebook; convert to/from to-do or mark \
                     completion. Only the provided fields are changed.",
                )),
                input_schema: Arc::new(json!({
                    "type": "object",
                    "properties": {
                        "note_id": { "type": "string", "description": "The note ID to update" },
                        "title": { "type": "string", "description": "New note title", "maxLength": 500 },
                        "body": { "type": "string", "description": "New note content in Markdown" },
                        "notebook_id": { "type": "string", "description": "Move note to a different notebook" },
                        "is_todo": { "type": "boolean", "description": "Convert to/from to-do item" },
                        "todo_completed": { "type": "boolean", "description": "Mark to-do as completed/incomplete" }
                    },
                    "required": ["note_id"]
                }).as_object().expect("Schema object").clone()),
                output_schema: None,
                annotations: None,
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("delete_note"),
                title: None,
                description: Some(Cow::Borrowed(
                    "Delete a note permanently. Cannot be undone.",
                )),
                input_schema: Arc::new(json!({
                    "type": "object",
                    "properties": {
                        "note_id": { "type": "string", "description": "The note ID to delete" }
                    },
                    "required": ["note_id"]
                }).as_object().expect("Schema object").clone()),
                output_schema: None,
                annotations: None,
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("search_notes"),
                title: None,
                description: Some(Cow::Borrowed(
                    "Search notes. Supports title:, body:, tag:, notebook:, created:, \
                     updated: and type: prefixes, e.g. \"tag:work type:todo\".",
                )),
                input_schema: Arc::new(json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Search query with optional field prefixes", "maxLength": 500 },
                        "limit": { "type": "integer", "description": "Maximum results to return", "default": 20, "minimum": 1, "maximum": 100 },
                        "response_format": { "type": "string", "enum": ["markdown", "json"], "default": "markdown" }
                    },
                    "required": ["query"]
                }).as_object().expect("Schema object").clone()),
                output_schema: None,
                annotations: None,
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("list_tags"),
                title: None,
                description: Some(Cow::Borrowed(
                    "List all tags with IDs, sorted alphabetically. Use with the tag: search \
                     prefix or tag_note.",
                )),
                input_schema: Arc::new(json!({
                    "type": "object",
                    "properties": {
                        "response_format": { "type": "string", "enum": ["markdown", "json"], "default": "markdown" }
                    },
                    "required": []
                }).as_object().expect("Schema object").clone()),
                output_schema: None,
                annotations: None,
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("tag_note"),
                title: None,
                description: Some(Cow::Borrowed(
                    "Add a tag to a note. The tag is created automatically if it doesn't \
                     exist; adding an existing tag has no effect.",
                )),
                input_schema: Arc::new(json!({
                    "type": "object",
                    "properties": {
                        "note_id": { "type": "string", "description": "The note ID to tag" },
                        "tag": { "type": "string", "description": "Tag name to add (created if it doesn't exist)", "maxLength": 100 }
                    },
                    "required": ["note_id", "tag"]
                }).as_object().expect("Schema object").clone()),
                output_schema: None,
                annotations: None,
                icons: None,
            },
        ];

        Ok(ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult, ConnectorError> {
        let name = request.name.as_ref();
        let args = request.arguments.unwrap_or_default();
        match name {
            "ensure_running" => Ok(text_result(ensure_running(self.launcher.as_ref()).await)),
            "list_notebooks" => {
                let input: ListNotebooksInput = parse_input(args)?;
                let outcome = match self.client() {
                    Ok(client) => list_notebooks(&client, &input).await,
                    Err(err) => Err(err),
                };
                finish(outcome)
            }
            "create_notebook" => {
                let input: CreateNotebookInput = parse_input(args)?;
                let outcome = match self.client() {
                    Ok(client) => create_notebook(&client, &input).await,
                    Err(err) => Err(err),
                };
                finish(outcome)
            }
            "list_notes" => {
                let input: ListNotesInput = parse_input(args)?;
                let outcome = match self.client() {
                    Ok(client) => list_notes(&client, &input).await,
                    Err(err) => Err(err),
                };
                finish(outcome)
            }
            "get_note" => {
                let input: GetNoteInput = parse_input(args)?;
                let outcome = match self.client() {
                    Ok(client) => get_note(&client, &input).await,
                    Err(err) => Err(err),
                };
                finish(outcome)
            }
            "create_note" => {
                let input: CreateNoteInput = parse_input(args)?;
                let outcome = match self.client() {
                    Ok(client) => create_note(&client, &input).await,
                    Err(err) => Err(err),
                };
                finish(outcome)
            }
            "update_note" => {
                let input: UpdateNoteInput = parse_input(args)?;
                let outcome = match self.client() {
                    Ok(client) => update_note(&client, &input).await,
                    Err(err) => Err(err),
                };
                finish(outcome)
            }
            "delete_note" => {
                let input: DeleteNoteInput = parse_input(args)?;
                let outcome = match self.client() {
                    Ok(client) => delete_note(&client, &input).await,
                    Err(err) => Err(err),
                };
                finish(outcome)
            }
            "search_notes" => {
                let input: SearchNotesInput = parse_input(args)?;
                let outcome = match self.client() {
                    Ok(client) => search_notes(&client, &input).await,
                    Err(err) => Err(err),
                };
                finish(outcome)
            }
            "list_tags" => {
                let input: ListTagsInput = parse_input(args)?;
                let outcome = match self.client() {
                    Ok(client) => list_tags(&client, &input).await,
                    Err(err) => Err(err),
                };
                finish(outcome)
            }
            "tag_note" => {
                let input: TagNoteInput = parse_input(args)?;
                let outcome = match self.client() {
                    Ok(client) => tag_note(&client, &input).await,
                    Err(err) => Err(err),
                };
                finish(outcome)
            }
            _ => Err(ConnectorError::ToolNotFound),
        }
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
    ) -> Result<ListPromptsResult, ConnectorError> {
        Ok(ListPromptsResult {
            prompts: vec![],
            next_cursor: None,
        })
    }

    async fn get_prompt(&self, _name: &str) -> Result<Prompt, ConnectorError> {
        Err(ConnectorError::InvalidParams(
            "Prompts not supported".to_string(),
        ))
    }
}
