use serde_json::{Map, Value};

/// Optional block properties. Unset fields are left off the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockOptions {
    pub content: String,
    pub uid: Option<String>,
    pub open: Option<bool>,
    pub heading: Option<u8>,
    pub text_align: Option<String>,
    pub children_view_type: Option<String>,
    pub block_view_type: Option<String>,
    pub props: Option<Map<String, Value>>,
}

impl BlockOptions {
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Copies the set properties into `map`. An existing `uid` entry is kept.
    pub fn apply_to_map(&self, map: &mut Map<String, Value>) {
        if let Some(uid) = self.uid.as_deref().filter(|uid| !uid.is_empty()) {
            map.entry("uid").or_insert_with(|| Value::from(uid));
        }
        if let Some(open) = self.open {
            map.insert("open".to_string(), Value::from(open));
        }
        if let Some(heading) = self.heading {
            map.insert("heading".to_string(), Value::from(heading));
        }
        insert_non_empty(map, "text-align", self.text_align.as_deref());
        insert_non_empty(
            map,
            "children-view-type",
            self.children_view_type.as_deref(),
        );
        insert_non_empty(map, "block-view-type", self.block_view_type.as_deref());
        if let Some(props) = &self.props {
            map.insert("props".to_string(), Value::Object(props.clone()));
        }
    }

    /// Block body for a create call: `string` is always present.
    pub fn create_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("string".to_string(), Value::from(self.content.as_str()));
        self.apply_to_map(&mut map);
        map
    }

    /// Block body for an update call: `uid` plus whatever is set.
    pub fn update_map(&self, uid: Value) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("uid".to_string(), uid);
        if !self.content.is_empty() {
            map.insert("string".to_string(), Value::from(self.content.as_str()));
        }
        self.apply_to_map(&mut map);
        map
    }

    /// Reads options back out of a wire block body. `uid` is left for the
    /// caller since it may be a tempid.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            content: string_field(map, "string").unwrap_or_default(),
            uid: None,
            open: map.get("open").and_then(Value::as_bool),
            heading: map
                .get("heading")
                .and_then(Value::as_u64)
                .and_then(|level| u8::try_from(level).ok()),
            text_align: string_field(map, "text-align"),
            children_view_type: string_field(map, "children-view-type"),
            block_view_type: string_field(map, "block-view-type"),
            props: map.get("props").and_then(Value::as_object).cloned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOptions {
    pub title: String,
    pub uid: Option<String>,
    pub children_view_type: Option<String>,
}

impl PageOptions {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn create_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("title".to_string(), Value::from(self.title.as_str()));
        insert_non_empty(&mut map, "uid", self.uid.as_deref());
        insert_non_empty(
            &mut map,
            "children-view-type",
            self.children_view_type.as_deref(),
        );
        map
    }

    pub fn update_map(&self, uid: Value) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("uid".to_string(), uid);
        if !self.title.is_empty() {
            map.insert("title".to_string(), Value::from(self.title.as_str()));
        }
        insert_non_empty(
            &mut map,
            "children-view-type",
            self.children_view_type.as_deref(),
        );
        map
    }

    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            title: string_field(map, "title").unwrap_or_default(),
            uid: None,
            children_view_type: string_field(map, "children-view-type"),
        }
    }
}

/// Parameters for the desktop app's full-text search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub search_blocks: bool,
    pub search_pages: bool,
    pub hide_code_blocks: bool,
    pub limit: Option<usize>,
    /// Pull selector applied to each hit.
    pub pull: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            search_blocks: true,
            search_pages: true,
            hide_code_blocks: false,
            limit: None,
            pull: None,
        }
    }
}

impl SearchOptions {
    pub fn to_map(&self, text: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("search-str".to_string(), Value::from(text));
        map.insert("search-blocks".to_string(), Value::from(self.search_blocks));
        map.insert("search-pages".to_string(), Value::from(self.search_pages));
        map.insert(
            "hide-code-blocks".to_string(),
            Value::from(self.hide_code_blocks),
        );
        if let Some(limit) = self.limit.filter(|limit| *limit > 0) {
            map.insert("limit".to_string(), Value::from(limit));
        }
        insert_non_empty(&mut map, "pull", self.pull.as_deref().map(str::trim));
        map
    }
}

fn insert_non_empty(map: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|value| !value.is_empty()) {
        map.insert(key.to_string(), Value::from(value));
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
