use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A pulled page. Accepts both `node/title` and `:node/title` style keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(rename = "node/title", alias = ":node/title", default)]
    pub title: String,
    #[serde(rename = "block/uid", alias = ":block/uid", default)]
    pub uid: String,
    #[serde(
        rename = "edit/time",
        alias = ":edit/time",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub edit_time: Option<i64>,
    #[serde(
        rename = "block/children",
        alias = ":block/children",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "block/string", alias = ":block/string", default)]
    pub string: String,
    #[serde(rename = "block/uid", alias = ":block/uid", default)]
    pub uid: String,
    #[serde(rename = "block/order", alias = ":block/order", default)]
    pub order: i64,
    #[serde(
        rename = "block/heading",
        alias = ":block/heading",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub heading: Option<u8>,
    #[serde(
        rename = "block/children",
        alias = ":block/children",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<Block>,
}

/// Sorts sibling blocks by `block/order`, recursively.
pub fn normalize_blocks(blocks: &mut [Block]) {
    blocks.sort_by_key(|block| block.order);
    for block in blocks.iter_mut() {
        normalize_blocks(&mut block.children);
    }
}

pub fn parse_page(raw: &Value) -> Result<Page, serde_json::Error> {
    let mut page = Page::deserialize(raw)?;
    normalize_blocks(&mut page.children);
    Ok(page)
}

pub fn parse_block(raw: &Value) -> Result<Block, serde_json::Error> {
    let mut block = Block::deserialize(raw)?;
    normalize_blocks(&mut block.children);
    Ok(block)
}

/// Parses an entity id typed on the command line: a numeric eid or a lookup
/// ref such as `[:block/uid "abc"]`.
pub fn parse_entity_id(input: &str) -> Result<Value, String> {
    let input = input.trim();
    if let Ok(id) = input.parse::<i64>() {
        return Ok(Value::from(id));
    }

    let Some(inner) = input
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    else {
        return Err(
            "entity ID must be a number or lookup ref like [:block/uid \"abc\"]".to_string(),
        );
    };

    let Some((keyword, value)) = inner.trim().split_once(' ') else {
        return Err("invalid lookup ref format: expected [:keyword \"value\"]".to_string());
    };
    let keyword = keyword.trim();
    if !keyword.starts_with(':') {
        return Err("lookup ref keyword must start with :".to_string());
    }
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(value);
    Ok(Value::Array(vec![Value::from(keyword), Value::from(value)]))
}
