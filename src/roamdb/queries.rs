/// Escapes a value for embedding in a quoted Datalog string literal.
pub fn escape_string(raw: &str) -> String {
    raw.replace('"', "\"\"")
}

pub fn page_by_title(title: &str) -> String {
    format!(
        "[:find ?e :where [?e :node/title \"{}\"]]",
        escape_string(title)
    )
}

pub fn block_by_uid(uid: &str) -> String {
    format!("[:find ?e :where [?e :block/uid \"{}\"]]", escape_string(uid))
}

pub fn page_uid_by_title(title: &str) -> String {
    format!(
        "[:find ?uid :where [?p :node/title \"{}\"] [?p :block/uid ?uid]]",
        escape_string(title)
    )
}

pub fn search_blocks_contains(text: &str) -> String {
    format!(
        concat!(
            "[:find ?uid ?string ?page-title\n",
            " :where\n",
            " [?b :block/uid ?uid]\n",
            " [?b :block/string ?string]\n",
            " [(clojure.string/includes? ?string \"{}\")]\n",
            " [?b :block/page ?page]\n",
            " [?page :node/title ?page-title]]"
        ),
        escape_string(text)
    )
}

/// Lists page titles and uids. With a cutoff, only pages edited after it
/// (epoch millis) are returned, along with their edit time.
pub fn list_pages(edited_after_millis: Option<i64>) -> String {
    match edited_after_millis {
        Some(cutoff) => format!(
            concat!(
                "[:find ?title ?uid ?edit-time\n",
                " :where\n",
                " [?p :node/title ?title]\n",
                " [?p :block/uid ?uid]\n",
                " [?p :edit/time ?edit-time]\n",
                " [(> ?edit-time {})]]"
            ),
            cutoff
        ),
        None => concat!(
            "[:find ?title ?uid\n",
            " :where\n",
            " [?p :node/title ?title]\n",
            " [?p :block/uid ?uid]]"
        )
        .to_string(),
    }
}

/// Children of `parent_uid` whose text is exactly `content`.
pub fn child_uid_by_content(parent_uid: &str, content: &str) -> String {
    format!(
        concat!(
            "[:find ?uid :where [?p :block/uid \"{}\"] [?p :block/children ?b] ",
            "[?b :block/string \"{}\"] [?b :block/uid ?uid]]"
        ),
        escape_string(parent_uid),
        escape_string(content)
    )
}

pub fn block_with_content(uid: &str, content: &str) -> String {
    format!(
        "[:find ?b :where [?b :block/uid \"{}\"] [?b :block/string \"{}\"]]",
        escape_string(uid),
        escape_string(content)
    )
}

pub fn block_under_parent(uid: &str, parent_uid: &str) -> String {
    format!(
        concat!(
            "[:find ?b :where [?parent :block/uid \"{}\"] ",
            "[?parent :block/children ?b] [?b :block/uid \"{}\"]]"
        ),
        escape_string(parent_uid),
        escape_string(uid)
    )
}
