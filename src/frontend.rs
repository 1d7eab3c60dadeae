//! Embedded listing page.

use html_escape::{encode_double_quoted_attribute, encode_text};
use rust_embed::RustEmbed;

use crate::storage::FileEntry;

const INDEX_TEMPLATE: &str = "index.html";
const FILES_PLACEHOLDER: &str = "{{files}}";

#[derive(RustEmbed)]
#[folder = "templates"]
pub struct Templates;

/// Renders the listing page for `entries`, keeping their order.
pub fn render_index(entries: &[FileEntry]) -> Option<String> {
    let template = Templates::get(INDEX_TEMPLATE)?;
    let template = String::from_utf8_lossy(&template.data);

    let rows = if entries.is_empty() {
        "      <tr><td colspan=\"4\">No files uploaded yet.</td></tr>".to_string()
    } else {
        entries.iter().map(render_row).collect::<Vec<_>>().join("\n")
    };

    Some(template.replace(FILES_PLACEHOLDER, &rows))
}

fn render_row(entry: &FileEntry) -> String {
    let name = encode_text(&entry.name);
    let modified = entry.modified.as_deref().unwrap_or("");
    if entry.is_dir {
        return format!(
            "      <tr class=\"dir\"><td>{name}/</td><td></td><td>{modified}</td><td></td></tr>"
        );
    }

    let encoded = urlencoding::encode(&entry.name);
    let attribute = encode_double_quoted_attribute(&entry.name);
    format!(
        "      <tr><td><a href=\"/download/{encoded}\">{name}</a></td><td>{size}</td>\
         <td>{modified}</td><td><button data-delete=\"/delete/{encoded}\" \
         data-name=\"{attribute}\">Delete</button></td></tr>",
        size = entry.size,
    )
}
