//! Summary views regenerated alongside directory builds: a JSON dump of
//! the metadata tree and a minimal browsable HTML page.

use std::fs;
use std::path::Path;

use crate::build::BuildError;
use crate::metadata::MetadataDoc;

const JSON_FILE: &str = "metadata.json";
const HTML_FILE: &str = "index.html";

/// Write `metadata.json` and `index.html` into the package root.
pub fn write_summary(root: &Path, doc: &MetadataDoc) -> Result<(), BuildError> {
    let json = serde_json::to_string_pretty(&doc.to_json())
        .map_err(|e| BuildError::Summary(e.to_string()))?;
    let json_path = root.join(JSON_FILE);
    fs::write(&json_path, json).map_err(|e| BuildError::Io(json_path, e))?;

    let html_path = root.join(HTML_FILE);
    fs::write(&html_path, render_html(doc)).map_err(|e| BuildError::Io(html_path, e))
}

/// Render the package as a single self-contained HTML page.
pub fn render_html(doc: &MetadataDoc) -> String {
    let title = doc
        .find_first_value("Name")
        .unwrap_or("unnamed package")
        .to_string();

    let mut body = String::new();
    for section in doc.sections() {
        body.push_str(&format!("  <h2>{}</h2>\n  <table>\n", escape(&section.name)));
        for term in &section.terms {
            let props: Vec<String> = term
                .props
                .iter()
                .map(|(k, v)| format!("{}={}", escape(k), escape(v)))
                .collect();
            body.push_str(&format!(
                "    <tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape(&term.term),
                escape(&term.value),
                props.join(" "),
            ));
        }
        body.push_str("  </table>\n");
    }

    format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body>\n  <h1>{title}</h1>\n{body}</body>\n</html>\n",
        title = escape(&title),
        body = body,
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{SECTION_RESOURCES, TERM_DATAFILE};

    #[test]
    fn test_html_lists_sections_and_escapes() {
        let mut doc = MetadataDoc::new("example.com-names-1");
        doc.new_term(SECTION_RESOURCES, TERM_DATAFILE, "data/a<b.csv");
        let html = render_html(&doc);
        assert!(html.contains("<h1>example.com-names-1</h1>"));
        assert!(html.contains("<h2>Resources</h2>"));
        assert!(html.contains("data/a&lt;b.csv"));
    }

    #[test]
    fn test_summary_files_written() {
        let dir = tempfile::tempdir().unwrap();
        let doc = MetadataDoc::new("pkg-1");
        write_summary(dir.path(), &doc).unwrap();
        assert!(dir.path().join("metadata.json").exists());
        assert!(dir.path().join("index.html").exists());
    }
}
