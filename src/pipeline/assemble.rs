//! Document assembly: page fragments → one self-contained HTML document.

use std::fmt::Write as _;

const STYLESHEET: &str = r#"        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif;
            line-height: 1.6;
            max-width: 800px;
            margin: 20px auto;
            padding: 0 20px;
            background-color: #f8f9fa;
            color: #212529;
        }
        p {
            text-align: justify;
            margin: 0 0 1em 0;
        }
        h1, h2 {
            color: #343a40;
        }
        hr {
            border: 0;
            height: 1px;
            background: #dee2e6;
            margin: 2em 0;
        }
        figure {
            text-align: center;
            margin: 20px 0;
        }
        figure img {
            max-width: 90%;
            height: auto;
            border-radius: 8px;
            box-shadow: 0 4px 8px rgba(0, 0, 0, 0.1);
        }
        .page-footer p {
            text-align: center;
            color: #888;
        }
        .error {
            color: red;
        }
"#;

/// Title shown in `<title>` and the top-level heading.
pub fn document_title(doc_name: &str) -> String {
    format!("Translation of {doc_name}")
}

/// Wrap `fragments` (already in page order) in the HTML template.
///
/// `target_lang` becomes the document language; `doc_name` is the input
/// file's name.
pub fn assemble_document<S: AsRef<str>>(fragments: &[S], target_lang: &str, doc_name: &str) -> String {
    let title = html_escape::encode_text(&document_title(doc_name)).into_owned();
    let body_len: usize = fragments.iter().map(|f| f.as_ref().len() + 1).sum();

    let mut html = String::with_capacity(STYLESHEET.len() + body_len + 512);
    html.push_str("<!DOCTYPE html>\n");
    let _ = writeln!(
        html,
        r#"<html lang="{}">"#,
        html_escape::encode_double_quoted_attribute(target_lang)
    );
    html.push_str("<head>\n");
    html.push_str("    <meta charset=\"UTF-8\">\n");
    html.push_str("    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    let _ = writeln!(html, "    <title>{title}</title>");
    html.push_str("    <style>\n");
    html.push_str(STYLESHEET);
    html.push_str("    </style>\n");
    html.push_str("</head>\n<body>\n");
    let _ = writeln!(html, "    <h1>{title}</h1>");
    for fragment in fragments {
        html.push_str(fragment.as_ref());
        html.push('\n');
    }
    html.push_str("</body>\n</html>\n");
    html
}
