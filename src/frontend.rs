//! 首页：上传表单与命令行示例。

use axum::extract::Extension;
use axum::response::Html;
use std::sync::Arc;

use crate::config::ServerConfig;

const CREDENTIALS_PLACEHOLDER: &str = "-u 'username[:password]'";

/// 单次 `curl` 上传示例。
pub fn curl_usage(url: &str, auth: Option<&str>) -> String {
    ["curl"]
        .into_iter()
        .chain(auth)
        .chain([
            url,
            "-F 'files=@/path/to/file1'",
            "[-F 'files=@/path/to/file2' ...]",
        ])
        .collect::<Vec<_>>()
        .join(" ")
}

/// 通过 heredoc 批量上传多个文件的示例。
pub fn batch_usage(url: &str, auth: Option<&str>) -> String {
    let command = [r#"sed 's/\(.*\)/-F "files=@\1"/' <<EOF | tr '\n' ' ' | xargs -pr curl"#]
        .into_iter()
        .chain(auth)
        .chain([url])
        .collect::<Vec<_>>()
        .join(" ");
    format!("{command}\n/path/to/file1\n/path/to/file2\n`ls *.txt`\nEOF")
}

/// 返回首页 HTML。
pub async fn landing_page(Extension(config): Extension<Arc<ServerConfig>>) -> Html<String> {
    Html(render_landing_page(&config))
}

pub fn render_landing_page(config: &ServerConfig) -> String {
    let auth = config.use_security().then_some(CREDENTIALS_PLACEHOLDER);
    let url = config.advertised_url.as_str();
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>upload</title></head>
<body>
<form action="/" enctype="multipart/form-data" method="post">
<input name="files" type="file" multiple>
<input type="submit">
</form>
<pre>
{}
</pre>
<pre>
{}
</pre>
</body>
</html>
"#,
        escape_html(&curl_usage(url, auth)),
        escape_html(&batch_usage(url, auth)),
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
