//! レポート用 Markdown サブセットの HTML 変換
//!
//! 対応する記法はモデルの出力テンプレートが使うものだけ:
//! `###` / `####` 見出し、`**太字**`、`*` / `-` 箇条書き、`---` 区切り線、段落。
//! それ以外（表、リンク、コードフェンス）は段落の中にそのまま残る。
//!
//! 入力末尾まで続いたリストは閉じタグを出力しない（既存出力との互換のため）。

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref H3_RE: Regex = Regex::new(r"(?mR)^### (.*)$").unwrap();
    static ref H4_RE: Regex = Regex::new(r"(?mR)^#### (.*)$").unwrap();
    static ref BOLD_RE: Regex = Regex::new(r"(?R)\*\*(.*?)\*\*").unwrap();
}

/// Markdown サブセットを HTML 断片に変換
///
/// 任意の文字列に対して失敗しない。
pub fn render_markdown(markdown: &str) -> String {
    let html = H3_RE.replace_all(markdown, "<h3>${1}</h3>");
    let html = H4_RE.replace_all(&html, "<h4>${1}</h4>");
    let html = BOLD_RE.replace_all(&html, "<strong>${1}</strong>");

    let (output, _) = html.split('\n').fold(
        (String::with_capacity(html.len() + 64), false),
        |(mut output, in_list), line| {
            let (fragment, in_list) = render_line(line, in_list);
            output.push_str(&fragment);
            (output, in_list)
        },
    );
    output
}

/// 1行分を変換し、リスト内フラグの次の値を返す
fn render_line(line: &str, in_list: bool) -> (String, bool) {
    let trimmed = line.trim();

    if let Some(content) = list_item_content(trimmed) {
        let item = format!("<li>{}</li>", content);
        if in_list {
            return (item, true);
        }
        return (format!("<ul>{}", item), true);
    }

    let close = if in_list { "</ul>" } else { "" };
    let body = if trimmed == "---" {
        "<hr />".to_string()
    } else if !trimmed.is_empty() && !is_rendered_block(trimmed) {
        format!("<p>{}</p>", trimmed)
    } else {
        line.to_string()
    };

    (format!("{}{}", close, body), false)
}

fn list_item_content(trimmed: &str) -> Option<&str> {
    trimmed
        .strip_prefix("* ")
        .or_else(|| trimmed.strip_prefix("- "))
}

/// 見出し・リスト変換済みの行か
fn is_rendered_block(trimmed: &str) -> bool {
    trimmed.starts_with("<h") || trimmed.starts_with("<u") || trimmed.starts_with("<l")
}

/// HTML 断片を単体で開ける文書に包む
pub fn render_document(title: &str, fragment: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"zh-CN\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n<article class=\"report\">{}</article>\n</body>\n</html>\n",
        escape_text(title),
        fragment
    )
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
