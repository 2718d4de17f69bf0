/// Greedy word wrap by character count. Words longer than the width (or
/// text without spaces at all, e.g. CJK prose) are hard-broken.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for word in line.split_whitespace() {
        let wlen = word.chars().count();
        if wlen > width {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
                count = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for chunk in chars.chunks(width) {
                let piece: String = chunk.iter().collect();
                if chunk.len() == width {
                    out.push(piece);
                } else {
                    count = chunk.len();
                    current = piece;
                }
            }
        } else if count == 0 {
            current = word.to_string();
            count = wlen;
        } else if count + 1 + wlen <= width {
            current.push(' ');
            current.push_str(word);
            count += 1 + wlen;
        } else {
            out.push(std::mem::take(&mut current));
            current = word.to_string();
            count = wlen;
        }
    }

    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Split a chapter body into fixed-size pages. Paragraphs are separated by
/// a blank line; a page holds `page_lines` rendered lines.
pub fn paginate(body: &str, width: usize, page_lines: usize) -> Vec<String> {
    let page_lines = page_lines.max(1);

    let mut lines = Vec::new();
    for paragraph in body.lines() {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.extend(wrap_line(paragraph, width));
    }

    if lines.is_empty() {
        return vec![String::new()];
    }

    lines
        .chunks(page_lines)
        .map(|chunk| chunk.join("\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_respects_width() {
        let line = "the quick brown fox jumps over the lazy dog and keeps on running";
        for wrapped in wrap_line(line, 20) {
            assert!(wrapped.chars().count() <= 20, "too wide: {wrapped:?}");
        }
    }

    #[test]
    fn wrap_keeps_all_words() {
        let line = "one two three four five";
        let joined = wrap_line(line, 9).join(" ");
        assert_eq!(joined, line);
    }

    #[test]
    fn unspaced_text_is_hard_broken() {
        let line = "風は谷を渡り灯りはひとつずつ消えていった";
        let wrapped = wrap_line(line, 8);
        assert!(wrapped.len() >= 2);
        for piece in &wrapped {
            assert!(piece.chars().count() <= 8);
        }
    }

    #[test]
    fn paginate_groups_lines_into_pages() {
        let body = "para one line\n\npara two line\n\npara three line";
        let pages = paginate(body, 40, 3);
        assert_eq!(pages.len(), 2);
        assert!(pages[0].contains("para one"));
        assert!(pages[1].contains("para three"));
    }

    #[test]
    fn empty_body_yields_a_single_blank_page() {
        assert_eq!(paginate("", 40, 10), vec![String::new()]);
    }
}
