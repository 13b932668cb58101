//! Reading-list parsing from discovery output
//!
//! The discovery pass ends with a prose report that lists sources to
//! deep-read, tagged with `[REQUIRED]` / `[OPTIONAL]` markers. This
//! module recovers a structured [`ReadingList`] from that free text.
//!
//! Parsing is line-based and deliberately forgiving: models wrap sources
//! in bullets, numbering, and markdown links in inconsistent ways.

/// Cap on required sources passed forward to the synthesis pass
pub const MAX_REQUIRED_SOURCES: usize = 8;

/// One source extracted from discovery output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub url: String,
    pub title: String,
}

/// Sources to deep-read, split into required and optional
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingList {
    pub required: Vec<SourceRef>,
    pub optional: Vec<SourceRef>,
}

impl ReadingList {
    /// Parse discovery output into a reading list.
    ///
    /// Every line containing an `http(s)://` URL is a source. A line
    /// tagged `[OPTIONAL]` goes to the optional list; `[REQUIRED]` or an
    /// untagged line goes to the required list, capped at
    /// [`MAX_REQUIRED_SOURCES`] with overflow spilling into optional.
    pub fn parse(text: &str) -> Self {
        let mut list = ReadingList::default();

        for line in text.lines() {
            let Some(url) = extract_url(line) else {
                continue;
            };

            let optional = line.to_uppercase().contains("[OPTIONAL]");
            let source = SourceRef {
                title: extract_title(line, &url),
                url,
            };

            if optional {
                list.optional.push(source);
            } else if list.required.len() < MAX_REQUIRED_SOURCES {
                list.required.push(source);
            } else {
                list.optional.push(source);
            }
        }

        list
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.optional.is_empty()
    }

    /// Render the reading-assignment block passed to the synthesis pass
    pub fn assignment_block(&self) -> String {
        let mut block = String::from("## Reading assignment\n\nRead these sources in depth:\n");
        for (i, source) in self.required.iter().enumerate() {
            if source.title.is_empty() {
                block.push_str(&format!("{}. {}\n", i + 1, source.url));
            } else {
                block.push_str(&format!("{}. {} — {}\n", i + 1, source.title, source.url));
            }
        }
        if !self.optional.is_empty() {
            block.push_str("\nConsult if time permits:\n");
            for source in &self.optional {
                if source.title.is_empty() {
                    block.push_str(&format!("- {}\n", source.url));
                } else {
                    block.push_str(&format!("- {} — {}\n", source.title, source.url));
                }
            }
        }
        block
    }
}

/// Extract the first http(s) URL from a line, trimming trailing punctuation
fn extract_url(line: &str) -> Option<String> {
    let start = line.find("https://").or_else(|| line.find("http://"))?;
    let rest = &line[start..];
    let end = rest
        .find(|c: char| c.is_whitespace())
        .unwrap_or(rest.len());
    let url = rest[..end].trim_end_matches(['.', ',', ';', ':', '!', '?', ')', ']', '"', '\'', '>']);
    if url.len() <= "https://".len() {
        return None;
    }
    Some(url.to_string())
}

/// Best-effort title: the line with markers, bullets, and the URL removed
fn extract_title(line: &str, url: &str) -> String {
    let mut title = line.replace(url, "");

    for marker in ["[REQUIRED]", "[required]", "[OPTIONAL]", "[optional]"] {
        title = title.replace(marker, "");
    }

    // Strip leading bullets and numbering like "- ", "* ", "3." or "3)"
    let trimmed = title.trim_start();
    let trimmed = trimmed.strip_prefix(['-', '*', '+']).unwrap_or(trimmed);
    let trimmed = trimmed.trim_start();
    let without_number = trimmed
        .split_once(['.', ')'])
        .filter(|(num, _)| !num.is_empty() && num.chars().all(|c| c.is_ascii_digit()))
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);

    without_number
        .trim_matches(|c: char| c.is_whitespace() || "[]()<>—–-:,.".contains(c))
        .to_string()
}
