use rss::Channel;
use std::borrow::Cow;
use thiserror::Error;

/// HTML5 entity names that resolve without a trailing `;` (`&amp Jerry`)
const LEGACY_ENTITIES: [&str; 106] = [
    "AElig", "AMP", "Aacute", "Acirc", "Agrave", "Aring", "Atilde", "Auml", "COPY", "Ccedil",
    "ETH", "Eacute", "Ecirc", "Egrave", "Euml", "GT", "Iacute", "Icirc", "Igrave", "Iuml", "LT",
    "Ntilde", "Oacute", "Ocirc", "Ograve", "Oslash", "Otilde", "Ouml", "QUOT", "REG", "THORN",
    "Uacute", "Ucirc", "Ugrave", "Uuml", "Yacute", "aacute", "acirc", "acute", "aelig", "agrave",
    "amp", "aring", "atilde", "auml", "brvbar", "ccedil", "cedil", "cent", "copy", "curren", "deg",
    "divide", "eacute", "ecirc", "egrave", "eth", "euml", "frac12", "frac14", "frac34", "gt",
    "iacute", "icirc", "iexcl", "igrave", "iquest", "iuml", "laquo", "lt", "macr", "micro",
    "middot", "nbsp", "not", "ntilde", "oacute", "ocirc", "ograve", "ordf", "ordm", "oslash",
    "otilde", "ouml", "para", "plusmn", "pound", "quot", "raquo", "reg", "sect", "shy", "sup1",
    "sup2", "sup3", "szlig", "thorn", "times", "uacute", "ucirc", "ugrave", "uml", "uuml",
    "yacute", "yen", "yuml",
];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Document is not an RSS feed")]
    NotRss,
    #[error("Document has no complete <channel> element")]
    MissingChannel,
    #[error("XML parse error: {0}")]
    Xml(String),
}

impl From<rss::Error> for ParseError {
    fn from(err: rss::Error) -> Self {
        match err {
            rss::Error::InvalidStartTag => ParseError::NotRss,
            rss::Error::Eof => ParseError::MissingChannel,
            other => ParseError::Xml(other.to_string()),
        }
    }
}

/// RSS channel as read off the wire. Lives only between fetch and ingest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<ParsedItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Raw `<pubDate>` text, parsed later by the ingestor
    pub pub_date: String,
}

impl ParsedFeed {
    /// Resolve HTML entities left in titles and descriptions.
    ///
    /// Feeds routinely double-encode (`&amp;amp;`), so after XML decoding the
    /// text still carries `&amp;`, `&#39;`, `&nbsp;` and friends.
    pub fn unescape_html(&mut self) {
        unescape_in_place(&mut self.title);
        unescape_in_place(&mut self.description);
        for item in &mut self.items {
            unescape_in_place(&mut item.title);
            unescape_in_place(&mut item.description);
        }
    }
}

impl From<Channel> for ParsedFeed {
    fn from(channel: Channel) -> Self {
        let items = channel
            .items()
            .iter()
            .map(|item| ParsedItem {
                title: item.title().unwrap_or_default().to_string(),
                link: item.link().unwrap_or_default().to_string(),
                description: item.description().unwrap_or_default().to_string(),
                pub_date: item.pub_date().unwrap_or_default().to_string(),
            })
            .collect();

        ParsedFeed {
            title: channel.title().to_string(),
            link: channel.link().to_string(),
            description: channel.description().to_string(),
            items,
        }
    }
}

/// Parse an RSS 2.0 document into a [`ParsedFeed`].
///
/// Text and CDATA inside one element are joined as-is; only the ends of the
/// whole value are trimmed.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, ParseError> {
    let channel = Channel::read_from(bytes)?;
    Ok(ParsedFeed::from(channel))
}

fn unescape_in_place(text: &mut String) {
    let unescaped = match unescape_html(text) {
        Cow::Owned(unescaped) => unescaped,
        Cow::Borrowed(_) => return,
    };
    *text = unescaped;
}

/// Resolve HTML5 named entities and numeric character references.
///
/// Legacy names such as `&amp` resolve without their `;`, `&#0;` becomes
/// U+FFFD, and anything unknown is kept verbatim.
pub fn unescape_html(input: &str) -> Cow<'_, str> {
    let Some(first) = input.find('&') else {
        return Cow::Borrowed(input);
    };

    let mut out = String::with_capacity(input.len());
    out.push_str(&input[..first]);

    // One reference per segment, so an unterminated `&` never swallows the next one
    let rest = &input[first..];
    let mut starts = rest.match_indices('&').map(|(i, _)| i).peekable();
    while let Some(start) = starts.next() {
        let end = starts.peek().copied().unwrap_or(rest.len());
        push_segment(&rest[start..end], &mut out);
    }

    Cow::Owned(out)
}

/// Decode one `&...` segment that contains no other ampersand.
fn push_segment(segment: &str, out: &mut String) {
    let decoded = html_escape::decode_html_entities(segment);
    if decoded.as_ref() != segment {
        out.extend(decoded.chars().map(|c| if c == '\0' { '\u{FFFD}' } else { c }));
        return;
    }

    let body = &segment[1..];
    let name_len = body
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(body.len());
    let legacy = (2..=name_len)
        .rev()
        .find(|&len| LEGACY_ENTITIES.contains(&&body[..len]));

    match legacy {
        Some(len) => {
            out.push_str(&html_escape::decode_html_entities(&format!("&{};", &body[..len])));
            out.push_str(&body[len..]);
        }
        None => out.push_str(segment),
    }
}
