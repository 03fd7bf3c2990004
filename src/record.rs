use crate::document::ConfigFile;
use crate::errors::ParseZoneErr;
use crate::utils::{escape_value, is_alnum, is_digits, pad_field, unescape_value};
use regex::Regex;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref SOA_START_CHECKER: Regex = Regex::new(r"\sIN\s+SOA\s").unwrap();
}

/// Record types the dns entry parser understands. Anything else
/// (SRV, DNSKEY, ...) stays an unknown line and round-trips verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
pub enum RecordType {
    NS,
    A,
    AAAA,
    TXT,
    CNAME,
    MX,
}

/// Tag of a parsed item, used for positional checks (the SOA chain),
/// kind-filtered document scans and the debug dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ItemKind {
    Unknown,
    Empty,
    Origin,
    Ttl,
    SoaStart,
    SoaSerial,
    SoaRefresh,
    SoaRetry,
    SoaExpiry,
    SoaCaching,
    SoaEnd,
    Dns,
}

/// One resource record line. `host` is never empty: when the raw line
/// used the omitted-host shorthand the inherited host is stored here
/// and `host_omitted` keeps the column blank on output. The per-line
/// ttl and the `IN` marker have no meaning of their own, they are only
/// echoed back the way they were read.
#[derive(Debug, Clone, PartialEq)]
pub struct DnsEntry {
    pub host: String,
    pub host_omitted: bool,
    pub ttl: Option<u32>,
    pub with_in: bool,
    pub r_type: RecordType,
    pub priority: Option<u32>,
    pub value: String,
}

impl DnsEntry {
    pub fn new(
        host: &str,
        r_type: RecordType,
        value: &str,
        priority: Option<u32>,
        ttl: Option<u32>,
    ) -> DnsEntry {
        DnsEntry {
            host: host.to_owned(),
            host_omitted: false,
            ttl,
            with_in: false,
            r_type,
            priority,
            value: canonical_value(r_type, value),
        }
    }

    pub fn set_value(&mut self, value: &str) {
        self.value = canonical_value(self.r_type, value);
    }
}

// TXT values set through the api get one canonical pair of quotes;
// values parsed from file keep whatever quoting they came with.
fn canonical_value(r_type: RecordType, value: &str) -> String {
    if r_type == RecordType::TXT && !value.starts_with('"') {
        format!("\"{}\"", value)
    } else {
        value.to_owned()
    }
}

impl fmt::Display for DnsEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host_field = if self.host_omitted { "" } else { self.host.as_str() };
        let mut out = pad_field(host_field, 12);
        if let Some(ttl) = self.ttl {
            out.push_str(&pad_field(&ttl.to_string(), 4));
        }
        if self.with_in {
            out.push_str(&pad_field("IN", 4));
        }
        let type_field = match self.priority {
            Some(priority) => format!("{} {}", self.r_type, priority),
            None => self.r_type.to_string(),
        };
        out.push_str(&pad_field(&type_field, 6));
        out.push_str(&escape_value(&self.value));
        write!(f, "{}", out.trim_end())
    }
}

/// Everything one line of a zone file can hold. The SOA block members
/// carry no marker of their own and are recognised purely by position
/// behind the previous chain item.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedItem {
    Unknown(String),
    Empty,
    Origin { value: String },
    Ttl { value: String },
    SoaStart { domain: String, ns: String, email: String },
    SoaSerial { number: String },
    SoaRefresh { value: String },
    SoaRetry { value: String },
    SoaExpiry { value: String },
    SoaCaching { value: String, closes_block: bool },
    SoaEnd,
    Dns(DnsEntry),
}

impl ParsedItem {
    /// Classify the comment-stripped content of one line against the
    /// document parsed so far. Recognisers run in a fixed order and the
    /// first match wins; a line nothing claims becomes `Unknown`.
    pub fn classify(content: &str, file: &ConfigFile) -> Result<ParsedItem, ParseZoneErr> {
        if is_dns_entry(content) {
            return Ok(ParsedItem::Dns(parse_dns_entry(content, file)?));
        }
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(ParsedItem::Empty);
        }
        if let Some(value) = directive_value(content, "$TTL") {
            return Ok(ParsedItem::Ttl { value });
        }
        if let Some(value) = directive_value(content, "$ORIGIN") {
            return Ok(ParsedItem::Origin { value });
        }
        if SOA_START_CHECKER.is_match(content) && content.contains('(') {
            return Ok(parse_soa_start(content));
        }
        if file.is_last_item_of_kind(ItemKind::SoaStart) && is_alnum(trimmed) {
            return Ok(ParsedItem::SoaSerial {
                number: trimmed.to_owned(),
            });
        }
        if file.is_last_item_of_kind(ItemKind::SoaSerial) && is_alnum(trimmed) {
            return Ok(ParsedItem::SoaRefresh {
                value: trimmed.to_owned(),
            });
        }
        if file.is_last_item_of_kind(ItemKind::SoaRefresh) && is_alnum(trimmed) {
            return Ok(ParsedItem::SoaRetry {
                value: trimmed.to_owned(),
            });
        }
        if file.is_last_item_of_kind(ItemKind::SoaRetry) && is_alnum(trimmed) {
            return Ok(ParsedItem::SoaExpiry {
                value: trimmed.to_owned(),
            });
        }
        if file.is_last_item_of_kind(ItemKind::SoaExpiry) {
            if let Some(item) = parse_soa_caching(trimmed) {
                return Ok(item);
            }
        }
        if trimmed == ")" && soa_block_open(file) {
            return Ok(ParsedItem::SoaEnd);
        }
        Ok(ParsedItem::Unknown(content.to_owned()))
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            ParsedItem::Unknown(_) => ItemKind::Unknown,
            ParsedItem::Empty => ItemKind::Empty,
            ParsedItem::Origin { .. } => ItemKind::Origin,
            ParsedItem::Ttl { .. } => ItemKind::Ttl,
            ParsedItem::SoaStart { .. } => ItemKind::SoaStart,
            ParsedItem::SoaSerial { .. } => ItemKind::SoaSerial,
            ParsedItem::SoaRefresh { .. } => ItemKind::SoaRefresh,
            ParsedItem::SoaRetry { .. } => ItemKind::SoaRetry,
            ParsedItem::SoaExpiry { .. } => ItemKind::SoaExpiry,
            ParsedItem::SoaCaching { .. } => ItemKind::SoaCaching,
            ParsedItem::SoaEnd => ItemKind::SoaEnd,
            ParsedItem::Dns(_) => ItemKind::Dns,
        }
    }
}

impl fmt::Display for ParsedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedItem::Unknown(content) => write!(f, "{}", content),
            ParsedItem::Empty => Ok(()),
            ParsedItem::Origin { value } => write!(f, "$ORIGIN {}", value),
            ParsedItem::Ttl { value } => write!(f, "$TTL {}", value),
            ParsedItem::SoaStart { domain, ns, email } => {
                write!(f, "{}   IN    SOA   {} {} (", domain, ns, email)
            }
            ParsedItem::SoaSerial { number } => write!(f, "{:10}{}", "", number),
            ParsedItem::SoaRefresh { value }
            | ParsedItem::SoaRetry { value }
            | ParsedItem::SoaExpiry { value } => write!(f, "{:10}{}", "", value),
            ParsedItem::SoaCaching {
                value,
                closes_block: false,
            } => write!(f, "{:10}{}", "", value),
            ParsedItem::SoaCaching {
                value,
                closes_block: true,
            } => write!(f, "{:10}{} )", "", value),
            ParsedItem::SoaEnd => write!(f, "{:10})", ""),
            ParsedItem::Dns(entry) => write!(f, "{}", entry),
        }
    }
}

fn directive_value(content: &str, keyword: &str) -> Option<String> {
    if content.len() > keyword.len()
        && content.starts_with(keyword)
        && content[keyword.len()..].starts_with(char::is_whitespace)
    {
        Some(content[keyword.len()..].trim_start().to_owned())
    } else {
        None
    }
}

// domain IN SOA ns email ( -- token positions are fixed, 1 and 2 were
// already checked by the recogniser regex.
fn parse_soa_start(content: &str) -> ParsedItem {
    let tokens: Vec<&str> = content.split_whitespace().collect();
    ParsedItem::SoaStart {
        domain: tokens.get(0).unwrap_or(&"").to_string(),
        ns: tokens.get(3).unwrap_or(&"").to_string(),
        email: tokens.get(4).unwrap_or(&"").to_string(),
    }
}

// The caching value may close the SOA parenthesis on its own line.
fn parse_soa_caching(trimmed: &str) -> Option<ParsedItem> {
    let (core, closes_block) = match trimmed.strip_suffix(')') {
        Some(rest) => (rest.trim_end(), true),
        None => (trimmed, false),
    };
    if is_alnum(core) {
        Some(ParsedItem::SoaCaching {
            value: core.to_owned(),
            closes_block,
        })
    } else {
        None
    }
}

fn soa_block_open(file: &ConfigFile) -> bool {
    matches!(
        file.last_item(),
        Some(ParsedItem::SoaCaching {
            closes_block: false,
            ..
        })
    )
}

// Whitespace-splitting that remembers where each token starts, so the
// value can be taken as a slice of the original content and keep its
// inner spacing (quoted TXT segments).
fn tokenize(content: &str) -> Vec<(usize, &str)> {
    let mut tokens = vec![];
    let mut start = None;
    for (index, ch) in content.char_indices() {
        if ch.is_whitespace() {
            if let Some(from) = start.take() {
                tokens.push((from, &content[from..index]));
            }
        } else if start.is_none() {
            start = Some(index);
        }
    }
    if let Some(from) = start {
        tokens.push((from, &content[from..]));
    }
    tokens
}

fn record_type_at(tokens: &[(usize, &str)], position: usize) -> Option<RecordType> {
    tokens
        .get(position)
        .and_then(|(_, token)| RecordType::from_str(token).ok())
}

// A line is a dns entry when a known record type stands where the
// grammar allows one: within the first four tokens (host, ttl and the
// IN marker may precede it).
fn is_dns_entry(content: &str) -> bool {
    tokenize(content)
        .iter()
        .take(4)
        .any(|(_, token)| RecordType::from_str(token).is_ok())
}

fn parse_dns_entry(content: &str, file: &ConfigFile) -> Result<DnsEntry, ParseZoneErr> {
    let tokens = tokenize(content);
    let mut position = 0;
    let mut ttl = None;
    let mut with_in = false;
    let (host, host_omitted) = if record_type_at(&tokens, 0).is_some() {
        (inherited_host(file, content)?, true)
    } else if is_digits(tokens[0].1) && record_type_at(&tokens, 1).is_some() {
        ttl = tokens[0].1.parse::<u32>().ok();
        position = 1;
        (inherited_host(file, content)?, true)
    } else {
        let host = tokens[0].1.to_owned();
        position = 1;
        if tokens.len() > position && is_digits(tokens[position].1) {
            ttl = tokens[position].1.parse::<u32>().ok();
            position += 1;
        }
        if tokens.len() > position && tokens[position].1 == "IN" {
            with_in = true;
            position += 1;
        }
        (host, false)
    };
    let r_type = match record_type_at(&tokens, position) {
        Some(r_type) => r_type,
        None => return Err(ParseZoneErr::ValidTypeErr(content.to_owned())),
    };
    position += 1;
    let mut priority = None;
    if r_type == RecordType::MX && tokens.len() > position && is_digits(tokens[position].1) {
        priority = tokens[position].1.parse::<u32>().ok();
        position += 1;
    }
    let value = match tokens.get(position) {
        Some((from, _)) => unescape_value(content[*from..].trim_end()),
        None => String::new(),
    };
    Ok(DnsEntry {
        host,
        host_omitted,
        ttl,
        with_in,
        r_type,
        priority,
        value,
    })
}

// Omitted hosts inherit from the nearest prior dns entry, or from the
// SOA domain when the shorthand is used right after the SOA block.
fn inherited_host(file: &ConfigFile, content: &str) -> Result<String, ParseZoneErr> {
    for line in file.lines.iter().rev() {
        match &line.item {
            ParsedItem::Dns(entry) => return Ok(entry.host.clone()),
            ParsedItem::SoaStart { domain, .. } => return Ok(domain.clone()),
            _ => {}
        }
    }
    Err(ParseZoneErr::NoPriorHostErr(content.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ConfigFile, ConfigLine};

    fn empty_file() -> ConfigFile {
        ConfigFile::new()
    }

    #[test]
    fn test_classify_directives() {
        let file = empty_file();
        assert_eq!(
            ParsedItem::classify("$TTL 1h", &file).unwrap(),
            ParsedItem::Ttl {
                value: "1h".to_owned()
            }
        );
        assert_eq!(
            ParsedItem::classify("$ORIGIN example.com.", &file).unwrap(),
            ParsedItem::Origin {
                value: "example.com.".to_owned()
            }
        );
        assert_eq!(
            ParsedItem::classify("$SOMETHING 2h", &file).unwrap(),
            ParsedItem::Unknown("$SOMETHING 2h".to_owned())
        );
        assert_eq!(ParsedItem::classify("", &file).unwrap(), ParsedItem::Empty);
        assert_eq!(
            ParsedItem::classify("   ", &file).unwrap(),
            ParsedItem::Empty
        );
    }

    #[test]
    fn test_classify_soa_chain() {
        let mut file = empty_file();
        let input = [
            "example.com.  IN  SOA  ns.example.com. username.example.com. (",
            "              2007120710",
            "              1d",
            "              2h",
            "              4w",
            "              1h",
            "              )",
        ];
        let mut kinds = vec![];
        for content in input.iter() {
            let item = ParsedItem::classify(content, &file).unwrap();
            kinds.push(item.kind());
            file.add_line(ConfigLine::new(item, None, None));
        }
        assert_eq!(
            kinds,
            vec![
                ItemKind::SoaStart,
                ItemKind::SoaSerial,
                ItemKind::SoaRefresh,
                ItemKind::SoaRetry,
                ItemKind::SoaExpiry,
                ItemKind::SoaCaching,
                ItemKind::SoaEnd,
            ]
        );
        assert_eq!(
            file.lines[0].item,
            ParsedItem::SoaStart {
                domain: "example.com.".to_owned(),
                ns: "ns.example.com.".to_owned(),
                email: "username.example.com.".to_owned(),
            }
        );
    }

    #[test]
    fn test_soa_chain_needs_predecessor() {
        // serial-looking line with nothing before it stays unknown
        let file = empty_file();
        assert_eq!(
            ParsedItem::classify("              2007120710", &file).unwrap(),
            ParsedItem::Unknown("              2007120710".to_owned())
        );
    }

    #[test]
    fn test_soa_caching_closing_same_line() {
        let mut file = empty_file();
        for content in [
            "example.com.  IN  SOA  ns.example.com. username.example.com. (",
            " 2020081601",
            " 3600",
            " 7200",
            " 1209600",
        ]
        .iter()
        {
            let item = ParsedItem::classify(content, &file).unwrap();
            file.add_line(ConfigLine::new(item, None, None));
        }
        let caching = ParsedItem::classify(" 86400 )", &file).unwrap();
        assert_eq!(
            caching,
            ParsedItem::SoaCaching {
                value: "86400".to_owned(),
                closes_block: true,
            }
        );
        file.add_line(ConfigLine::new(caching, None, None));
        // the parenthesis is already closed, a lone `)` is not SoaEnd
        assert_eq!(
            ParsedItem::classify(")", &file).unwrap(),
            ParsedItem::Unknown(")".to_owned())
        );
    }

    #[test]
    fn test_parse_dns_entry_shapes() {
        let file = empty_file();
        let entry = match ParsedItem::classify("yandex.ru.   89 IN  A   213.180.204.11", &file) {
            Ok(ParsedItem::Dns(entry)) => entry,
            other => panic!("expected dns entry, got {:?}", other),
        };
        assert_eq!(entry.host, "yandex.ru.");
        assert_eq!(entry.host_omitted, false);
        assert_eq!(entry.ttl, Some(89));
        assert_eq!(entry.with_in, true);
        assert_eq!(entry.r_type, RecordType::A);
        assert_eq!(entry.value, "213.180.204.11");

        let entry = match ParsedItem::classify("mail1   MX 10   mail1.example.com.", &file) {
            Ok(ParsedItem::Dns(entry)) => entry,
            other => panic!("expected dns entry, got {:?}", other),
        };
        assert_eq!(entry.priority, Some(10));
        assert_eq!(entry.value, "mail1.example.com.");

        let entry = match ParsedItem::classify("mail3 IN  MX    mail3.example.com.", &file) {
            Ok(ParsedItem::Dns(entry)) => entry,
            other => panic!("expected dns entry, got {:?}", other),
        };
        assert_eq!(entry.priority, None);
        assert_eq!(entry.with_in, true);
    }

    #[test]
    fn test_omitted_host_inheritance() {
        let mut file = empty_file();
        let item = ParsedItem::classify("main        A       main.a.com.", &file).unwrap();
        file.add_line(ConfigLine::new(item, None, None));
        let entry = match ParsedItem::classify("            AAAA    0::::::0", &file) {
            Ok(ParsedItem::Dns(entry)) => entry,
            other => panic!("expected dns entry, got {:?}", other),
        };
        assert_eq!(entry.host, "main");
        assert_eq!(entry.host_omitted, true);
    }

    #[test]
    fn test_omitted_host_without_donor_fails() {
        let file = empty_file();
        assert_eq!(
            ParsedItem::classify("  NS ns1.com.", &file),
            Err(ParseZoneErr::NoPriorHostErr("  NS ns1.com.".to_owned()))
        );
    }

    #[test]
    fn test_second_token_must_be_record_type() {
        let file = empty_file();
        assert_eq!(
            ParsedItem::classify("host bad A value", &file),
            Err(ParseZoneErr::ValidTypeErr("host bad A value".to_owned()))
        );
    }

    #[test]
    fn test_txt_value_keeps_inner_spacing() {
        let file = empty_file();
        let content = r#"home  IN TXT    "some" "long" "   txt   " "value""#;
        let entry = match ParsedItem::classify(content, &file) {
            Ok(ParsedItem::Dns(entry)) => entry,
            other => panic!("expected dns entry, got {:?}", other),
        };
        assert_eq!(entry.value, r#""some" "long" "   txt   " "value""#);
    }

    #[test]
    fn test_txt_escaped_semicolon_roundtrip() {
        let file = empty_file();
        let content = r#"@ TXT "some\;arbitrary" " tex\;t""#;
        let entry = match ParsedItem::classify(content, &file) {
            Ok(ParsedItem::Dns(entry)) => entry,
            other => panic!("expected dns entry, got {:?}", other),
        };
        assert_eq!(entry.value, r#""some;arbitrary" " tex;t""#);
        let rendered = entry.to_string();
        assert!(rendered.contains(r#""some\;arbitrary" " tex\;t""#));
    }

    #[test]
    fn test_constructed_txt_gets_quoted() {
        let entry = DnsEntry::new("home", RecordType::TXT, "some new text", None, None);
        assert_eq!(entry.value, "\"some new text\"");
        let entry = DnsEntry::new("home", RecordType::TXT, "\"kept\"", None, None);
        assert_eq!(entry.value, "\"kept\"");
    }

    #[test]
    fn test_render_omitted_host_is_blank() {
        let mut entry = DnsEntry::new("ns", RecordType::AAAA, "2001:db8:10::2", None, None);
        entry.host_omitted = true;
        assert_eq!(entry.to_string(), "            AAAA  2001:db8:10::2");
    }

    #[test]
    fn test_srv_lines_stay_unknown() {
        let file = empty_file();
        let content = "_sipfederationtls._tcp.exmp.ru.   IN  SRV  0  0  5060  sip.exmp.ru.";
        assert_eq!(
            ParsedItem::classify(content, &file).unwrap(),
            ParsedItem::Unknown(content.to_owned())
        );
    }
}
