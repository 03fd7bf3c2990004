// pad a rendered field to its column width, always leaving at least
// one space before the next field.
pub fn pad_field(field: &str, width: usize) -> String {
    if field.chars().count() >= width {
        format!("{} ", field)
    } else {
        format!("{:<width$}", field, width = width)
    }
}

#[test]
fn test_pad_field() {
    assert_eq!(pad_field("ns", 8), "ns      ");
    assert_eq!(pad_field("", 4), "    ");
    assert_eq!(pad_field("example.com.", 12), "example.com. ");
    assert_eq!(pad_field("wwwtest.example.com.", 12), "wwwtest.example.com. ");
}

pub fn is_digits(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

#[test]
fn test_is_digits() {
    assert_eq!(is_digits("86400"), true);
    assert_eq!(is_digits("0"), true);
    assert_eq!(is_digits("1h"), false);
    assert_eq!(is_digits(""), false);
    assert_eq!(is_digits("-1"), false);
}

pub fn is_alnum(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_alphanumeric())
}

#[test]
fn test_is_alnum() {
    assert_eq!(is_alnum("2007120710"), true);
    assert_eq!(is_alnum("1600h"), true);
    assert_eq!(is_alnum("4w"), true);
    assert_eq!(is_alnum(")"), false);
    assert_eq!(is_alnum("two words"), false);
    assert_eq!(is_alnum(""), false);
}

// `\;` in raw zone text is a literal semicolon, not a comment opener.
pub fn unescape_value(value: &str) -> String {
    value.replace("\\;", ";")
}

pub fn escape_value(value: &str) -> String {
    value.replace(';', "\\;")
}

#[test]
fn test_escape_value() {
    assert_eq!(unescape_value(r#""some\;arbitrary""#), r#""some;arbitrary""#);
    assert_eq!(escape_value(r#""some;arbitrary""#), r#""some\;arbitrary""#);
    assert_eq!(unescape_value("plain"), "plain");
    assert_eq!(escape_value(&unescape_value(r#"a\;b"#)), r#"a\;b"#);
}
