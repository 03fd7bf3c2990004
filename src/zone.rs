use crate::document::{ConfigFile, ConfigLine};
use crate::errors::ParseZoneErr;
use crate::parser::FileParser;
use crate::record::{DnsEntry, ItemKind, ParsedItem, RecordType};
use chrono::Local;
use std::fs;

/// Where "today" comes from for SOA serial numbers. Injected so tests
/// can replay a fixed day.
pub trait Clock {
    /// YYYYMMDD
    fn today(&self) -> String;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> String {
        Local::now().format("%Y%m%d").to_string()
    }
}

/// SOA fields as one bag of optionals: `get_soa_info` fills whatever
/// the file holds, `set_soa_info` applies whatever the caller set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoaInfo {
    pub domain: Option<String>,
    pub ns: Option<String>,
    pub email: Option<String>,
    pub serial: Option<String>,
    pub refresh: Option<String>,
    pub retry: Option<String>,
    pub expiry: Option<String>,
    pub caching: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DnsRecordInfo {
    pub host: String,
    pub r_type: RecordType,
    pub priority: Option<u32>,
    pub ttl: Option<u32>,
    pub value: String,
}

/// The mutation api over one parsed zone file. Single-threaded: one
/// document, mutated in place, serialized on demand.
pub struct ZoneManager {
    file: ConfigFile,
    clock: Box<dyn Clock>,
}

impl std::fmt::Debug for ZoneManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneManager")
            .field("file", &self.file)
            .finish()
    }
}

impl ZoneManager {
    pub fn from_string(text: &str) -> Result<ZoneManager, ParseZoneErr> {
        Ok(ZoneManager {
            file: FileParser::new().parse_lines(text)?,
            clock: Box::new(SystemClock),
        })
    }

    pub fn from_file(path: &str) -> Result<ZoneManager, ParseZoneErr> {
        match fs::read_to_string(path) {
            Ok(text) => ZoneManager::from_string(&text),
            Err(err) => Err(ParseZoneErr::IOError {
                path: path.to_owned(),
                err: err.to_string(),
            }),
        }
    }

    pub fn set_clock(&mut self, clock: Box<dyn Clock>) {
        self.clock = clock;
    }

    pub fn get_origin(&self) -> Option<&str> {
        self.file.lines.iter().find_map(|line| match &line.item {
            ParsedItem::Origin { value } => Some(value.as_str()),
            _ => None,
        })
    }

    /// No-op when the file has no $ORIGIN line, one is never created.
    pub fn set_origin(&mut self, origin: &str) {
        if let Some(ParsedItem::Origin { value }) = self.file.first_item_mut(ItemKind::Origin) {
            *value = origin.to_owned();
        }
    }

    pub fn get_ttl(&self) -> Option<&str> {
        self.file.lines.iter().find_map(|line| match &line.item {
            ParsedItem::Ttl { value } => Some(value.as_str()),
            _ => None,
        })
    }

    /// No-op when the file has no $TTL line, one is never created.
    pub fn set_ttl(&mut self, ttl: &str) {
        if let Some(ParsedItem::Ttl { value }) = self.file.first_item_mut(ItemKind::Ttl) {
            *value = ttl.to_owned();
        }
    }

    pub fn get_soa_info(&self) -> SoaInfo {
        let mut info = SoaInfo::default();
        for line in &self.file.lines {
            match &line.item {
                ParsedItem::SoaStart { domain, ns, email } => {
                    info.domain = Some(domain.clone());
                    info.ns = Some(ns.clone());
                    info.email = Some(email.clone());
                }
                ParsedItem::SoaSerial { number } => info.serial = Some(number.clone()),
                ParsedItem::SoaRefresh { value } => info.refresh = Some(value.clone()),
                ParsedItem::SoaRetry { value } => info.retry = Some(value.clone()),
                ParsedItem::SoaExpiry { value } => info.expiry = Some(value.clone()),
                ParsedItem::SoaCaching { value, .. } => info.caching = Some(value.clone()),
                _ => {}
            }
        }
        info
    }

    /// Apply the fields the caller supplied, leave the rest alone.
    /// An email written with `@` is stored in zone file convention.
    pub fn set_soa_info(&mut self, update: &SoaInfo) {
        for line in &mut self.file.lines {
            match &mut line.item {
                ParsedItem::SoaStart { domain, ns, email } => {
                    if let Some(new) = &update.domain {
                        *domain = new.clone();
                    }
                    if let Some(new) = &update.ns {
                        *ns = new.clone();
                    }
                    if let Some(new) = &update.email {
                        *email = new.replace('@', ".");
                    }
                }
                ParsedItem::SoaSerial { number } => {
                    if let Some(new) = &update.serial {
                        *number = new.clone();
                    }
                }
                ParsedItem::SoaRefresh { value } => {
                    if let Some(new) = &update.refresh {
                        *value = new.clone();
                    }
                }
                ParsedItem::SoaRetry { value } => {
                    if let Some(new) = &update.retry {
                        *value = new.clone();
                    }
                }
                ParsedItem::SoaExpiry { value } => {
                    if let Some(new) = &update.expiry {
                        *value = new.clone();
                    }
                }
                ParsedItem::SoaCaching { value, .. } => {
                    if let Some(new) = &update.caching {
                        *value = new.clone();
                    }
                }
                _ => {}
            }
        }
    }

    /// Serial convention is YYYYMMDDRR: bump the two digit revision on
    /// repeated updates within one day, start over at 00 on a new day.
    pub fn update_soa_serial(&mut self) {
        let today = self.clock.today();
        if let Some(ParsedItem::SoaSerial { number }) =
            self.file.first_item_mut(ItemKind::SoaSerial)
        {
            let revision = if number.len() == today.len() + 2 && number.starts_with(&today) {
                number[today.len()..].parse::<u32>().unwrap_or(0) + 1
            } else {
                0
            };
            *number = format!("{}{:02}", today, revision);
        }
    }

    /// Entries matching every supplied filter, in document order.
    pub fn filter_dns(
        &self,
        host: Option<&str>,
        r_type: Option<RecordType>,
        priority: Option<u32>,
    ) -> Vec<DnsRecordInfo> {
        let mut records = vec![];
        for line in &self.file.lines {
            if let ParsedItem::Dns(entry) = &line.item {
                if entry_matches(entry, host, r_type, None, priority) {
                    records.push(DnsRecordInfo {
                        host: entry.host.clone(),
                        r_type: entry.r_type,
                        priority: entry.priority,
                        ttl: entry.ttl,
                        value: entry.value.clone(),
                    });
                }
            }
        }
        records
    }

    pub fn get_all_dns(&self) -> Vec<DnsRecordInfo> {
        self.filter_dns(None, None, None)
    }

    /// Append a fresh entry at the end of the document. The host is
    /// always written out, never omitted.
    pub fn add_dns(
        &mut self,
        host: &str,
        r_type: RecordType,
        value: &str,
        priority: Option<u32>,
        comment: Option<&str>,
        ttl: Option<u32>,
    ) {
        let entry = DnsEntry::new(host, r_type, value, priority, ttl);
        self.file.add_line(ConfigLine::new(
            ParsedItem::Dns(entry),
            comment.map(|comment| format!("; {}", comment)),
            None,
        ));
    }

    /// Remove every entry matching all supplied filters. Removing the
    /// entry that carried the visible host would silently re-home the
    /// omitted entries after it, so the first of those gets its host
    /// written out.
    pub fn remove_dns(
        &mut self,
        host: &str,
        r_type: RecordType,
        value: Option<&str>,
        priority: Option<u32>,
    ) {
        let mut index = 0;
        while index < self.file.lines.len() {
            if let ParsedItem::Dns(entry) = &self.file.lines[index].item {
                if entry_matches(entry, Some(host), Some(r_type), value, priority) {
                    let was_donor = !entry.host_omitted;
                    self.file.remove(index);
                    if was_donor {
                        self.materialize_next_omitted(index);
                    }
                    // the next line moved into `index`, do not advance
                    continue;
                }
            }
            index += 1;
        }
    }

    fn materialize_next_omitted(&mut self, index: usize) {
        for line in self.file.lines.iter_mut().skip(index) {
            if let ParsedItem::Dns(entry) = &mut line.item {
                if entry.host_omitted {
                    entry.host_omitted = false;
                }
                break;
            }
        }
    }

    /// Mutate every entry matching the old* filters, applying only the
    /// new* fields that were supplied. A new priority or ttl of 0
    /// clears the field. `host_omitted` is never touched: an omitted
    /// entry keeps its blank host column even when its host changes.
    #[allow(clippy::too_many_arguments)]
    pub fn replace_dns(
        &mut self,
        old_host: &str,
        old_type: RecordType,
        old_value: Option<&str>,
        old_priority: Option<u32>,
        new_host: Option<&str>,
        new_type: Option<RecordType>,
        new_value: Option<&str>,
        new_priority: Option<u32>,
        new_ttl: Option<u32>,
    ) {
        for line in &mut self.file.lines {
            if let ParsedItem::Dns(entry) = &mut line.item {
                if !entry_matches(entry, Some(old_host), Some(old_type), old_value, old_priority) {
                    continue;
                }
                if let Some(host) = new_host {
                    entry.host = host.to_owned();
                }
                if let Some(r_type) = new_type {
                    entry.r_type = r_type;
                }
                if let Some(value) = new_value {
                    entry.set_value(value);
                }
                match new_priority {
                    Some(0) => entry.priority = None,
                    Some(priority) => entry.priority = Some(priority),
                    None => {}
                }
                match new_ttl {
                    Some(0) => entry.ttl = None,
                    Some(ttl) => entry.ttl = Some(ttl),
                    None => {}
                }
            }
        }
    }

    pub fn set_dns_value(
        &mut self,
        host: &str,
        r_type: RecordType,
        new_value: &str,
        priority: Option<u32>,
    ) {
        self.replace_dns(
            host,
            r_type,
            None,
            priority,
            None,
            None,
            Some(new_value),
            None,
            None,
        );
    }

    pub fn generate_config(&self) -> String {
        self.file.to_string()
    }

    pub fn save_file(&mut self, path: &str, update_serial: bool) -> Result<(), ParseZoneErr> {
        if update_serial {
            self.update_soa_serial();
        }
        fs::write(path, self.generate_config()).map_err(|err| ParseZoneErr::IOError {
            path: path.to_owned(),
            err: err.to_string(),
        })
    }

    /// Diagnostic dump: each line prefixed with its classified kind.
    pub fn debug_string(&self) -> String {
        let mut out = String::new();
        for line in &self.file.lines {
            out.push_str(&format!(";;;;;;; {}\n{}\n\n", line.item.kind(), line));
        }
        out
    }
}

fn entry_matches(
    entry: &DnsEntry,
    host: Option<&str>,
    r_type: Option<RecordType>,
    value: Option<&str>,
    priority: Option<u32>,
) -> bool {
    if let Some(host) = host {
        if entry.host != host {
            return false;
        }
    }
    if let Some(r_type) = r_type {
        if entry.r_type != r_type {
            return false;
        }
    }
    if let Some(value) = value {
        if entry.value != value {
            return false;
        }
    }
    if let Some(priority) = priority {
        if entry.priority != Some(priority) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClock(&'static str);

    impl Clock for FixedClock {
        fn today(&self) -> String {
            self.0.to_owned()
        }
    }

    const SOA_ONLY: &str = "example.com.  IN  SOA  ns.example.com. username.example.com. (
              2007120710
              1d
              2h
              4w
              1h
              )";

    #[test]
    fn test_serial_resets_then_increments() {
        let mut zone = ZoneManager::from_string(SOA_ONLY).unwrap();
        zone.set_clock(Box::new(FixedClock("20991231")));
        zone.update_soa_serial();
        assert_eq!(zone.get_soa_info().serial.as_deref(), Some("2099123100"));
        zone.update_soa_serial();
        assert_eq!(zone.get_soa_info().serial.as_deref(), Some("2099123101"));
    }

    #[test]
    fn test_serial_resets_on_new_day() {
        let mut zone = ZoneManager::from_string(SOA_ONLY).unwrap();
        zone.set_clock(Box::new(FixedClock("20991231")));
        zone.update_soa_serial();
        zone.update_soa_serial();
        zone.set_clock(Box::new(FixedClock("21000101")));
        zone.update_soa_serial();
        assert_eq!(zone.get_soa_info().serial.as_deref(), Some("2100010100"));
    }

    #[test]
    fn test_serial_update_without_soa_is_noop() {
        let mut zone = ZoneManager::from_string("$TTL 1h").unwrap();
        zone.set_clock(Box::new(FixedClock("20991231")));
        zone.update_soa_serial();
        assert_eq!(zone.generate_config(), "$TTL 1h");
    }

    #[test]
    fn test_getters_return_none_when_absent() {
        let zone = ZoneManager::from_string("something unknown").unwrap();
        assert_eq!(zone.get_ttl(), None);
        assert_eq!(zone.get_origin(), None);
        assert_eq!(zone.get_soa_info(), SoaInfo::default());
    }

    #[test]
    fn test_setters_never_create_records() {
        let mut zone = ZoneManager::from_string("something unknown").unwrap();
        zone.set_ttl("1h");
        zone.set_origin("example.com.");
        assert_eq!(zone.generate_config(), "something unknown");
    }

    #[test]
    fn test_soa_email_at_sign_rewritten() {
        let mut zone = ZoneManager::from_string(SOA_ONLY).unwrap();
        let update = SoaInfo {
            email: Some("user@mail.com.".to_owned()),
            ..SoaInfo::default()
        };
        zone.set_soa_info(&update);
        assert_eq!(zone.get_soa_info().email.as_deref(), Some("user.mail.com."));
    }

    #[test]
    fn test_debug_string_lists_kinds() {
        let zone = ZoneManager::from_string("$TTL 1h\n@ A 1.2.3.4\ngarbage here").unwrap();
        let dump = zone.debug_string();
        assert!(dump.contains(";;;;;;; Ttl"));
        assert!(dump.contains(";;;;;;; Dns"));
        assert!(dump.contains(";;;;;;; Unknown"));
    }
}
