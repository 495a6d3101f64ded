//! The event → ledger code configuration.
//!
//! The mapping document is loosely typed JSON keyed by category name:
//!
//! ```json
//! {
//!   "Folha": [
//!     { "evento": "003", "codigo_lancamento": "30055", "tipo": "Adicional" },
//!     { "evento": "310", "codigo_lancamento": 30058, "tipo": "Desconto" }
//!   ],
//!   "Férias": [],
//!   "INSS": [
//!     { "codigo_lancamento": "30055", "tipo": "Desconto" }
//!   ]
//! }
//! ```
//!
//! Keys naming a tax (`INSS`, `IRRF`, `FGTS`) are not categories: they list the ledger codes that
//! book that tax, with no event code, for the comparison against the general summary.
//!
//! It is validated once, at load, into a `MappingTable` that is indexed for the lookups the
//! reconciliation passes need. English field names (`event`, `ledgerCode`, `kind`) are accepted as
//! well.

use crate::error::ConfigError;
use crate::model::{CategoryId, EventCode, LedgerCode, Tax};
use crate::text::normalize;
use rust_decimal::Decimal;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Whether a mapped event adds to or deducts from the payroll.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum EntryKind {
    Addition,
    Deduction,
    /// Informational lines such as bases of calculation.
    Informative,
    /// Any other label found in the document, kept verbatim.
    Other(String),
}

impl Default for EntryKind {
    fn default() -> Self {
        EntryKind::Addition
    }
}

impl EntryKind {
    pub fn parse(raw: &str) -> EntryKind {
        match normalize(raw).as_str() {
            "" | "adicional" | "adicionais" | "provento" | "proventos" | "addition" => {
                EntryKind::Addition
            }
            "desconto" | "descontos" | "deduction" => EntryKind::Deduction,
            "informativo" | "informativa" | "base" | "informative" => EntryKind::Informative,
            _ => EntryKind::Other(raw.trim().to_string()),
        }
    }

    /// Signs a magnitude according to the kind: deductions are negative, everything else positive.
    pub fn signed(&self, magnitude: Decimal) -> Decimal {
        match self {
            EntryKind::Deduction => -magnitude.abs(),
            _ => magnitude.abs(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            EntryKind::Addition => "Adicional",
            EntryKind::Deduction => "Desconto",
            EntryKind::Informative => "Informativo",
            EntryKind::Other(s) => s.as_str(),
        }
    }
}

impl Serialize for EntryKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

/// One validated `(category, event) → ledger code` association.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct MappingEntry {
    category: CategoryId,
    event: EventCode,
    ledger_code: LedgerCode,
    kind: EntryKind,
}

impl MappingEntry {
    pub fn new(
        category: CategoryId,
        event: EventCode,
        ledger_code: LedgerCode,
        kind: EntryKind,
    ) -> Self {
        Self {
            category,
            event,
            ledger_code,
            kind,
        }
    }

    pub fn category(&self) -> CategoryId {
        self.category
    }

    pub fn event(&self) -> &EventCode {
        &self.event
    }

    pub fn ledger_code(&self) -> &LedgerCode {
        &self.ledger_code
    }

    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }
}

impl Serialize for MappingEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("MappingEntry", 3)?;
        s.serialize_field("evento", self.event.as_str())?;
        s.serialize_field("codigo_lancamento", self.ledger_code.as_str())?;
        s.serialize_field("tipo", &self.kind)?;
        s.end()
    }
}

/// A ledger code listed under a tax section.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct TaxEntry {
    ledger_code: LedgerCode,
    kind: EntryKind,
}

impl TaxEntry {
    pub fn new(ledger_code: LedgerCode, kind: EntryKind) -> Self {
        Self { ledger_code, kind }
    }

    pub fn ledger_code(&self) -> &LedgerCode {
        &self.ledger_code
    }

    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }
}

impl Serialize for TaxEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("TaxEntry", 2)?;
        s.serialize_field("codigo_lancamento", self.ledger_code.as_str())?;
        s.serialize_field("tipo", &self.kind)?;
        s.end()
    }
}

/// The strongly-typed, indexed mapping configuration. Immutable once built.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct MappingTable {
    entries: Vec<MappingEntry>,
    /// Categories present in the document, including those with an empty list.
    categories: BTreeSet<CategoryId>,
    by_event: HashMap<(CategoryId, EventCode), Vec<LedgerCode>>,
    by_category: BTreeMap<CategoryId, BTreeSet<LedgerCode>>,
    tax_sections: BTreeMap<Tax, Vec<TaxEntry>>,
}

impl MappingTable {
    /// Parses and validates a mapping document.
    ///
    /// # Errors
    /// - `ConfigError::Malformed` if the root is not an object or a category value is not a list.
    /// - `ConfigError::InvalidEntry` if an entry is not an object or its codes are invalid.
    pub fn load(json: &str) -> Result<Self, ConfigError> {
        let root: Value =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        let object = match root {
            Value::Object(object) => object,
            other => {
                return Err(ConfigError::Malformed(format!(
                    "expected an object keyed by category, found {}",
                    json_type(&other)
                )))
            }
        };

        let mut categories = BTreeSet::new();
        let mut entries = Vec::new();
        let mut tax_sections = BTreeMap::new();
        for (key, value) in object {
            if let Some(tax) = Tax::from_section_key(&key) {
                let mut section: Vec<TaxEntry> = Vec::new();
                for (index, item) in section_items(&key, value)?.into_iter().enumerate() {
                    let entry = parse_tax_entry(item).map_err(|reason| {
                        ConfigError::InvalidEntry {
                            category: key.clone(),
                            index,
                            reason,
                        }
                    })?;
                    if !section.contains(&entry) {
                        section.push(entry);
                    }
                }
                tax_sections.insert(tax, section);
                continue;
            }
            let category = CategoryId::canonicalize(&key);
            if category == CategoryId::Unrecognized {
                warn!("Mapping category '{key}' is not a known category, keeping it as {category}");
            }
            categories.insert(category);
            for (index, item) in section_items(&key, value)?.into_iter().enumerate() {
                let entry = parse_entry(category, item).map_err(|reason| {
                    ConfigError::InvalidEntry {
                        category: key.clone(),
                        index,
                        reason,
                    }
                })?;
                entries.push(entry);
            }
        }
        let mut table = Self::from_entries_with_categories(entries, categories);
        table.tax_sections = tax_sections;
        Ok(table)
    }

    /// Builds a table from already validated entries.
    pub fn from_entries(entries: impl IntoIterator<Item = MappingEntry>) -> Self {
        Self::from_entries_with_categories(entries, BTreeSet::new())
    }

    fn from_entries_with_categories(
        entries: impl IntoIterator<Item = MappingEntry>,
        mut categories: BTreeSet<CategoryId>,
    ) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        let mut by_event: HashMap<(CategoryId, EventCode), Vec<LedgerCode>> = HashMap::new();
        let mut by_category: BTreeMap<CategoryId, BTreeSet<LedgerCode>> = BTreeMap::new();

        for entry in entries {
            if !seen.insert(entry.clone()) {
                debug!(
                    "Dropping duplicate mapping entry {} {} -> {}",
                    entry.category, entry.event, entry.ledger_code
                );
                continue;
            }
            categories.insert(entry.category);
            let targets = by_event
                .entry((entry.category, entry.event.clone()))
                .or_default();
            if !targets.contains(&entry.ledger_code) {
                targets.push(entry.ledger_code.clone());
            }
            by_category
                .entry(entry.category)
                .or_default()
                .insert(entry.ledger_code.clone());
            kept.push(entry);
        }

        Self {
            entries: kept,
            categories,
            by_event,
            by_category,
            tax_sections: BTreeMap::new(),
        }
    }

    /// The ledger codes an event posts to, in document order. Empty when the event is unmapped.
    pub fn lookup(&self, category: CategoryId, event: &EventCode) -> &[LedgerCode] {
        self.by_event
            .get(&(category, event.clone()))
            .map(|codes| codes.as_slice())
            .unwrap_or(&[])
    }

    /// All ledger codes that any event of `category` maps to.
    pub fn ledger_codes_for_category(&self, category: CategoryId) -> BTreeSet<LedgerCode> {
        self.by_category.get(&category).cloned().unwrap_or_default()
    }

    /// The kind of the first entry mapping this event.
    pub fn kind_for(&self, category: CategoryId, event: &EventCode) -> Option<&EntryKind> {
        self.entries
            .iter()
            .find(|e| e.category == category && &e.event == event)
            .map(|e| &e.kind)
    }

    /// The kind of the first entry posting to `code`, restricted to `category` when given.
    pub fn kind_for_code(
        &self,
        category: Option<CategoryId>,
        code: &LedgerCode,
    ) -> Option<&EntryKind> {
        self.entries
            .iter()
            .filter(|e| category.map_or(true, |c| c == e.category))
            .find(|e| &e.ledger_code == code)
            .map(|e| &e.kind)
    }

    /// Codes declared with different kinds in different entries. `kind_for_code(None, _)` picks
    /// the first entry for these, with categories taken in key order.
    pub fn conflicting_kinds(&self) -> BTreeSet<LedgerCode> {
        let mut first: HashMap<&LedgerCode, &EntryKind> = HashMap::new();
        let mut conflicts = BTreeSet::new();
        for entry in &self.entries {
            match first.get(&entry.ledger_code) {
                Some(kind) if *kind != &entry.kind => {
                    conflicts.insert(entry.ledger_code.clone());
                }
                Some(_) => {}
                None => {
                    first.insert(&entry.ledger_code, &entry.kind);
                }
            }
        }
        conflicts
    }

    /// The first category that declares `code`.
    pub fn category_for_code(&self, code: &LedgerCode) -> Option<CategoryId> {
        self.entries
            .iter()
            .find(|e| &e.ledger_code == code)
            .map(|e| e.category)
    }

    /// Every ledger code that appears in a category of the document.
    pub fn declared_codes(&self) -> BTreeSet<LedgerCode> {
        self.by_category.values().flatten().cloned().collect()
    }

    /// The ledger codes listed under `tax`. Empty when the document has no such section.
    pub fn tax_section(&self, tax: Tax) -> &[TaxEntry] {
        self.tax_sections
            .get(&tax)
            .map(|entries| entries.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_tax_section(&self, tax: Tax) -> bool {
        self.tax_sections.contains_key(&tax)
    }

    /// Every ledger code listed under any tax section.
    pub fn tax_section_codes(&self) -> BTreeSet<LedgerCode> {
        self.tax_sections
            .values()
            .flatten()
            .map(|e| e.ledger_code.clone())
            .collect()
    }

    pub fn categories(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.categories.iter().copied()
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for MappingTable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map =
            serializer.serialize_map(Some(self.categories.len() + self.tax_sections.len()))?;
        for category in &self.categories {
            let entries: Vec<&MappingEntry> = self
                .entries
                .iter()
                .filter(|e| &e.category == category)
                .collect();
            map.serialize_entry(&category.to_string(), &entries)?;
        }
        for (tax, entries) in &self.tax_sections {
            map.serialize_entry(&tax.to_string(), entries)?;
        }
        map.end()
    }
}

/// Raw entry as it appears in the document, before validation.
#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(alias = "evento")]
    event: Option<CodeValue>,
    #[serde(alias = "codigo_lancamento", alias = "ledgerCode")]
    ledger_code: Option<CodeValue>,
    #[serde(alias = "tipo", default)]
    kind: Option<String>,
}

/// Codes are written as strings by hand and as numbers by spreadsheet exports.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CodeValue {
    Text(String),
    Number(serde_json::Number),
}

impl CodeValue {
    fn into_text(self) -> String {
        match self {
            CodeValue::Text(s) => s,
            CodeValue::Number(n) => match (n.as_u64(), n.as_f64()) {
                (Some(u), _) => u.to_string(),
                (None, Some(f)) if f.fract() == 0.0 && f >= 0.0 => format!("{f:.0}"),
                _ => n.to_string(),
            },
        }
    }
}

fn parse_entry(category: CategoryId, item: Value) -> Result<MappingEntry, String> {
    if !item.is_object() {
        return Err(format!("expected an object, found {}", json_type(&item)));
    }
    let raw: RawEntry = serde_json::from_value(item).map_err(|e| e.to_string())?;

    let event_text = raw
        .event
        .map(CodeValue::into_text)
        .ok_or_else(|| String::from("missing event code"))?;
    let digits: String = event_text.chars().filter(|c| c.is_ascii_digit()).collect();
    // Spreadsheet exports drop leading zeros: 3 means "003".
    let padded = if (1..3).contains(&digits.len()) {
        format!("{digits:0>3}")
    } else {
        digits
    };
    let event = EventCode::new(padded).map_err(|e| e.to_string())?;

    let code_text = raw
        .ledger_code
        .map(CodeValue::into_text)
        .ok_or_else(|| String::from("missing ledger code"))?;
    let ledger_code = LedgerCode::parse_cell(&code_text).map_err(|e| e.to_string())?;

    let kind = raw.kind.as_deref().map(EntryKind::parse).unwrap_or_default();
    Ok(MappingEntry::new(category, event, ledger_code, kind))
}

fn parse_tax_entry(item: Value) -> Result<TaxEntry, String> {
    if !item.is_object() {
        return Err(format!("expected an object, found {}", json_type(&item)));
    }
    let raw: RawEntry = serde_json::from_value(item).map_err(|e| e.to_string())?;
    let code_text = raw
        .ledger_code
        .map(CodeValue::into_text)
        .ok_or_else(|| String::from("missing ledger code"))?;
    let ledger_code = LedgerCode::parse_cell(&code_text).map_err(|e| e.to_string())?;
    let kind = raw.kind.as_deref().map(EntryKind::parse).unwrap_or_default();
    Ok(TaxEntry::new(ledger_code, kind))
}

/// The list under a document key. `null` counts as an empty list.
fn section_items(key: &str, value: Value) -> Result<Vec<Value>, ConfigError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        other => Err(ConfigError::Malformed(format!(
            "category '{key}' must be a list, found {}",
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Holds the process-wide mapping snapshot.
///
/// Readers take an `Arc` snapshot and keep using it for the whole run, so a reload never changes
/// a table that a run is reading. A reload builds a complete new table and swaps the pointer.
#[derive(Debug, Clone, Default)]
pub struct MappingStore {
    current: Arc<RwLock<Arc<MappingTable>>>,
}

impl MappingStore {
    pub fn new(table: MappingTable) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(table))),
        }
    }

    /// Reads and validates the mapping document at `path`.
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::new(read_table(path)?))
    }

    /// An immutable view of the current table.
    pub fn snapshot(&self) -> Arc<MappingTable> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Replaces the whole table. Snapshots taken earlier are unaffected.
    pub fn replace(&self, table: MappingTable) {
        let next = Arc::new(table);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Loads `path` and swaps it in. On error the current table stays in place.
    pub fn reload(&self, path: &Path) -> Result<(), ConfigError> {
        let table = read_table(path)?;
        debug!("Reloaded mapping from {} ({} entries)", path.display(), table.len());
        self.replace(table);
        Ok(())
    }
}

fn read_table(path: &Path) -> Result<MappingTable, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    MappingTable::load(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(s: &str) -> EventCode {
        EventCode::new(s).unwrap()
    }

    fn la(s: &str) -> LedgerCode {
        LedgerCode::new(s).unwrap()
    }

    const DOC: &str = r#"{
        "Folha": [
            { "evento": "003", "codigo_lancamento": "30055", "tipo": "Adicional" },
            { "evento": "003", "codigo_lancamento": "30056", "tipo": "Adicional" },
            { "evento": "310", "codigo_lancamento": 30058, "tipo": "Desconto" },
            { "evento": "003", "codigo_lancamento": "30055", "tipo": "adicional" }
        ],
        "Férias": [
            { "event": 5, "ledgerCode": "40023.0", "kind": "Adicional" }
        ],
        "Rescisão": []
    }"#;

    #[test]
    fn test_load_and_lookup() {
        let table = MappingTable::load(DOC).unwrap();
        assert_eq!(
            table.lookup(CategoryId::Folha, &ev("003")),
            &[la("30055"), la("30056")]
        );
        assert_eq!(table.lookup(CategoryId::Folha, &ev("310")), &[la("30058")]);
        assert_eq!(table.lookup(CategoryId::Ferias, &ev("005")), &[la("40023")]);
        assert!(table.lookup(CategoryId::Folha, &ev("999")).is_empty());
        assert!(table.lookup(CategoryId::Geral, &ev("003")).is_empty());
    }

    #[test]
    fn test_duplicates_dropped() {
        let table = MappingTable::load(DOC).unwrap();
        // the fourth Folha entry repeats the first (kind labels normalize to the same kind)
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_empty_category_is_valid() {
        let table = MappingTable::load(DOC).unwrap();
        assert!(table.categories().any(|c| c == CategoryId::Rescisao));
        assert!(table.ledger_codes_for_category(CategoryId::Rescisao).is_empty());
    }

    #[test]
    fn test_codes_for_category() {
        let table = MappingTable::load(DOC).unwrap();
        let codes = table.ledger_codes_for_category(CategoryId::Folha);
        assert_eq!(
            codes.into_iter().collect::<Vec<_>>(),
            vec![la("30055"), la("30056"), la("30058")]
        );
        assert_eq!(table.declared_codes().len(), 4);
    }

    #[test]
    fn test_kinds() {
        let table = MappingTable::load(DOC).unwrap();
        assert_eq!(
            table.kind_for(CategoryId::Folha, &ev("310")),
            Some(&EntryKind::Deduction)
        );
        assert_eq!(
            table.kind_for_code(None, &la("30058")),
            Some(&EntryKind::Deduction)
        );
        assert_eq!(table.kind_for_code(Some(CategoryId::Ferias), &la("30058")), None);
        assert_eq!(table.category_for_code(&la("40023")), Some(CategoryId::Ferias));
    }

    #[test]
    fn test_conflicting_kinds() {
        let doc = r#"{
            "Folha": [{ "evento": "003", "codigo_lancamento": "30055", "tipo": "Adicional" }],
            "Férias": [
                { "evento": "310", "codigo_lancamento": "30055", "tipo": "Desconto" },
                { "evento": "005", "codigo_lancamento": "40023" }
            ]
        }"#;
        let table = MappingTable::load(doc).unwrap();
        let conflicts: Vec<String> = table
            .conflicting_kinds()
            .into_iter()
            .map(|c| c.as_str().to_string())
            .collect();
        assert_eq!(conflicts, vec!["30055"]);
        assert!(MappingTable::load(DOC).unwrap().conflicting_kinds().is_empty());
    }

    #[test]
    fn test_tax_sections() {
        let doc = r#"{
            "Folha": [{ "evento": "003", "codigo_lancamento": "30055" }],
            "INSS": [
                { "codigo_lancamento": 30056, "tipo": "Desconto" },
                { "codigo_lancamento": "30057" },
                { "codigo_lancamento": "30057" }
            ],
            "fgts": null
        }"#;
        let table = MappingTable::load(doc).unwrap();
        assert_eq!(table.categories().collect::<Vec<_>>(), vec![CategoryId::Folha]);
        let inss = table.tax_section(Tax::Inss);
        assert_eq!(inss.len(), 2);
        assert_eq!(inss[0].ledger_code().as_str(), "30056");
        assert_eq!(inss[0].kind(), &EntryKind::Deduction);
        assert_eq!(inss[1].kind(), &EntryKind::Addition);
        assert!(table.has_tax_section(Tax::Fgts));
        assert!(table.tax_section(Tax::Fgts).is_empty());
        assert!(!table.has_tax_section(Tax::Irrf));
        // tax codes are not category codes
        assert!(!table.declared_codes().contains(&la("30056")));
        assert!(table.tax_section_codes().contains(&la("30056")));

        let json = serde_json::to_string(&table).unwrap();
        assert!(json.contains(r#""INSS":[{"codigo_lancamento":"30056","tipo":"Desconto"}"#));
        assert_eq!(MappingTable::load(&json).unwrap(), table);

        let err = MappingTable::load(r#"{"IRRF": [{"tipo": "Desconto"}]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEntry { index: 0, .. }));
    }

    #[test]
    fn test_entry_kind_parse() {
        assert_eq!(EntryKind::parse("Desconto"), EntryKind::Deduction);
        assert_eq!(EntryKind::parse("DESCONTOS"), EntryKind::Deduction);
        assert_eq!(EntryKind::parse("Adicional"), EntryKind::Addition);
        assert_eq!(EntryKind::parse(""), EntryKind::Addition);
        assert_eq!(EntryKind::parse("Informativo"), EntryKind::Informative);
        assert_eq!(
            EntryKind::parse("Provisão"),
            EntryKind::Other(String::from("Provisão"))
        );
        assert_eq!(
            EntryKind::Deduction.signed(Decimal::new(100, 0)),
            Decimal::new(-100, 0)
        );
        assert_eq!(
            EntryKind::Addition.signed(Decimal::new(-100, 0)),
            Decimal::new(100, 0)
        );
    }

    #[test]
    fn test_malformed_root() {
        assert!(matches!(
            MappingTable::load("[]"),
            Err(ConfigError::Malformed(_))
        ));
        assert!(matches!(
            MappingTable::load("{not json"),
            Err(ConfigError::Malformed(_))
        ));
        assert!(matches!(
            MappingTable::load(r#"{"Folha": "003"}"#),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn test_invalid_entries() {
        let bad_event = r#"{"Folha": [{"evento": "0003", "codigo_lancamento": "30055"}]}"#;
        assert!(matches!(
            MappingTable::load(bad_event),
            Err(ConfigError::InvalidEntry { index: 0, .. })
        ));
        let short_code = r#"{"Folha": [{"evento": "003", "codigo_lancamento": "305"}]}"#;
        assert!(matches!(
            MappingTable::load(short_code),
            Err(ConfigError::InvalidEntry { .. })
        ));
        let missing = r#"{"Folha": [{"evento": "003"}]}"#;
        assert!(MappingTable::load(missing).is_err());
        let not_object = r#"{"Folha": ["003"]}"#;
        assert!(MappingTable::load(not_object).is_err());
    }

    #[test]
    fn test_null_list_is_empty() {
        let table = MappingTable::load(r#"{"Folha": null}"#).unwrap();
        assert!(table.is_empty());
        assert!(table.categories().any(|c| c == CategoryId::Folha));
    }

    #[test]
    fn test_serialize_document_shape() {
        let table = MappingTable::load(r#"{"Folha": [{"evento": "003", "codigo_lancamento": "30055"}]}"#)
            .unwrap();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(
            json,
            r#"{"Folha":[{"evento":"003","codigo_lancamento":"30055","tipo":"Adicional"}]}"#
        );
        let reloaded = MappingTable::load(&json).unwrap();
        assert_eq!(table, reloaded);
    }

    #[test]
    fn test_store_swaps_atomically() {
        let store = MappingStore::new(MappingTable::load(DOC).unwrap());
        let before = store.snapshot();
        store.replace(MappingTable::default());
        let after = store.snapshot();
        assert_eq!(before.len(), 4);
        assert!(after.is_empty());
    }

    #[test]
    fn test_store_reload_keeps_table_on_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mapeamento_dp.json");
        std::fs::write(&path, DOC).unwrap();
        let store = MappingStore::open(&path).unwrap();
        std::fs::write(&path, "[]").unwrap();
        assert!(store.reload(&path).is_err());
        assert_eq!(store.snapshot().len(), 4);
        std::fs::write(&path, r#"{"Geral": []}"#).unwrap();
        store.reload(&path).unwrap();
        assert!(store.snapshot().is_empty());
    }
}
