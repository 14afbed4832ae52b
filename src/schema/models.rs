use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};


pub const NAMING_SERIES_FIELD: &str = "naming_series";


#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr, Display,
)]
pub enum FieldType {
    Data,
    Link,
    Table,
    Select,
    Int,
    Float,
    Currency,
    Date,
    Datetime,
    Check,
    Text,
}

impl FieldType {
    pub fn references_record_type(self) -> bool {
        matches!(self, Self::Link | Self::Table)
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    /// Target record type for `Link`/`Table`, newline-delimited choices for `Select`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            options: None,
        }
    }


    pub fn link(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Link,
            options: Some(target.into()),
        }
    }


    pub fn table(name: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Table,
            options: Some(child.into()),
        }
    }


    pub fn naming_series<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let options = prefixes
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            name: NAMING_SERIES_FIELD.to_string(),
            field_type: FieldType::Select,
            options: Some(options),
        }
    }


    pub fn links_to(&self, record_type: &str) -> bool {
        self.field_type == FieldType::Link && self.options.as_deref() == Some(record_type)
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordType {
    pub name: String,
    #[serde(default)]
    pub is_single: bool,
    #[serde(default)]
    pub is_table: bool,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl RecordType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_single: false,
            is_table: false,
            fields: Vec::new(),
        }
    }


    pub fn single(mut self) -> Self {
        self.is_single = true;
        self
    }


    pub fn table_only(mut self) -> Self {
        self.is_table = true;
        self
    }


    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }


    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }


    /// Child record types owned through `Table` fields, in declaration order.
    pub fn child_tables(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.field_type == FieldType::Table)
            .filter_map(|f| f.options.as_deref())
            .filter(|o| !o.is_empty())
    }


    /// First link field pointing at `entity_type`.
    pub fn scope_field(&self, entity_type: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.links_to(entity_type))
    }


    pub fn references(&self, entity_type: &str) -> bool {
        self.scope_field(entity_type).is_some()
    }


    pub fn naming_series(&self) -> Option<NamingSeriesSpec> {
        self.get_field(NAMING_SERIES_FIELD)
            .and_then(|f| f.options.as_deref())
            .map(NamingSeriesSpec::parse)
            .filter(|spec| !spec.is_empty())
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NamingSeriesSpec {
    prefixes: Vec<String>,
}

impl NamingSeriesSpec {
    pub fn parse(options: &str) -> Self {
        let mut prefixes: Vec<String> = options
            .lines()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        prefixes.dedup();
        Self { prefixes }
    }


    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }


    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }


    /// Longest prefix first; ties broken alphabetically so the order is stable.
    pub fn by_specificity(&self) -> Vec<&str> {
        let mut ordered: Vec<&str> = self.prefixes.iter().map(String::as_str).collect();
        ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        ordered.dedup();
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sales_order() -> RecordType {
        RecordType::new("Sales Order")
            .field(FieldDef::naming_series(["SO-", "SO-ORD-", ""]))
            .field(FieldDef::link("customer", "Customer"))
            .field(FieldDef::link("company", "Company"))
            .field(FieldDef::table("items", "Sales Order Item"))
            .field(FieldDef::table("taxes", "Sales Taxes and Charges"))
    }

    #[test]
    fn test_scope_field_lookup() {
        let rt = sales_order();
        assert_eq!(rt.scope_field("Company").map(|f| f.name.as_str()), Some("company"));
        assert!(rt.scope_field("Warehouse").is_none());
        assert!(rt.references("Customer"));
    }

    #[test]
    fn test_child_tables() {
        let rt = sales_order();
        let children: Vec<_> = rt.child_tables().collect();
        assert_eq!(children, vec!["Sales Order Item", "Sales Taxes and Charges"]);
    }

    #[test]
    fn test_naming_series_longest_first() {
        let spec = sales_order().naming_series().unwrap();
        assert_eq!(spec.prefixes().len(), 2);
        assert_eq!(spec.by_specificity(), vec!["SO-ORD-", "SO-"]);
    }

    #[test]
    fn test_naming_series_blank_options() {
        let rt = RecordType::new("Journal Entry").field(FieldDef::naming_series(["", "  "]));
        assert!(rt.naming_series().is_none());
        assert!(RecordType::new("Bin").naming_series().is_none());
    }

    #[test]
    fn test_field_type_strings() {
        assert_eq!(FieldType::from_str("Link").unwrap(), FieldType::Link);
        let name: &'static str = FieldType::Table.into();
        assert_eq!(name, "Table");
    }
}
