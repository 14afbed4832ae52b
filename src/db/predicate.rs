use serde::{Deserialize, Serialize};
use serde_json::Value;


pub const NAME_FIELD: &str = "name";

pub const PARENT_FIELD: &str = "parent";


/// Parameterized row filter handed to a [`Storage`](super::Storage) backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Eq { field: String, value: Value },
    /// Null, missing or empty string.
    IsBlank { field: String },
    In { field: String, select: SubSelect },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubSelect {
    pub record_type: String,
    pub field: String,
    pub filter: Box<Predicate>,
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }


    pub fn is_blank(field: impl Into<String>) -> Self {
        Self::IsBlank { field: field.into() }
    }


    pub fn in_select(
        field: impl Into<String>,
        record_type: impl Into<String>,
        select_field: impl Into<String>,
        filter: Predicate,
    ) -> Self {
        Self::In {
            field: field.into(),
            select: SubSelect {
                record_type: record_type.into(),
                field: select_field.into(),
                filter: Box::new(filter),
            },
        }
    }


    pub fn and(predicates: Vec<Predicate>) -> Self {
        Self::And(predicates)
    }


    pub fn or(predicates: Vec<Predicate>) -> Self {
        Self::Or(predicates)
    }


    pub fn not(predicate: Predicate) -> Self {
        Self::Not(Box::new(predicate))
    }


    /// Rows whose `parent` is the name of a `parent_type` row matching `parent_filter`.
    pub fn child_of(parent_type: impl Into<String>, parent_filter: Predicate) -> Self {
        Self::in_select(PARENT_FIELD, parent_type, NAME_FIELD, parent_filter)
    }


    /// Every identifier (field or record type) the predicate names.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Eq { field, .. } | Self::IsBlank { field } => out.push(field),
            Self::In { field, select } => {
                out.push(field);
                out.push(&select.record_type);
                out.push(&select.field);
                select.filter.collect_identifiers(out);
            }
            Self::And(predicates) | Self::Or(predicates) => {
                for p in predicates {
                    p.collect_identifiers(out);
                }
            }
            Self::Not(predicate) => predicate.collect_identifiers(out),
        }
    }
}


pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}


/// Names beginning with `prefix` but not with any of the longer, already-claimed prefixes.
///
/// `unless` drops whole rows before their names are considered; a dry run
/// uses it to hide rows that the real run would already have deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamePattern {
    pub prefix: String,
    pub excluding: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unless: Option<Predicate>,
}

impl NamePattern {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            excluding: Vec::new(),
            unless: None,
        }
    }


    pub fn excluding<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluding.extend(prefixes.into_iter().map(Into::into));
        self
    }


    pub fn unless(mut self, predicate: Option<Predicate>) -> Self {
        self.unless = predicate;
        self
    }


    pub fn matches(&self, name: &str) -> bool {
        name.starts_with(&self.prefix)
            && !self
                .excluding
                .iter()
                .any(|longer| longer.len() > self.prefix.len() && name.starts_with(longer.as_str()))
    }
}
