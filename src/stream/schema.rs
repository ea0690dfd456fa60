//! Column schemas and bounded-sample type intuition.
//!
//! When a resource has no previously generated schema, the builder samples
//! the head of its row stream and narrows each column to the most specific
//! type every non-empty sampled value satisfies.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

/// Resolved column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColType {
    Bool,
    Integer,
    Number,
    Date,
    Datetime,
    Text,
}

impl ColType {
    /// Whether a raw value is castable to this type. Empty values always
    /// pass (treated as null).
    pub fn accepts(&self, value: &str) -> bool {
        let v = value.trim();
        if v.is_empty() {
            return true;
        }
        match self {
            Self::Bool => matches!(
                v.to_ascii_lowercase().as_str(),
                "true" | "false" | "t" | "f" | "yes" | "no" | "0" | "1"
            ),
            Self::Integer => v.parse::<i64>().is_ok(),
            Self::Number => v.parse::<f64>().is_ok(),
            Self::Date => NaiveDate::parse_from_str(v, "%Y-%m-%d").is_ok(),
            Self::Datetime => {
                NaiveDateTime::parse_from_str(v, "%Y-%m-%dT%H:%M:%S").is_ok()
                    || NaiveDateTime::parse_from_str(v, "%Y-%m-%d %H:%M:%S").is_ok()
            }
            Self::Text => true,
        }
    }

    /// Normalized rendering of a castable value (canonical integer/float
    /// form, lowercase booleans); returns the trimmed input for text.
    pub fn normalize(&self, value: &str) -> String {
        let v = value.trim();
        if v.is_empty() {
            return String::new();
        }
        match self {
            Self::Bool => match v.to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "1" => "true".to_string(),
                _ => "false".to_string(),
            },
            Self::Integer => v
                .parse::<i64>()
                .map(|i| i.to_string())
                .unwrap_or_else(|_| v.to_string()),
            Self::Number => v
                .parse::<f64>()
                .map(|f| f.to_string())
                .unwrap_or_else(|_| v.to_string()),
            Self::Date | Self::Datetime | Self::Text => v.to_string(),
        }
    }
}

impl fmt::Display for ColType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Bool => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Text => "text",
        };
        f.write_str(tag)
    }
}

impl FromStr for ColType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "boolean" | "bool" => Ok(Self::Bool),
            "integer" | "int" => Ok(Self::Integer),
            "number" | "float" => Ok(Self::Number),
            "date" => Ok(Self::Date),
            "datetime" => Ok(Self::Datetime),
            "text" | "string" => Ok(Self::Text),
            other => Err(format!("unknown column type `{other}`")),
        }
    }
}

/// One schema column: header name and resolved type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaColumn {
    pub name: String,
    pub datatype: ColType,
}

/// An ordered list of (header, resolved type) pairs for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    pub columns: Vec<SchemaColumn>,
}

impl Schema {
    /// Build from `(name, datatype)` pairs; unparsable types fall back to
    /// text rather than failing the resource.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        let columns = pairs
            .into_iter()
            .map(|(name, ty)| SchemaColumn {
                name: name.as_ref().to_string(),
                datatype: ty.as_ref().parse().unwrap_or(ColType::Text),
            })
            .collect();
        Self { columns }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Candidate narrowing order, most specific first.
const CANDIDATES: &[ColType] = &[
    ColType::Bool,
    ColType::Integer,
    ColType::Number,
    ColType::Date,
    ColType::Datetime,
];

/// Infer a schema from up to N sampled rows.
///
/// Each column resolves to the first candidate type every non-empty
/// sampled value accepts, falling back to text.
pub fn intuit(headers: &[String], sample: &[Vec<String>]) -> Schema {
    let columns = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let values = sample.iter().filter_map(|row| row.get(idx));
            let datatype = resolve_column(values);
            SchemaColumn {
                name: name.clone(),
                datatype,
            }
        })
        .collect();
    Schema { columns }
}

fn resolve_column<'a, I>(values: I) -> ColType
where
    I: Iterator<Item = &'a String> + Clone,
{
    let mut saw_value = false;
    for candidate in CANDIDATES {
        let mut ok = true;
        for v in values.clone() {
            if v.trim().is_empty() {
                continue;
            }
            saw_value = true;
            if !candidate.accepts(v) {
                ok = false;
                break;
            }
        }
        if ok && saw_value {
            return *candidate;
        }
    }
    ColType::Text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(cells: &[&[&str]]) -> Vec<Vec<String>> {
        cells
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_intuit_narrows_types() {
        let headers: Vec<String> = ["id", "score", "day", "label"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let sample = rows(&[
            &["1", "3.5", "2024-01-02", "ada"],
            &["2", "4", "2024-02-03", "grace"],
            &["3", "", "2024-03-04", "42"],
        ]);
        let schema = intuit(&headers, &sample);
        let types: Vec<ColType> = schema.columns.iter().map(|c| c.datatype).collect();
        assert_eq!(
            types,
            [ColType::Integer, ColType::Number, ColType::Date, ColType::Text]
        );
    }

    #[test]
    fn test_all_empty_column_is_text() {
        let headers = vec!["blank".to_string()];
        let sample = rows(&[&[""], &[""]]);
        let schema = intuit(&headers, &sample);
        assert_eq!(schema.columns[0].datatype, ColType::Text);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(ColType::Integer.normalize(" 007 "), "7");
        assert_eq!(ColType::Bool.normalize("Yes"), "true");
        assert_eq!(ColType::Text.normalize(" x "), "x");
    }

    #[test]
    fn test_from_pairs_falls_back_to_text() {
        let schema = Schema::from_pairs(vec![("a", "integer"), ("b", "mystery")]);
        assert_eq!(schema.columns[0].datatype, ColType::Integer);
        assert_eq!(schema.columns[1].datatype, ColType::Text);
    }
}
