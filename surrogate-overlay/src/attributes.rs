/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 05/03/2024
Last Modified: 18/07/2024
License: MIT
*/

//! Typed attribute columns carried alongside a polygon set, one row per shape.

/// The declared type of an attribute column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeKind {
    Int,
    Double,
    Str,
}

/// One attribute value; the variant matches the column's declared kind.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Int(i32),
    Double(f64),
    Str(String),
}

impl AttributeValue {
    /// Numeric view used by the weighted aggregations; a string weighs 1.
    pub fn as_f64(&self) -> f64 {
        match self {
            AttributeValue::Int(v) => *v as f64,
            AttributeValue::Double(v) => *v,
            AttributeValue::Str(_) => 1f64,
        }
    }

    pub fn as_string(&self) -> String {
        match self {
            AttributeValue::Int(v) => format!("{}", v),
            AttributeValue::Double(v) => format!("{}", v),
            AttributeValue::Str(v) => v.clone(),
        }
    }
}

/// Descriptor for one attribute column. `category` carries the surrogate
/// code the column was registered under by the caller.
#[derive(Clone, Debug)]
pub struct AttributeDesc {
    pub name: String,
    pub kind: AttributeKind,
    pub category: i32,
}

/// Column descriptors plus one value row per shape in the owning set.
#[derive(Clone, Debug, Default)]
pub struct AttributeTable {
    pub descs: Vec<AttributeDesc>,
    pub rows: Vec<Vec<AttributeValue>>,
}

impl AttributeTable {
    pub fn num_attributes(&self) -> usize {
        self.descs.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Index of the named column, if present. Names match exactly.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.descs.iter().position(|d| d.name == name)
    }
}

#[cfg(test)]
mod test {
    use super::{AttributeDesc, AttributeKind, AttributeTable, AttributeValue};

    #[test]
    fn test_value_conversions() {
        assert_eq!(AttributeValue::Int(42).as_f64(), 42f64);
        assert_eq!(AttributeValue::Double(2.5).as_f64(), 2.5f64);
        assert_eq!(AttributeValue::Str("urban".to_string()).as_f64(), 1f64);
        assert_eq!(AttributeValue::Int(-7).as_string(), "-7");
        assert_eq!(AttributeValue::Str("37001".to_string()).as_string(), "37001");
    }

    #[test]
    fn test_find_column() {
        let table = AttributeTable {
            descs: vec![
                AttributeDesc {
                    name: "FIPS".to_string(),
                    kind: AttributeKind::Str,
                    category: 0,
                },
                AttributeDesc {
                    name: "POP2000".to_string(),
                    kind: AttributeKind::Double,
                    category: 1,
                },
            ],
            rows: vec![],
        };
        assert_eq!(table.find("POP2000"), Some(1));
        assert_eq!(table.find("pop2000"), None);
        assert_eq!(table.num_attributes(), 2);
    }
}
