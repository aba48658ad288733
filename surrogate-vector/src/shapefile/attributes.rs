/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 12/05/2023
Last Modified: 03/02/2025
License: MIT

Notes: Structures for the shapefile attribute table contained in the
associated .dbf file.
*/
use std::fmt;

#[derive(Debug, Default, Clone)]
pub struct AttributeHeader {
    pub version: u8,
    pub year: u32,
    pub month: u8,
    pub day: u8,
    pub num_records: u32,
    pub num_fields: u32, // not actually stored in file but derived
    pub bytes_in_header: u16,
    pub bytes_in_record: u16,
    pub incomplete_transaction: u8,
    pub encryption_flag: u8,
    pub mdx_flag: u8,
    pub language_driver_id: u8,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DateData {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl fmt::Display for DateData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04}{:02}{:02}", self.year, self.month, self.day)
    }
}

/// One attribute value of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    Int(i32),
    Real(f64),
    Text(String),
    Date(DateData),
    Bool(bool),
    Null,
}

/// The logical type of an attribute field, mapped onto the dBASE
/// field-type characters on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDataType {
    Int,
    Real,
    Text,
    Date,
    Bool,
}

impl FieldDataType {
    pub fn to_char(&self) -> char {
        match self {
            FieldDataType::Int => 'N',
            FieldDataType::Real => 'F',
            FieldDataType::Text => 'C',
            FieldDataType::Date => 'D',
            FieldDataType::Bool => 'L',
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct AttributeField {
    pub name: String,
    pub field_type: char,
    pub field_length: u8,
    pub decimal_count: u8,
}

impl AttributeField {
    pub fn new(
        name: &str,
        field_type: FieldDataType,
        field_length: u8,
        decimal_count: u8,
    ) -> AttributeField {
        AttributeField {
            name: name.to_string(),
            field_type: field_type.to_char(),
            field_length,
            decimal_count,
        }
    }
}

#[derive(Default, Clone)]
pub struct ShapefileAttributes {
    pub header: AttributeHeader,
    pub fields: Vec<AttributeField>,
    data: Vec<Vec<FieldData>>,
    pub is_deleted: Vec<bool>,
}

impl ShapefileAttributes {
    pub fn add_field(&mut self, field: &AttributeField) {
        self.fields.push(field.clone());
        self.header.num_fields = self.fields.len() as u32;
    }

    pub fn get_num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn get_field(&self, index: usize) -> &AttributeField {
        if index >= self.fields.len() {
            panic!("Error: Specified field is greater than the number of fields.");
        }
        &self.fields[index]
    }

    pub fn get_field_num(&self, name: &str) -> Option<usize> {
        for i in 0..self.fields.len() {
            if self.fields[i].name == name {
                return Some(i);
            }
        }
        None
    }

    pub fn add_record(&mut self, rec: Vec<FieldData>, deleted: bool) {
        self.data.push(rec);
        self.is_deleted.push(deleted);
        self.header.num_records = self.data.len() as u32;
    }

    pub fn get_record(&self, index: usize) -> Vec<FieldData> {
        if index >= self.data.len() {
            panic!("Error: Specified record index is greater than the number of records.");
        }
        self.data[index].clone()
    }

    pub fn get_value(&self, record_index: usize, field_name: &str) -> FieldData {
        match self.get_field_num(field_name) {
            Some(field_index) => self.data[record_index][field_index].clone(),
            None => FieldData::Null,
        }
    }

    pub fn get_field_value(&self, record_index: usize, field_index: usize) -> FieldData {
        self.data[record_index][field_index].clone()
    }
}

#[cfg(test)]
mod test {
    use super::{AttributeField, FieldData, FieldDataType, ShapefileAttributes};

    #[test]
    fn test_field_lookup_and_values() {
        let mut attributes = ShapefileAttributes::default();
        attributes.add_field(&AttributeField::new("FIPS", FieldDataType::Text, 5u8, 0u8));
        attributes.add_field(&AttributeField::new("POP", FieldDataType::Real, 20u8, 5u8));
        assert_eq!(attributes.get_num_fields(), 2);
        assert_eq!(attributes.get_field_num("POP"), Some(1));
        assert_eq!(attributes.get_field_num("HOUSEHOLDS"), None);

        attributes.add_record(
            vec![
                FieldData::Text("37001".to_string()),
                FieldData::Real(10523.0),
            ],
            false,
        );
        assert_eq!(attributes.header.num_records, 1);
        assert_eq!(
            attributes.get_value(0, "FIPS"),
            FieldData::Text("37001".to_string())
        );
        assert_eq!(attributes.get_value(0, "POP"), FieldData::Real(10523.0));
        assert_eq!(attributes.get_value(0, "MISSING"), FieldData::Null);
    }

    #[test]
    fn test_field_type_chars() {
        assert_eq!(FieldDataType::Int.to_char(), 'N');
        assert_eq!(FieldDataType::Real.to_char(), 'F');
        assert_eq!(FieldDataType::Text.to_char(), 'C');
        assert_eq!(FieldDataType::Date.to_char(), 'D');
        assert_eq!(FieldDataType::Bool.to_char(), 'L');
    }
}
