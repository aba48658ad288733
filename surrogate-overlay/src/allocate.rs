/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 07/05/2024
Last Modified: 02/04/2025
License: MIT
*/

//! Attribute allocation: carries input attributes onto a set of output
//! polygons, one column per allocated attribute, using the processing mode
//! registered for each attribute name.

use crate::aggregate::{avg1, discrete_centroid, discrete_overlap, sum1, type_area_percent};
use crate::attributes::{AttributeKind, AttributeValue};
use crate::modes::{AllocationMode, ModeTable};
use crate::poly_set::PolySet;
use std::io::{Error, ErrorKind};
use std::sync::Arc;
use surrogate_vector::{AttributeField, FieldData, FieldDataType, ShapeType, Shapefile};

fn field_value(value: &AttributeValue) -> FieldData {
    match value {
        AttributeValue::Int(v) => FieldData::Int(*v),
        AttributeValue::Double(v) => FieldData::Real(*v),
        AttributeValue::Str(v) => FieldData::Text(v.clone()),
    }
}

fn missing_value(kind: AttributeKind) -> FieldData {
    match kind {
        AttributeKind::Int => FieldData::Int(-9999),
        AttributeKind::Double => FieldData::Real(-9999f64),
        AttributeKind::Str => FieldData::Text(String::new()),
    }
}

/// Writes a copy of the output polygon file extended with one column per
/// allocated input attribute. `derived` is the overlay of the input shapes
/// with the output polygons; `input_set` and `data_set` are the two sets it
/// was derived from, with `data_set` read record-for-record from
/// `data_file`. Attributes whose name carries no registered mode are
/// reported and left out.
pub fn write_allocation(
    derived: &PolySet,
    input_set: &Arc<PolySet>,
    data_set: &Arc<PolySet>,
    input_file: &Shapefile,
    data_file: &Shapefile,
    pass_through: &[String],
    modes: &ModeTable,
    output_path: &str,
) -> Result<(), Error> {
    let input_table = input_set.attributes.as_ref().ok_or_else(|| {
        Error::new(ErrorKind::InvalidInput, "The input shapes carry no attributes.")
    })?;
    if data_file.header.shape_type.base_shape_type() != ShapeType::Polygon {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "The allocation output file must be built from polygons.",
        ));
    }
    if data_set.num_shapes() != data_file.num_records {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "The output polygons and their shapefile records disagree.",
        ));
    }

    let mut output = Shapefile::initialize_using_file(
        output_path,
        data_file,
        data_file.header.shape_type,
        false,
    )?;

    let mut pass_fields: Vec<usize> = Vec::with_capacity(pass_through.len());
    for name in pass_through {
        let field_num = data_file.attributes.get_field_num(name).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("Attribute {} was not located in the output polygon file.", name),
            )
        })?;
        output
            .attributes
            .add_field(&data_file.attributes.get_field(field_num).clone());
        pass_fields.push(field_num);
    }

    // the winner arrays are shared by every column using a discrete mode
    let needs_overlap = input_table
        .descs
        .iter()
        .any(|d| modes.mode_for(&d.name) == AllocationMode::DiscreteOverlap);
    let needs_centroid = input_table
        .descs
        .iter()
        .any(|d| modes.mode_for(&d.name) == AllocationMode::DiscreteCentroid);
    let overlap_winners = if needs_overlap {
        Some(discrete_overlap(derived)?)
    } else {
        None
    };
    let centroid_winners = if needs_centroid {
        Some(discrete_centroid(data_set, input_set)?)
    } else {
        None
    };

    let mut columns: Vec<Vec<FieldData>> = vec![];
    for (a, desc) in input_table.descs.iter().enumerate() {
        let mode = modes.mode_for(&desc.name);
        match mode {
            AllocationMode::NotFound => {
                println!(
                    "WARNING: Attribute {} is not in the allocation mode list; it will not be allocated.",
                    desc.name
                );
            }
            AllocationMode::Aggregate | AllocationMode::Average => {
                if desc.kind == AttributeKind::Str {
                    return Err(Error::new(
                        ErrorKind::InvalidInput,
                        format!(
                            "Cannot aggregate or average the string attribute {}.",
                            desc.name
                        ),
                    ));
                }
                let sums = if mode == AllocationMode::Aggregate {
                    sum1(derived, Some(a))?
                } else {
                    avg1(derived, Some(a))?
                };
                output.attributes.add_field(&AttributeField::new(
                    &desc.name,
                    FieldDataType::Real,
                    20u8,
                    5u8,
                ));
                columns.push(sums.into_iter().map(FieldData::Real).collect());
            }
            AllocationMode::DiscreteOverlap | AllocationMode::DiscreteCentroid => {
                let winners = if mode == AllocationMode::DiscreteOverlap {
                    overlap_winners.as_deref()
                } else {
                    centroid_winners.as_deref()
                };
                let winners = match winners {
                    Some(w) => w,
                    None => continue,
                };
                let field_num = input_file.attributes.get_field_num(&desc.name).ok_or_else(
                    || {
                        Error::new(
                            ErrorKind::InvalidInput,
                            format!("Attribute {} was not located in the input file.", desc.name),
                        )
                    },
                )?;
                output
                    .attributes
                    .add_field(&input_file.attributes.get_field(field_num).clone());
                columns.push(
                    winners
                        .iter()
                        .map(|&w| {
                            if w < 0 {
                                missing_value(desc.kind)
                            } else {
                                field_value(&input_table.rows[w as usize][a])
                            }
                        })
                        .collect(),
                );
            }
            AllocationMode::AreaPercent => {
                let mut types: Vec<String> = vec![];
                for row in &input_table.rows {
                    let label = row[a].as_string();
                    if !types.contains(&label) {
                        types.push(label);
                    }
                }
                let fractions = type_area_percent(derived, a, &types)?;
                for (t, label) in types.iter().enumerate() {
                    output.attributes.add_field(&AttributeField::new(
                        label,
                        FieldDataType::Real,
                        20u8,
                        5u8,
                    ));
                    columns.push(fractions[t].iter().map(|&v| FieldData::Real(v)).collect());
                }
            }
        }
    }

    for r in 0..data_file.num_records {
        output.add_record(data_file.get_record(r).clone());
        let mut row: Vec<FieldData> = Vec::with_capacity(pass_fields.len() + columns.len());
        for &f in &pass_fields {
            row.push(data_file.attributes.get_field_value(r, f));
        }
        for column in &columns {
            row.push(column[r].clone());
        }
        output.attributes.add_record(row, false);
    }
    output.write()?;
    Ok(())
}
