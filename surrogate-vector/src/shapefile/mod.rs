/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 12/05/2023
Last Modified: 03/02/2025
License: MIT

Notes: The logic behind working with the ESRI Shapefile format.
*/

pub mod attributes;
pub mod geometry;

use self::attributes::*;
use self::geometry::*;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use chrono::prelude::*;
use std::fmt;
use std::fs;
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter, Cursor, Error, ErrorKind};
use std::path::Path;
use surrogate_common::structures::Point2D;
use surrogate_common::utils::{ByteOrderReader, Endianness};

#[derive(Debug, Default, Clone)]
pub struct ShapefileHeader {
    file_code: i32, // BigEndian; value is 9994
    pub file_length: i32,      // BigEndian
    pub version: i32,          // LittleEndian
    pub shape_type: ShapeType, // LittleEndian
    pub x_min: f64,            // LittleEndian
    pub y_min: f64,            // LittleEndian
    pub x_max: f64,            // LittleEndian
    pub y_max: f64,            // LittleEndian
    pub z_min: f64,            // LittleEndian; set to 0f64 if shapeType not z or measured
    pub z_max: f64,            // LittleEndian; set to 0f64 if shapeType not z or measured
    pub m_min: f64,            // LittleEndian; set to 0f64 if shapeType not z or measured
    pub m_max: f64,            // LittleEndian; set to 0f64 if shapeType not z or measured
}

impl fmt::Display for ShapefileHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "file_code: {}\nfile_length: {}\nversion: {}\nshape_type: {}\nextent: ({}, {}) - ({}, {})",
            self.file_code,
            self.file_length,
            self.version,
            self.shape_type,
            self.x_min,
            self.y_min,
            self.x_max,
            self.y_max
        )
    }
}

/// `Shapefile` is an in-memory ESRI Shapefile.
///
/// Examples:
///
/// ```no_run
/// # use surrogate_vector::{AttributeField, FieldDataType, ShapeType, Shapefile};
/// # fn main() -> Result<(), std::io::Error> {
/// # let input_file = "input.shp";
/// # let output_file = "output.shp";
/// // Read a Shapefile from a file.
/// let input = Shapefile::read(&input_file)?;
///
/// // Create a new output Shapefile
/// let mut output = Shapefile::initialize_using_file(&output_file, &input, ShapeType::Polygon, true)?;
///
/// // add attributes
/// let fid = AttributeField::new("FID", FieldDataType::Int, 7u8, 0u8);
/// let val = AttributeField::new("Value", FieldDataType::Real, 12u8, 4u8);
/// output.attributes.add_field(&fid);
/// output.attributes.add_field(&val);
/// # Ok(())
/// # }
/// ```
#[derive(Default, Clone)]
pub struct Shapefile {
    pub file_name: String,
    pub file_mode: String,
    pub header: ShapefileHeader,
    pub num_records: usize,
    pub records: Vec<ShapefileGeometry>,
    pub attributes: ShapefileAttributes,
    pub projection: String,
}

impl Shapefile {
    pub fn read(file_name: &str) -> Result<Shapefile, Error> {
        let mut sf = Shapefile {
            file_name: file_name.to_string(),
            file_mode: "r".to_string(),
            ..Default::default()
        };
        sf.read_file()?;
        Ok(sf)
    }

    pub fn new(file_name: &str, file_type: ShapeType) -> Result<Shapefile, Error> {
        let new_file_name = if file_name.contains(".") {
            file_name.to_string()
        } else {
            // likely no extension provided; default to .shp
            format!("{}.shp", file_name)
        };
        let mut sf = Shapefile {
            file_name: new_file_name,
            file_mode: "w".to_string(),
            ..Default::default()
        };
        sf.header.shape_type = file_type;
        Ok(sf)
    }

    pub fn initialize_using_file(
        file_name: &str,
        other: &Shapefile,
        shape_type: ShapeType,
        copy_fields: bool,
    ) -> Result<Shapefile, Error> {
        let new_file_name = if file_name.contains(".") {
            file_name.to_string()
        } else {
            // likely no extension provided; default to .shp
            format!("{}.shp", file_name)
        };

        let mut sf = Shapefile {
            file_name: new_file_name,
            file_mode: "w".to_string(),
            projection: other.projection.clone(),
            ..Default::default()
        };
        sf.header.shape_type = shape_type;
        if copy_fields {
            sf.attributes.fields = other.attributes.fields.clone();
            sf.attributes.header.num_fields = sf.attributes.fields.len() as u32;
        }
        Ok(sf)
    }

    /// Returns the ShapefileGeometry for a specified index, starting at zero.
    pub fn get_record(&self, index: usize) -> &ShapefileGeometry {
        if index >= self.records.len() {
            panic!("Record index out of bounds");
        }
        &self.records[index]
    }

    /// Adds a new ShapefileGeometry.
    pub fn add_record(&mut self, geometry: ShapefileGeometry) {
        if self.file_mode == "r" {
            panic!("The file was opened in read-only mode.");
        }
        if geometry.shape_type == self.header.shape_type {
            self.records.push(geometry);
            self.num_records += 1;
        } else {
            panic!("Attempt to add a ShapefileGeometry record of the wrong ShapeType.");
        }
    }

    /// Adds a new Point record.
    pub fn add_point_record(&mut self, x: f64, y: f64) {
        if self.file_mode == "r" {
            panic!("The file was opened in read-only mode.");
        }
        if self.header.shape_type == ShapeType::Point {
            let mut sfg = ShapefileGeometry::new(ShapeType::Point);
            sfg.add_point(Point2D { x, y });
            self.records.push(sfg);
            self.num_records += 1;
        } else {
            panic!("Attempt to add a ShapefileGeometry record of the wrong ShapeType.");
        }
    }

    fn read_file(&mut self) -> Result<(), Error> {
        ///////////////////////////////
        // First read the geometries //
        ///////////////////////////////
        let buffer = fs::read(&self.file_name)?;

        // Note: the shapefile format uses mixed endianness for whatever reason.
        // The ByteOrderReader was set up to have one consistent endianness. As
        // such, we will need to switch the endianness frequently.
        let mut bor =
            ByteOrderReader::<Cursor<Vec<u8>>>::new(Cursor::new(buffer), Endianness::BigEndian);

        self.header.file_code = bor.read_i32()?;
        bor.seek(24);
        self.header.file_length = bor.read_i32()?;

        // the rest of the header is in LittleEndian format
        bor.set_byte_order(Endianness::LittleEndian);
        self.header.version = bor.read_i32()?;
        self.header.shape_type = ShapeType::from_int(bor.read_i32()?);

        // bounding box
        self.header.x_min = bor.read_f64()?;
        self.header.y_min = bor.read_f64()?;
        self.header.x_max = bor.read_f64()?;
        self.header.y_max = bor.read_f64()?;
        self.header.z_min = bor.read_f64()?;
        self.header.z_max = bor.read_f64()?;
        self.header.m_min = bor.read_f64()?;
        self.header.m_max = bor.read_f64()?;

        // Read the records; measured and 3-D payloads beyond the x-y data
        // are skipped by seeking to each record's end.
        while bor.pos() < self.header.file_length as usize * 2 {
            bor.set_byte_order(Endianness::BigEndian);
            let _record_number = bor.read_i32()?;
            let content_length = bor.read_i32()?; // in 16-bit words
            let record_end = bor.pos() + content_length as usize * 2;

            bor.set_byte_order(Endianness::LittleEndian);
            let record_shape_type = ShapeType::from_int(bor.read_i32()?);
            let base_type = record_shape_type.base_shape_type();
            let mut sfg = ShapefileGeometry::new(base_type);
            match base_type {
                ShapeType::Null => {}
                ShapeType::Point => {
                    let x = bor.read_f64()?;
                    let y = bor.read_f64()?;
                    sfg.add_point(Point2D { x, y });
                }
                ShapeType::PolyLine | ShapeType::Polygon => {
                    sfg.x_min = bor.read_f64()?;
                    sfg.y_min = bor.read_f64()?;
                    sfg.x_max = bor.read_f64()?;
                    sfg.y_max = bor.read_f64()?;
                    sfg.num_parts = bor.read_i32()?;
                    sfg.num_points = bor.read_i32()?;
                    for _ in 0..sfg.num_parts {
                        sfg.parts.push(bor.read_i32()?);
                    }
                    for _ in 0..sfg.num_points {
                        let x = bor.read_f64()?;
                        let y = bor.read_f64()?;
                        sfg.points.push(Point2D { x, y });
                    }
                }
                ShapeType::MultiPoint => {
                    sfg.x_min = bor.read_f64()?;
                    sfg.y_min = bor.read_f64()?;
                    sfg.x_max = bor.read_f64()?;
                    sfg.y_max = bor.read_f64()?;
                    sfg.num_points = bor.read_i32()?;
                    for _ in 0..sfg.num_points {
                        let x = bor.read_f64()?;
                        let y = bor.read_f64()?;
                        sfg.points.push(Point2D { x, y });
                    }
                }
                _ => unreachable!(),
            }
            bor.seek(record_end);
            self.records.push(sfg);
        }
        self.num_records = self.records.len();

        //////////////////////////////
        // Read the projection file //
        //////////////////////////////
        let prj_file = Path::new(&self.file_name)
            .with_extension("prj")
            .into_os_string()
            .into_string()
            .unwrap_or_default();
        match File::open(&prj_file) {
            Ok(f) => {
                let f = BufReader::new(f);
                for line in f.lines() {
                    let line_unwrapped = line?;
                    self.projection.push_str(&format!("{}\n", line_unwrapped));
                }
            }
            Err(_) => println!("Warning: Projection file not located."),
        }

        ///////////////////////////////
        // Read the attributes table //
        ///////////////////////////////
        let dbf_file = Path::new(&self.file_name)
            .with_extension("dbf")
            .into_os_string()
            .into_string()
            .unwrap_or_default();
        let buffer = fs::read(&dbf_file)?;
        let mut bor =
            ByteOrderReader::<Cursor<Vec<u8>>>::new(Cursor::new(buffer), Endianness::LittleEndian);

        self.attributes.header.version = bor.read_u8()?;
        self.attributes.header.year = 1900u32 + bor.read_u8()? as u32;
        self.attributes.header.month = bor.read_u8()?;
        self.attributes.header.day = bor.read_u8()?;
        self.attributes.header.num_records = bor.read_u32()?;
        self.attributes.header.bytes_in_header = bor.read_u16()?;
        self.attributes.header.bytes_in_record = bor.read_u16()?;
        // reserved bytes
        bor.inc_pos(2);
        self.attributes.header.incomplete_transaction = bor.read_u8()?;
        self.attributes.header.encryption_flag = bor.read_u8()?;
        // skip free record thread for LAN only
        bor.inc_pos(4);
        // reserved for multi-user dBASE in dBASE III+
        bor.inc_pos(8);
        self.attributes.header.mdx_flag = bor.read_u8()?;
        self.attributes.header.language_driver_id = bor.read_u8()?;
        // reserved bytes
        bor.inc_pos(2);

        // read the field descriptors
        self.attributes.fields = vec![];
        let mut flag = true;
        while flag {
            let name = bor.read_utf8(11).replace(char::from(0), "");
            let field_type = char::from(bor.read_u8()?);
            bor.inc_pos(4);
            let field_length = bor.read_u8()?;
            let decimal_count = bor.read_u8()?;
            bor.inc_pos(14);

            let field_data = AttributeField {
                name,
                field_type,
                field_length,
                decimal_count,
            };
            self.attributes.add_field(&field_data);

            // Checks for end of field descriptor array (0x0d). Valid .dbf files
            // will have this flag.
            if bor.peek_u8()? == 0x0d {
                flag = false;
            }
        }
        self.attributes.header.num_fields = self.attributes.fields.len() as u32;
        bor.inc_pos(1);

        let num_records = self.attributes.header.num_records;
        let mut d: bool;
        let mut str_rep: String;
        for _ in 0..num_records {
            d = bor.read_u8()? as u32 == 0x2A;
            let mut r: Vec<FieldData> = vec![];
            for j in 0..self.attributes.header.num_fields {
                str_rep = bor
                    .read_utf8(self.attributes.fields[j as usize].field_length as usize)
                    .replace(char::from(0), "")
                    .replace("*", "")
                    .trim()
                    .to_string();
                if str_rep.replace(" ", "").replace("?", "").is_empty() {
                    r.push(FieldData::Null);
                } else {
                    match self.attributes.fields[j as usize].field_type {
                        'N' | 'F' | 'I' | 'O' => {
                            if self.attributes.fields[j as usize].decimal_count == 0 {
                                r.push(FieldData::Int(str_rep.parse::<i32>().unwrap_or(0)));
                            } else {
                                r.push(FieldData::Real(str_rep.parse::<f64>().unwrap_or(0f64)));
                            }
                        }
                        'D' => {
                            if str_rep.len() == 8 {
                                r.push(FieldData::Date(DateData {
                                    year: str_rep[0..4].parse::<u16>().unwrap_or(0),
                                    month: str_rep[4..6].parse::<u8>().unwrap_or(0),
                                    day: str_rep[6..8].parse::<u8>().unwrap_or(0),
                                }));
                            } else {
                                r.push(FieldData::Null);
                            }
                        }
                        'L' => {
                            if str_rep.to_lowercase().contains("t") {
                                r.push(FieldData::Bool(true));
                            } else {
                                r.push(FieldData::Bool(false));
                            }
                        }
                        _ => {
                            // treat it like a string
                            r.push(FieldData::Text(str_rep.clone()));
                        }
                    }
                }
            }
            self.attributes.add_record(r, d);
        }

        Ok(())
    }

    pub fn write(&mut self) -> Result<(), Error> {
        if self.file_mode == "r" {
            return Err(Error::new(
                ErrorKind::Other,
                "The file was opened in read-only mode.",
            ));
        }

        self.num_records = self.records.len(); // make sure they are the same.
        if self.num_records == 0 {
            return Err(Error::new(
                ErrorKind::Other,
                "The file does not currently contain any record data.",
            ));
        }

        match self.header.shape_type {
            ShapeType::Null
            | ShapeType::Point
            | ShapeType::PolyLine
            | ShapeType::Polygon
            | ShapeType::MultiPoint => (),
            _ => {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    "Writing of measured and 3-D shape types is not supported.",
                ));
            }
        }

        /////////////////////////////////////////
        // Write the geometry data (.shp file) //
        /////////////////////////////////////////
        let f = File::create(&self.file_name)?;
        let mut writer = BufWriter::new(f);

        // magic number
        writer.write_i32::<BigEndian>(9994i32)?;

        // unused header bytes
        for _ in 0..5 {
            writer.write_i32::<BigEndian>(0i32)?;
        }

        // file size
        let mut size = 100i32; // initialized to the size of the file header
        for i in 0..self.num_records {
            size += 8 + self.records[i].get_length();
        }
        let file_length = size / 2i32; // in 16-bit words
        writer.write_i32::<BigEndian>(file_length)?;

        // version
        writer.write_i32::<LittleEndian>(1000i32)?;

        // shape type
        writer.write_i32::<LittleEndian>(self.header.shape_type.to_int())?;

        // extent
        self.calculate_extent();
        writer.write_f64::<LittleEndian>(self.header.x_min)?;
        writer.write_f64::<LittleEndian>(self.header.y_min)?;
        writer.write_f64::<LittleEndian>(self.header.x_max)?;
        writer.write_f64::<LittleEndian>(self.header.y_max)?;
        writer.write_f64::<LittleEndian>(self.header.z_min)?;
        writer.write_f64::<LittleEndian>(self.header.z_max)?;
        writer.write_f64::<LittleEndian>(self.header.m_min)?;
        writer.write_f64::<LittleEndian>(self.header.m_max)?;

        // write the geometries
        match self.header.shape_type {
            ShapeType::Null => {
                for i in 0..self.num_records {
                    writer.write_i32::<BigEndian>(i as i32 + 1i32)?; // Record number
                    writer.write_i32::<BigEndian>(self.records[i].get_length() / 2)?; // Content length in 16-bit words
                    writer.write_i32::<LittleEndian>(0i32)?; // Shape type
                }
            }
            ShapeType::Point => {
                for i in 0..self.num_records {
                    writer.write_i32::<BigEndian>(i as i32 + 1i32)?; // Record number
                    writer.write_i32::<BigEndian>(self.records[i].get_length() / 2)?; // Content length in 16-bit words
                    writer.write_i32::<LittleEndian>(self.records[i].shape_type.to_int())?; // Shape type

                    if self.records[i].shape_type != ShapeType::Null {
                        writer.write_f64::<LittleEndian>(self.records[i].points[0].x)?;
                        writer.write_f64::<LittleEndian>(self.records[i].points[0].y)?;
                    }
                }
            }
            ShapeType::PolyLine | ShapeType::Polygon => {
                for i in 0..self.num_records {
                    writer.write_i32::<BigEndian>(i as i32 + 1i32)?; // Record number
                    writer.write_i32::<BigEndian>(self.records[i].get_length() / 2)?; // Content length in 16-bit words
                    writer.write_i32::<LittleEndian>(self.records[i].shape_type.to_int())?; // Shape type

                    if self.records[i].shape_type != ShapeType::Null {
                        // extent
                        writer.write_f64::<LittleEndian>(self.records[i].x_min)?;
                        writer.write_f64::<LittleEndian>(self.records[i].y_min)?;
                        writer.write_f64::<LittleEndian>(self.records[i].x_max)?;
                        writer.write_f64::<LittleEndian>(self.records[i].y_max)?;

                        writer.write_i32::<LittleEndian>(self.records[i].num_parts)?; // Num parts
                        writer.write_i32::<LittleEndian>(self.records[i].num_points)?; // Num points

                        // parts
                        for part in &self.records[i].parts {
                            writer.write_i32::<LittleEndian>(*part)?;
                        }

                        // points
                        for pt in &self.records[i].points {
                            writer.write_f64::<LittleEndian>(pt.x)?;
                            writer.write_f64::<LittleEndian>(pt.y)?;
                        }
                    }
                }
            }
            ShapeType::MultiPoint => {
                for i in 0..self.num_records {
                    writer.write_i32::<BigEndian>(i as i32 + 1i32)?; // Record number
                    writer.write_i32::<BigEndian>(self.records[i].get_length() / 2)?; // Content length in 16-bit words
                    writer.write_i32::<LittleEndian>(self.records[i].shape_type.to_int())?; // Shape type

                    if self.records[i].shape_type != ShapeType::Null {
                        // extent
                        writer.write_f64::<LittleEndian>(self.records[i].x_min)?;
                        writer.write_f64::<LittleEndian>(self.records[i].y_min)?;
                        writer.write_f64::<LittleEndian>(self.records[i].x_max)?;
                        writer.write_f64::<LittleEndian>(self.records[i].y_max)?;

                        writer.write_i32::<LittleEndian>(self.records[i].num_points)?; // Num points

                        // points
                        for pt in &self.records[i].points {
                            writer.write_f64::<LittleEndian>(pt.x)?;
                            writer.write_f64::<LittleEndian>(pt.y)?;
                        }
                    }
                }
            }
            _ => unreachable!(),
        }
        writer.flush()?;

        /////////////////////////////////
        // Write the index file (.shx) //
        /////////////////////////////////
        let index_file = Path::new(&self.file_name)
            .with_extension("shx")
            .into_os_string()
            .into_string()
            .unwrap_or_default();
        let f = File::create(&index_file)?;
        let mut writer = BufWriter::new(f);

        // magic number
        writer.write_i32::<BigEndian>(9994i32)?;

        // unused header bytes
        for _ in 0..5 {
            writer.write_i32::<BigEndian>(0i32)?;
        }

        let file_length = (100 + 8 * self.num_records) as i32 / 2i32; // in 16-bit words
        writer.write_i32::<BigEndian>(file_length)?;

        // version
        writer.write_i32::<LittleEndian>(1000i32)?;

        // shape type
        writer.write_i32::<LittleEndian>(self.header.shape_type.to_int())?;

        // extent
        writer.write_f64::<LittleEndian>(self.header.x_min)?;
        writer.write_f64::<LittleEndian>(self.header.y_min)?;
        writer.write_f64::<LittleEndian>(self.header.x_max)?;
        writer.write_f64::<LittleEndian>(self.header.y_max)?;
        writer.write_f64::<LittleEndian>(self.header.z_min)?;
        writer.write_f64::<LittleEndian>(self.header.z_max)?;
        writer.write_f64::<LittleEndian>(self.header.m_min)?;
        writer.write_f64::<LittleEndian>(self.header.m_max)?;

        let mut offset = 50i32; // measured in 16-bit words
        for i in 0..self.num_records {
            writer.write_i32::<BigEndian>(offset)?;
            let content_length = self.records[i].get_length() / 2;
            writer.write_i32::<BigEndian>(content_length)?;
            offset += 4 + content_length; // each record header is 4 words long
        }
        writer.flush()?;

        //////////////////////////////
        // Write the projection file //
        //////////////////////////////
        if !self.projection.is_empty() {
            let prj_file = Path::new(&self.file_name)
                .with_extension("prj")
                .into_os_string()
                .into_string()
                .unwrap_or_default();
            let f = File::create(&prj_file)?;
            let mut writer = BufWriter::new(f);
            writer.write_all(self.projection.as_bytes())?;
        }

        ///////////////////////////////
        // Write the attributes file //
        ///////////////////////////////
        let dbf_file = Path::new(&self.file_name)
            .with_extension("dbf")
            .into_os_string()
            .into_string()
            .unwrap_or_default();
        let f = File::create(&dbf_file)?;
        let mut writer = BufWriter::new(f);

        self.attributes.header.version = 3;
        writer.write_u8(3u8)?;

        // write the date
        let now = Local::now();
        writer.write_u8((now.year() - 1900) as u8)?;
        writer.write_u8(now.month() as u8)?;
        writer.write_u8(now.day() as u8)?;

        writer.write_u32::<LittleEndian>(self.attributes.header.num_records)?; // number of records
        let header_size = 32u16 + self.attributes.header.num_fields as u16 * 32u16 + 1u16;
        self.attributes.header.bytes_in_header = header_size;
        writer.write_u16::<LittleEndian>(header_size)?; // header size

        let mut bytes_in_record = 0u16;
        for field in &self.attributes.fields {
            bytes_in_record += field.field_length as u16;
        }
        bytes_in_record += 1; // the deletion flag
        self.attributes.header.bytes_in_record = bytes_in_record;
        writer.write_u16::<LittleEndian>(bytes_in_record)?; // bytes in record

        // reserved or unused bytes
        for _ in 0..20 {
            writer.write_u8(0u8)?;
        }

        // field descriptor array
        for field in &self.attributes.fields {
            let mut s = field.name.clone();
            if s.len() > 10 {
                s = field.name[0..10].to_string();
            }
            for _ in s.len()..11 {
                s.push(char::from(0));
            }
            writer.write_all(s.as_bytes())?;
            writer.write_u8(field.field_type as u8)?;

            for _ in 0..4 {
                writer.write_u8(0u8)?;
            }

            writer.write_u8(field.field_length)?;
            writer.write_u8(field.decimal_count)?;

            for _ in 0..14 {
                writer.write_u8(0u8)?;
            }
        }

        writer.write_u8(0x0D)?; // terminator byte

        // write records
        for i in 0..self.attributes.header.num_records as usize {
            if !self.attributes.is_deleted[i] {
                writer.write_u8(0x20)?;
            } else {
                writer.write_u8(0x2A)?;
            }
            let rec = self.attributes.get_record(i);
            for j in 0..self.attributes.header.num_fields {
                let fl = self.attributes.fields[j as usize].field_length as usize;
                match &rec[j as usize] {
                    FieldData::Null => {
                        let spcs: String = vec![' '; fl].into_iter().collect();
                        writer.write_all(spcs.as_bytes())?;
                    }
                    FieldData::Int(v) => {
                        let b = v.to_string();
                        if b.len() < fl {
                            let mut spcs: String = vec![' '; fl - b.len()].into_iter().collect();
                            spcs.push_str(&b);
                            writer.write_all(spcs.as_bytes())?;
                        } else if b.len() > fl {
                            writer.write_all(b[b.len() - fl..b.len()].as_bytes())?;
                        } else {
                            writer.write_all(b.as_bytes())?;
                        }
                    }
                    FieldData::Real(v) => {
                        let dc = self.attributes.fields[j as usize].decimal_count as usize;
                        let mut s = format!("{:.*}", dc, v);
                        if s.len() < fl {
                            let spcs: String = vec![' '; fl - s.len()].into_iter().collect();
                            s = format!("{}{}", spcs, s);
                        } else if s.len() > fl {
                            s.truncate(fl);
                        }
                        writer.write_all(s.as_bytes())?;
                    }
                    FieldData::Bool(v) => {
                        if *v {
                            writer.write_all("T".as_bytes())?;
                        } else {
                            writer.write_all("F".as_bytes())?;
                        }
                    }
                    FieldData::Date(v) => {
                        writer.write_all(format!("{}", v).as_bytes())?;
                    }
                    FieldData::Text(v) => {
                        if v.len() < fl {
                            let spcs: String = vec![' '; fl - v.len()].into_iter().collect();
                            writer.write_all((format!("{}{}", v, spcs)).as_bytes())?;
                        } else if v.len() > fl {
                            writer.write_all(v[0..fl].as_bytes())?;
                        } else {
                            writer.write_all(v.as_bytes())?;
                        }
                    }
                }
            }
        }

        writer.write_u8(0x1A)?; // file terminator byte
        writer.flush()?;

        Ok(())
    }

    fn calculate_extent(&mut self) {
        match self.header.shape_type.base_shape_type() {
            ShapeType::Null => {
                self.header.x_min = 0f64;
                self.header.x_max = 0f64;
                self.header.y_min = 0f64;
                self.header.y_max = 0f64;
            }
            ShapeType::Point => {
                let mut x_min = f64::INFINITY;
                let mut x_max = f64::NEG_INFINITY;
                let mut y_min = f64::INFINITY;
                let mut y_max = f64::NEG_INFINITY;
                for record in &self.records {
                    if record.shape_type != ShapeType::Null {
                        if record.points[0].x < x_min {
                            x_min = record.points[0].x;
                        }
                        if record.points[0].x > x_max {
                            x_max = record.points[0].x;
                        }
                        if record.points[0].y < y_min {
                            y_min = record.points[0].y;
                        }
                        if record.points[0].y > y_max {
                            y_max = record.points[0].y;
                        }
                    }
                }
                self.header.x_min = x_min;
                self.header.x_max = x_max;
                self.header.y_min = y_min;
                self.header.y_max = y_max;
            }
            _ => {
                let mut x_min = f64::INFINITY;
                let mut x_max = f64::NEG_INFINITY;
                let mut y_min = f64::INFINITY;
                let mut y_max = f64::NEG_INFINITY;
                for record in &self.records {
                    if record.shape_type != ShapeType::Null {
                        if record.x_min < x_min {
                            x_min = record.x_min;
                        }
                        if record.x_max > x_max {
                            x_max = record.x_max;
                        }
                        if record.y_min < y_min {
                            y_min = record.y_min;
                        }
                        if record.y_max > y_max {
                            y_max = record.y_max;
                        }
                    }
                }
                self.header.x_min = x_min;
                self.header.x_max = x_max;
                self.header.y_min = y_min;
                self.header.y_max = y_max;
            }
        }
        self.header.z_min = 0f64;
        self.header.z_max = 0f64;
        self.header.m_min = 0f64;
        self.header.m_max = 0f64;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    fn temp_shapefile(name: &str) -> (PathBuf, String) {
        let base = env::temp_dir().join(name);
        let file_name = base.to_str().unwrap().to_string();
        (base, file_name)
    }

    fn clean(base: &PathBuf) {
        for ext in ["shp", "shx", "dbf", "prj"].iter() {
            let _ = fs::remove_file(base.with_extension(ext));
        }
    }

    #[test]
    fn test_polygon_round_trip() {
        let (base, file_name) = temp_shapefile("srgt_roundtrip_poly.shp");

        let mut output = Shapefile::new(&file_name, ShapeType::Polygon).unwrap();
        output.projection = "+proj=longlat +R=6370997 +no_defs".to_string();
        output
            .attributes
            .add_field(&AttributeField::new("FIPS", FieldDataType::Text, 5u8, 0u8));
        output
            .attributes
            .add_field(&AttributeField::new("AREA", FieldDataType::Real, 12u8, 4u8));

        let mut sfg = ShapefileGeometry::new(ShapeType::Polygon);
        sfg.add_part(&[
            Point2D::new(0.0, 0.0),
            Point2D::new(0.0, 10.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(0.0, 0.0),
        ]);
        output.add_record(sfg);
        output.attributes.add_record(
            vec![
                FieldData::Text("06001".to_string()),
                FieldData::Real(100.5),
            ],
            false,
        );
        output.write().unwrap();

        let input = Shapefile::read(&file_name).unwrap();
        assert_eq!(input.header.shape_type, ShapeType::Polygon);
        assert_eq!(input.num_records, 1);
        let rec = input.get_record(0);
        assert_eq!(rec.num_parts, 1);
        assert_eq!(rec.num_points, 5);
        assert_eq!(rec.points[2], Point2D::new(10.0, 10.0));
        assert_eq!(input.header.x_min, 0.0);
        assert_eq!(input.header.x_max, 10.0);
        assert_eq!(input.header.y_max, 10.0);
        assert_eq!(
            input.attributes.get_value(0, "FIPS"),
            FieldData::Text("06001".to_string())
        );
        assert_eq!(input.attributes.get_value(0, "AREA"), FieldData::Real(100.5));
        assert!(input.projection.contains("longlat"));

        clean(&base);
    }

    #[test]
    fn test_point_round_trip() {
        let (base, file_name) = temp_shapefile("srgt_roundtrip_point.shp");

        let mut output = Shapefile::new(&file_name, ShapeType::Point).unwrap();
        output
            .attributes
            .add_field(&AttributeField::new("ID", FieldDataType::Int, 7u8, 0u8));
        output.add_point_record(-122.5, 37.75);
        output
            .attributes
            .add_record(vec![FieldData::Int(42)], false);
        output.add_point_record(-121.25, 38.5);
        output
            .attributes
            .add_record(vec![FieldData::Int(43)], false);
        output.write().unwrap();

        let input = Shapefile::read(&file_name).unwrap();
        assert_eq!(input.header.shape_type, ShapeType::Point);
        assert_eq!(input.num_records, 2);
        assert_eq!(input.get_record(0).points[0], Point2D::new(-122.5, 37.75));
        assert_eq!(input.get_record(1).points[0], Point2D::new(-121.25, 38.5));
        assert_eq!(input.header.x_min, -122.5);
        assert_eq!(input.header.y_max, 38.5);
        assert_eq!(input.attributes.get_value(0, "ID"), FieldData::Int(42));
        assert_eq!(input.attributes.get_value(1, "ID"), FieldData::Int(43));

        clean(&base);
    }
}
