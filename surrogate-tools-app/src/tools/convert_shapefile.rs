/*
This tool is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 18/06/2024
Last Modified: 02/04/2025
License: MIT
*/

use crate::tools::*;
use std::env;
use std::io::{Error, ErrorKind};
use std::path;
use std::time::Instant;
use surrogate_common::structures::Point2D;
use surrogate_common::utils::get_formatted_elapsed_time;
use surrogate_overlay::projection::ProjectionContext;
use surrogate_vector::{ShapeType, Shapefile, ShapefileGeometry};

/// This tool transforms a vector file between two map projections. The user
/// must specify the names of the input and output shapefiles and the source
/// and target projections as PROJ strings. Attribute values are carried over
/// unchanged; the geometry of every record is reprojected vertex by vertex.
/// Because the original `.prj` text no longer describes the transformed
/// coordinates, no projection file is written for the output.
pub struct ConvertShapefile {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl ConvertShapefile {
    pub fn new() -> ConvertShapefile {
        // public constructor
        let name = "ConvertShapefile".to_string();
        let toolbox = "Data Tools".to_string();
        let description = "Transforms a vector file between two map projections.".to_string();

        let mut parameters = vec![];
        parameters.push(ToolParameter {
            name: "Input Vector File".to_owned(),
            flags: vec!["-i".to_owned(), "--input".to_owned()],
            description: "Input vector file.".to_owned(),
            parameter_type: ParameterType::ExistingFile(ParameterFileType::Vector(
                VectorGeometryType::Any,
            )),
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Output Vector File".to_owned(),
            flags: vec!["-o".to_owned(), "--output".to_owned()],
            description: "Output vector file.".to_owned(),
            parameter_type: ParameterType::NewFile(ParameterFileType::Vector(
                VectorGeometryType::Any,
            )),
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Source Projection".to_owned(),
            flags: vec!["--from_proj".to_owned()],
            description: "PROJ description of the input coordinate system.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Target Projection".to_owned(),
            flags: vec!["--to_proj".to_owned()],
            description: "PROJ description of the output coordinate system.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: false,
        });

        let sep: String = path::MAIN_SEPARATOR.to_string();
        let p = format!("{}", env::current_dir().unwrap().display());
        let e = format!("{}", env::current_exe().unwrap().display());
        let mut short_exe = e
            .replace(&p, "")
            .replace(".exe", "")
            .replace(".", "")
            .replace(&sep, "");
        if e.contains(".exe") {
            short_exe += ".exe";
        }
        let usage = format!(
            ">>.*{0} -r={1} -v --wd=\"*path*to*data*\" -i=counties.shp -o=counties_lcc.shp --from_proj=\"+proj=longlat +R=6370997 +no_defs\" --to_proj=\"+proj=lcc +lat_1=33 +lat_2=45 +lon_0=-97 +lat_0=40 +R=6370997 +units=m +no_defs\"",
            short_exe, name
        ).replace("*", &sep);

        ConvertShapefile {
            name: name,
            description: description,
            toolbox: toolbox,
            parameters: parameters,
            example_usage: usage,
        }
    }
}

impl SurrogateTool for ConvertShapefile {
    fn get_source_file(&self) -> String {
        String::from(file!())
    }

    fn get_tool_name(&self) -> String {
        self.name.clone()
    }

    fn get_tool_description(&self) -> String {
        self.description.clone()
    }

    fn get_tool_parameters(&self) -> String {
        let mut s = String::from("{\"parameters\": [");
        for i in 0..self.parameters.len() {
            if i < self.parameters.len() - 1 {
                s.push_str(&(self.parameters[i].to_string()));
                s.push_str(",");
            } else {
                s.push_str(&(self.parameters[i].to_string()));
            }
        }
        s.push_str("]}");
        s
    }

    fn get_example_usage(&self) -> String {
        self.example_usage.clone()
    }

    fn get_toolbox(&self) -> String {
        self.toolbox.clone()
    }

    fn run<'a>(
        &self,
        args: Vec<String>,
        working_directory: &'a str,
        verbose: bool,
    ) -> Result<(), Error> {
        let mut input_file: String = "".to_string();
        let mut output_file: String = "".to_string();
        let mut from_proj: String = "".to_string();
        let mut to_proj: String = "".to_string();

        // read the arguments
        if args.len() == 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Tool run with no parameters.",
            ));
        }
        for i in 0..args.len() {
            let mut arg = args[i].replace("\"", "");
            arg = arg.replace("\'", "");
            let cmd = arg.split("="); // in case an equals sign was used
            let vec = cmd.collect::<Vec<&str>>();
            let mut keyval = false;
            if vec.len() > 1 {
                keyval = true;
            }
            let flag_val = vec[0].to_lowercase().replace("--", "-");
            if flag_val == "-i" || flag_val == "-input" {
                input_file = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-o" || flag_val == "-output" {
                output_file = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-from_proj" {
                from_proj = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-to_proj" {
                to_proj = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            }
        }

        let sep: String = path::MAIN_SEPARATOR.to_string();
        let mut progress: usize;
        let mut old_progress: usize = 1;

        let start = Instant::now();

        if verbose {
            let tool_name = self.get_tool_name();
            let welcome_len = format!("* Welcome to {} *", tool_name).len().max(29);
            // 29 = length of the 'Powered by' statement.
            println!("{}", "*".repeat(welcome_len));
            println!("* Welcome to {} {}*", tool_name, " ".repeat(welcome_len - 15 - tool_name.len()));
            println!("* Powered by SurrogateTools {}*", " ".repeat(welcome_len - 29));
            println!("{}", "*".repeat(welcome_len));
        }

        if !input_file.contains(path::MAIN_SEPARATOR) && !input_file.contains("/") {
            input_file = format!("{}{}", working_directory, input_file);
        }

        if !output_file.contains(&sep) && !output_file.contains("/") {
            output_file = format!("{}{}", working_directory, output_file);
        }

        if from_proj.is_empty() || to_proj.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Both the source and target projections must be specified.",
            ));
        }

        let reproject = ProjectionContext::new(&from_proj, &to_proj)?;
        let input = Shapefile::read(&input_file)?;
        let base_type = input.header.shape_type.base_shape_type();

        let mut output =
            Shapefile::initialize_using_file(&output_file, &input, base_type, true)?;
        // the source .prj text no longer applies to the transformed geometry
        output.projection = String::new();

        for record_num in 0..input.num_records {
            let record = input.get_record(record_num);
            if record.shape_type == ShapeType::Null {
                continue;
            }
            let mut geometry = ShapefileGeometry::new(base_type);
            if base_type == ShapeType::Point || base_type == ShapeType::MultiPoint {
                for p in &record.points {
                    let (x, y) = reproject.project(p.x, p.y)?;
                    geometry.add_point(Point2D::new(x, y));
                }
            } else {
                for part in 0..record.num_parts as usize {
                    let mut points = Vec::with_capacity(record.get_part(part).len());
                    for p in record.get_part(part) {
                        let (x, y) = reproject.project(p.x, p.y)?;
                        points.push(Point2D::new(x, y));
                    }
                    geometry.add_part(&points);
                }
            }
            output.add_record(geometry);
            output
                .attributes
                .add_record(input.attributes.get_record(record_num), false);

            if verbose {
                progress =
                    (100.0_f64 * (record_num + 1) as f64 / input.num_records as f64) as usize;
                if progress != old_progress {
                    println!("Progress: {}%", progress);
                    old_progress = progress;
                }
            }
        }

        if verbose {
            println!("Saving data...")
        };
        let _ = match output.write() {
            Ok(_) => {
                if verbose {
                    println!("Output file written")
                }
            }
            Err(e) => return Err(e),
        };

        let elapsed_time = get_formatted_elapsed_time(start);

        if verbose {
            println!("{}", &format!("Elapsed Time: {}", elapsed_time));
        }

        Ok(())
    }
}
