/*
This tool is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 12/08/2024
Last Modified: 02/04/2025
License: MIT
*/

use crate::tools::*;
use std::env;
use std::io::{Error, ErrorKind};
use std::path;
use std::sync::Arc;
use std::time::Instant;
use surrogate_common::utils::get_formatted_elapsed_time;
use surrogate_overlay::allocate::write_allocation;
use surrogate_overlay::intersect::poly_isect;
use surrogate_overlay::modes::ModeTable;
use surrogate_overlay::projection::ProjectionContext;
use surrogate_overlay::PolySet;
use surrogate_vector::{ShapeType, Shapefile};

/// This tool transfers the attributes of one set of features onto a set of
/// output polygons, weighting each transfer by how much of the feature falls
/// inside each polygon. The allocation mode file names the mode attribute by
/// attribute: AGGREGATE sums the overlapping shares, AVERAGE divides the
/// aggregate by the polygon total, DISCRETEOVERLAP copies the value of the
/// feature with the largest share, DISCRETECENTROID copies the value of the
/// feature containing the polygon centroid, and AREAPERCENT writes one
/// fraction column per distinct value. The sentinels `ALL_AGGREGATE`,
/// `ALL_AVERAGE`, `ALL_DISCRETEOVERLAP`, `ALL_DISCRETECENTROID` and
/// `ALL_AREAPERCENT` may be given in place of a mode file to apply one mode
/// to every attribute. Output polygon attributes named with
/// `--output_poly_attrs` are carried into the output unchanged.
pub struct AllocateAttributes {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl AllocateAttributes {
    pub fn new() -> AllocateAttributes {
        // public constructor
        let name = "AllocateAttributes".to_string();
        let toolbox = "Attribute Allocation".to_string();
        let description =
            "Allocates the attributes of input features onto a set of output polygons.".to_string();

        let mut parameters = vec![];
        parameters.push(ToolParameter {
            name: "Input Vector File".to_owned(),
            flags: vec!["-i".to_owned(), "--input".to_owned()],
            description: "Input vector file whose attributes are allocated.".to_owned(),
            parameter_type: ParameterType::ExistingFile(ParameterFileType::Vector(
                VectorGeometryType::Any,
            )),
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Allocation Mode File".to_owned(),
            flags: vec!["--modes".to_owned()],
            description: "Allocation mode file, or an ALL_ sentinel such as ALL_AGGREGATE."
                .to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Output Polygon File".to_owned(),
            flags: vec!["--output_poly".to_owned()],
            description: "Polygon file the attributes are allocated onto.".to_owned(),
            parameter_type: ParameterType::ExistingFile(ParameterFileType::Vector(
                VectorGeometryType::Polygon,
            )),
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Carried Polygon Attributes".to_owned(),
            flags: vec!["--output_poly_attrs".to_owned()],
            description: "Comma-separated output polygon attributes carried over unchanged."
                .to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Output Vector File".to_owned(),
            flags: vec!["-o".to_owned(), "--output".to_owned()],
            description: "Output vector file.".to_owned(),
            parameter_type: ParameterType::NewFile(ParameterFileType::Vector(
                VectorGeometryType::Polygon,
            )),
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Input Projection".to_owned(),
            flags: vec!["--input_proj".to_owned()],
            description: "PROJ description of the input coordinate system.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Output Projection".to_owned(),
            flags: vec!["--output_proj".to_owned()],
            description: "PROJ description of the output polygon coordinate system.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: true,
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
            ">>.*{0} -r={1} -v --wd=\"*path*to*data*\" -i=tracts.shp --modes=modes.txt --output_poly=counties.shp --output_poly_attrs=FIPS -o=county_pop.shp",
            short_exe, name
        )
        .replace("*", &sep);

        AllocateAttributes {
            name: name,
            description: description,
            toolbox: toolbox,
            parameters: parameters,
            example_usage: usage,
        }
    }
}

impl SurrogateTool for AllocateAttributes {
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
        let mut modes_file: String = "".to_string();
        let mut data_file: String = "".to_string();
        let mut pass_through_arg: String = "".to_string();
        let mut output_file: String = "".to_string();
        let mut input_proj: String = "".to_string();
        let mut output_proj: String = "".to_string();

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
            } else if flag_val == "-modes" {
                modes_file = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-output_poly" {
                data_file = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-output_poly_attrs" {
                pass_through_arg = if keyval {
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
            } else if flag_val == "-input_proj" {
                input_proj = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-output_proj" {
                output_proj = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            }
        }

        let sep: String = path::MAIN_SEPARATOR.to_string();

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

        if !input_file.contains(&sep) && !input_file.contains("/") {
            input_file = format!("{}{}", working_directory, input_file);
        }

        if !data_file.contains(&sep) && !data_file.contains("/") {
            data_file = format!("{}{}", working_directory, data_file);
        }

        // the modes argument can be an ALL_ sentinel rather than a file
        if !modes_file.to_uppercase().starts_with("ALL_")
            && !modes_file.contains(&sep)
            && !modes_file.contains("/")
        {
            modes_file = format!("{}{}", working_directory, modes_file);
        }

        if !output_file.contains(&sep) && !output_file.contains("/") {
            output_file = format!("{}{}", working_directory, output_file);
        }

        let reproject = match (input_proj.trim().is_empty(), output_proj.trim().is_empty()) {
            (true, true) => None,
            (false, false) => Some(ProjectionContext::new(&input_proj, &output_proj)?),
            _ => {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    "Either both or neither of --input_proj and --output_proj must be given.",
                ))
            }
        };

        let modes = ModeTable::read(&modes_file)?;

        if verbose {
            println!("Reading data...");
        }

        let input_sf = Shapefile::read(&input_file)?;
        let data_sf = Shapefile::read(&data_file)?;
        if data_sf.header.shape_type.base_shape_type() != ShapeType::Polygon {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "The output polygon file must be of Polygon base shape type.",
            ));
        }

        // every input attribute is read; the mode table decides which are
        // allocated
        let mut attr_names: Vec<(String, i32)> = vec![];
        for a in 0..input_sf.attributes.get_num_fields() {
            attr_names.push((input_sf.attributes.get_field(a).name.clone(), 0));
        }

        let input_set = Arc::new(PolySet::from_shapefile(
            &input_sf,
            &attr_names,
            None,
            reproject.as_ref(),
        )?);
        let data_set = Arc::new(PolySet::from_shapefile(&data_sf, &[], None, None)?);

        let mut pass_through: Vec<String> = vec![];
        for name in pass_through_arg.split(',') {
            let name = name.trim();
            if !name.is_empty() {
                pass_through.push(name.to_string());
            }
        }

        if verbose {
            println!("Intersecting input features with the output polygons...");
        }

        let derived = poly_isect(&input_set, &data_set)?;

        if verbose {
            println!("Allocating attributes...");
        }

        write_allocation(
            &derived,
            &input_set,
            &data_set,
            &input_sf,
            &data_sf,
            &pass_through,
            &modes,
            &output_file,
        )?;
        if verbose {
            println!("Output file written")
        }

        let elapsed_time = get_formatted_elapsed_time(start);

        if verbose {
            println!("{}", &format!("Elapsed Time: {}", elapsed_time));
        }

        Ok(())
    }
}
