/*
This tool is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 10/06/2024
Last Modified: 11/04/2025
License: MIT
*/

use crate::tools::*;
use std::env;
use std::fs::File;
use std::io::{BufWriter, Error, ErrorKind};
use std::path;
use std::sync::Arc;
use std::time::Instant;
use surrogate_common::utils::get_formatted_elapsed_time;
use surrogate_overlay::grid::{egrid, grid_envelope, regular_grid, GridDesc, GridInfo, OutputKind};
use surrogate_overlay::intersect::poly_isect;
use surrogate_overlay::projection::{project_box, ProjectionContext};
use surrogate_overlay::report::surrogate::{write_surrogate_report, SurrogateOptions};
use surrogate_overlay::PolySet;
use surrogate_vector::Shapefile;

/// This tool computes spatial surrogates: the fraction of each data polygon's
/// weight that falls in each cell of an output grid. The data polygons are
/// merged by the `--data_id` attribute, intersected with the weight features,
/// and the result is intersected again with the grid; each report row is the
/// gridded weight divided by the data polygon's total weight. Without a
/// weight file the data polygons weight themselves, which makes the fraction
/// an area ratio. The output grid is a named grid from a grid description
/// file (`REGULAR_GRID`), an e-grid polygon file (`EGRID`), or a polygon file
/// with an identifier attribute (`POLYGON`); the named grid also supplies
/// the report header and, for an e-grid, the dimensions used to recover cell
/// positions. Weight attributes may carry their own surrogate code as
/// `NAME:CODE`, and one block of rows is written per attribute.
pub struct ComputeSurrogates {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl ComputeSurrogates {
    pub fn new() -> ComputeSurrogates {
        // public constructor
        let name = "ComputeSurrogates".to_string();
        let toolbox = "Surrogate Creation".to_string();
        let description =
            "Computes gridding surrogate fractions from data polygons and weight features."
                .to_string();

        let mut parameters = vec![];
        parameters.push(ToolParameter {
            name: "Data Polygon File".to_owned(),
            flags: vec!["--data".to_owned()],
            description: "Input data polygon file, e.g. counties.".to_owned(),
            parameter_type: ParameterType::ExistingFile(ParameterFileType::Vector(
                VectorGeometryType::Polygon,
            )),
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Data Identifier Attribute".to_owned(),
            flags: vec!["--data_id".to_owned()],
            description: "Attribute that identifies each data polygon.".to_owned(),
            parameter_type: ParameterType::VectorAttributeField(
                AttributeType::Any,
                "--data".to_string(),
            ),
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Weight File".to_owned(),
            flags: vec!["--weight".to_owned()],
            description: "Weight feature file; the data polygons weight themselves when absent."
                .to_owned(),
            parameter_type: ParameterType::ExistingFile(ParameterFileType::Vector(
                VectorGeometryType::Any,
            )),
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Weight Attributes".to_owned(),
            flags: vec!["--weight_attr".to_owned()],
            description:
                "Comma-separated weight attributes, each NAME or NAME:CODE; NONE weights by size."
                    .to_owned(),
            parameter_type: ParameterType::String,
            default_value: Some("NONE".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Surrogate Code".to_owned(),
            flags: vec!["--code".to_owned()],
            description: "Surrogate code written for attributes without their own.".to_owned(),
            parameter_type: ParameterType::Integer,
            default_value: Some("1".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Grid Description File".to_owned(),
            flags: vec!["--griddesc".to_owned()],
            description: "Grid description file naming the output grid.".to_owned(),
            parameter_type: ParameterType::ExistingFile(ParameterFileType::Text),
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Grid Name".to_owned(),
            flags: vec!["--grid".to_owned()],
            description: "Name of the output grid within the grid description file.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Output Type".to_owned(),
            flags: vec!["--output_type".to_owned()],
            description: "Kind of output region the surrogates are computed for.".to_owned(),
            parameter_type: ParameterType::OptionList(vec![
                "REGULAR_GRID".to_owned(),
                "EGRID".to_owned(),
                "POLYGON".to_owned(),
            ]),
            default_value: Some("REGULAR_GRID".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "E-Grid File".to_owned(),
            flags: vec!["--egrid".to_owned()],
            description: "E-grid polygon file, required for EGRID output.".to_owned(),
            parameter_type: ParameterType::ExistingFile(ParameterFileType::Vector(
                VectorGeometryType::Polygon,
            )),
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Output Polygon File".to_owned(),
            flags: vec!["--output_poly".to_owned()],
            description: "Output polygon file, required for POLYGON output.".to_owned(),
            parameter_type: ParameterType::ExistingFile(ParameterFileType::Vector(
                VectorGeometryType::Polygon,
            )),
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Output Polygon Identifier".to_owned(),
            flags: vec!["--output_poly_attr".to_owned()],
            description: "Attribute that identifies each output polygon.".to_owned(),
            parameter_type: ParameterType::VectorAttributeField(
                AttributeType::Any,
                "--output_poly".to_string(),
            ),
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Output Polygon Projection".to_owned(),
            flags: vec!["--output_poly_proj".to_owned()],
            description: "PROJ description of the output polygon coordinate system.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Output Surrogate File".to_owned(),
            flags: vec!["-o".to_owned(), "--output".to_owned()],
            description: "Output surrogate report file.".to_owned(),
            parameter_type: ParameterType::NewFile(ParameterFileType::Text),
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Data Projection".to_owned(),
            flags: vec!["--data_proj".to_owned()],
            description: "PROJ description of the data coordinate system.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Weight Projection".to_owned(),
            flags: vec!["--weight_proj".to_owned()],
            description: "PROJ description of the weight coordinate system.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Write Header Line?".to_owned(),
            flags: vec!["--header".to_owned()],
            description: "Write the grid header line at the top of the report.".to_owned(),
            parameter_type: ParameterType::Boolean,
            default_value: Some("true".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Quality Assurance Sum?".to_owned(),
            flags: vec!["--qa_sum".to_owned()],
            description: "Append the running fraction sum to each row.".to_owned(),
            parameter_type: ParameterType::Boolean,
            default_value: Some("false".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Report Numerators?".to_owned(),
            flags: vec!["--numerator".to_owned()],
            description: "Append the numerator to each row.".to_owned(),
            parameter_type: ParameterType::Boolean,
            default_value: Some("false".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Report Denominators?".to_owned(),
            flags: vec!["--denominator".to_owned()],
            description: "Append the denominator to each row.".to_owned(),
            parameter_type: ParameterType::Boolean,
            default_value: Some("false".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Denominator Threshold".to_owned(),
            flags: vec!["--denom_threshold".to_owned()],
            description: "Rows with a denominator below this are flagged as skipped.".to_owned(),
            parameter_type: ParameterType::Float,
            default_value: Some("0.00001".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Numerator Sum File".to_owned(),
            flags: vec!["--numer_sum".to_owned()],
            description: "Base name for an optional polygon file of per-cell numerator sums."
                .to_owned(),
            parameter_type: ParameterType::NewFile(ParameterFileType::Vector(
                VectorGeometryType::Polygon,
            )),
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
            ">>.*{0} -r={1} -v --wd=\"*path*to*data*\" --data=counties.shp --data_id=FIPS --weight=pop_points.shp --weight_attr=POP2000 --code=100 --griddesc=GRIDDESC.txt --grid=US36KM -o=srg_pop.txt --qa_sum",
            short_exe, name
        )
        .replace("*", &sep);

        ComputeSurrogates {
            name: name,
            description: description,
            toolbox: toolbox,
            parameters: parameters,
            example_usage: usage,
        }
    }
}

impl SurrogateTool for ComputeSurrogates {
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
        let mut data_file: String = "".to_string();
        let mut data_id: String = "".to_string();
        let mut weight_file: String = "".to_string();
        let mut weight_attr: String = "NONE".to_string();
        let mut code = 1i32;
        let mut griddesc_file: String = "".to_string();
        let mut grid_name: String = "".to_string();
        let mut output_type: String = "REGULAR_GRID".to_string();
        let mut egrid_file: String = "".to_string();
        let mut output_poly: String = "".to_string();
        let mut output_poly_attr: String = "".to_string();
        let mut output_poly_proj: String = "".to_string();
        let mut output_file: String = "".to_string();
        let mut data_proj: String = "".to_string();
        let mut weight_proj: String = "".to_string();
        let mut write_header = true;
        let mut qa_sum = false;
        let mut output_numerator = false;
        let mut output_denominator = false;
        let mut denom_threshold = 0.00001f64;
        let mut numer_sum: String = "".to_string();

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
            if flag_val == "-data" {
                data_file = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-data_id" {
                data_id = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-weight" {
                weight_file = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-weight_attr" {
                weight_attr = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-code" {
                code = if keyval {
                    vec[1].to_string().parse::<i32>().unwrap()
                } else {
                    args[i + 1].to_string().parse::<i32>().unwrap()
                };
            } else if flag_val == "-griddesc" {
                griddesc_file = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-grid" {
                grid_name = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-output_type" {
                output_type = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-egrid" {
                egrid_file = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-output_poly" {
                output_poly = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-output_poly_attr" {
                output_poly_attr = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-output_poly_proj" {
                output_poly_proj = if keyval {
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
            } else if flag_val == "-data_proj" {
                data_proj = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-weight_proj" {
                weight_proj = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-header" {
                if keyval && vec[1].to_lowercase().contains("false") {
                    write_header = false;
                }
            } else if flag_val == "-qa_sum" {
                if vec.len() == 1 || !vec[1].to_string().to_lowercase().contains("false") {
                    qa_sum = true;
                }
            } else if flag_val == "-numerator" {
                if vec.len() == 1 || !vec[1].to_string().to_lowercase().contains("false") {
                    output_numerator = true;
                }
            } else if flag_val == "-denominator" {
                if vec.len() == 1 || !vec[1].to_string().to_lowercase().contains("false") {
                    output_denominator = true;
                }
            } else if flag_val == "-denom_threshold" {
                denom_threshold = if keyval {
                    vec[1].to_string().parse::<f64>().unwrap()
                } else {
                    args[i + 1].to_string().parse::<f64>().unwrap()
                };
            } else if flag_val == "-numer_sum" {
                numer_sum = if keyval {
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

        if !data_file.contains(&sep) && !data_file.contains("/") {
            data_file = format!("{}{}", working_directory, data_file);
        }

        if !weight_file.is_empty() && !weight_file.contains(&sep) && !weight_file.contains("/") {
            weight_file = format!("{}{}", working_directory, weight_file);
        }

        if !griddesc_file.contains(&sep) && !griddesc_file.contains("/") {
            griddesc_file = format!("{}{}", working_directory, griddesc_file);
        }

        if !egrid_file.is_empty() && !egrid_file.contains(&sep) && !egrid_file.contains("/") {
            egrid_file = format!("{}{}", working_directory, egrid_file);
        }

        if !output_poly.is_empty() && !output_poly.contains(&sep) && !output_poly.contains("/") {
            output_poly = format!("{}{}", working_directory, output_poly);
        }

        if !output_file.contains(&sep) && !output_file.contains("/") {
            output_file = format!("{}{}", working_directory, output_file);
        }

        if !numer_sum.is_empty() && !numer_sum.contains(&sep) && !numer_sum.contains("/") {
            numer_sum = format!("{}{}", working_directory, numer_sum);
        }

        if data_id.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "A data identifier attribute must be specified with --data_id.",
            ));
        }

        let kind = match OutputKind::from_name(&output_type) {
            Some(k) => k,
            None => {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("The output type {} is not recognized.", output_type),
                ))
            }
        };

        // the named grid supplies the report header for every output kind
        let desc = GridDesc::read(&griddesc_file)?;
        let (def, coord) = match desc.find_grid(&grid_name) {
            Some(g) => g,
            None => {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("The grid {} was not found in {}.", grid_name, griddesc_file),
                ))
            }
        };
        let grid_proj4 = coord.proj4_string()?;
        let grid_info = GridInfo {
            kind: kind,
            name: def.name.clone(),
            coord: coord.clone(),
            xorig: def.xorig,
            yorig: def.yorig,
            xcell: def.xcell,
            ycell: def.ycell,
            ncols: def.ncols,
            nrows: def.nrows,
        };

        if verbose {
            println!("Building the output grid...");
        }

        let grid_set = match kind {
            OutputKind::RegularGrid => regular_grid(def, None, None)?,
            OutputKind::EGrid => {
                if egrid_file.is_empty() {
                    return Err(Error::new(
                        ErrorKind::InvalidInput,
                        "An e-grid file is required for EGRID output.",
                    ));
                }
                egrid(&egrid_file, None)?
            }
            OutputKind::Polygon => {
                if output_poly.is_empty() || output_poly_attr.is_empty() {
                    return Err(Error::new(
                        ErrorKind::InvalidInput,
                        "An output polygon file and identifier attribute are required for POLYGON output.",
                    ));
                }
                let sf = Shapefile::read(&output_poly)?;
                let poly_ctx = if output_poly_proj.trim().is_empty() {
                    None
                } else {
                    Some(ProjectionContext::new(&output_poly_proj, &grid_proj4)?)
                };
                PolySet::from_shapefile(
                    &sf,
                    &[(output_poly_attr.clone(), 0)],
                    None,
                    poly_ctx.as_ref(),
                )?
            }
        };
        let grid_set = Arc::new(grid_set);

        if verbose {
            println!("Reading data polygons...");
        }

        let data_ctx = if data_proj.trim().is_empty() {
            None
        } else {
            Some(ProjectionContext::new(&data_proj, &grid_proj4)?)
        };

        // the window trims the data read to the grid extent, expressed in the
        // data file's own coordinates
        let window = if kind == OutputKind::Polygon {
            if data_proj.trim().is_empty() {
                grid_set.bounding_box
            } else {
                let back = ProjectionContext::new(&grid_proj4, &data_proj)?;
                project_box(&grid_set.bounding_box, &back)?
            }
        } else {
            let envelope_ctx = if data_proj.trim().is_empty() {
                None
            } else {
                Some(ProjectionContext::new(&grid_proj4, &data_proj)?)
            };
            grid_envelope(def, None, envelope_ctx.as_ref())?
        };

        let data_sf = Shapefile::read(&data_file)?;
        let data_set = PolySet::from_shapefile(
            &data_sf,
            &[(data_id.clone(), 0)],
            Some(&window),
            data_ctx.as_ref(),
        )?
        .merged_by_id();
        if data_set.num_shapes() == 0 {
            println!("Warning: No data polygons intersect the output grid.");
        }
        let data_set = Arc::new(data_set);

        let mut weight_attrs: Vec<(String, i32)> = vec![];
        if !weight_attr.trim().is_empty() && weight_attr.trim().to_uppercase() != "NONE" {
            for entry in weight_attr.split(',') {
                let entry = entry.trim();
                if entry.is_empty() {
                    continue;
                }
                match entry.find(':') {
                    Some(pos) => {
                        let attr_code = match entry[pos + 1..].trim().parse::<i32>() {
                            Ok(c) => c,
                            Err(_) => {
                                return Err(Error::new(
                                    ErrorKind::InvalidInput,
                                    format!(
                                        "The surrogate code in {} is not an integer.",
                                        entry
                                    ),
                                ))
                            }
                        };
                        weight_attrs.push((entry[..pos].trim().to_string(), attr_code));
                    }
                    None => weight_attrs.push((entry.to_string(), code)),
                }
            }
        }

        let weight_data = if !weight_file.is_empty() {
            if verbose {
                println!("Reading weight features...");
            }
            let weight_ctx = if weight_proj.trim().is_empty() {
                None
            } else {
                Some(ProjectionContext::new(&weight_proj, &grid_proj4)?)
            };
            // weights are only needed where data polygons survived the window
            let weight_window = if weight_proj.trim().is_empty() {
                data_set.bounding_box
            } else {
                let back = ProjectionContext::new(&grid_proj4, &weight_proj)?;
                project_box(&data_set.bounding_box, &back)?
            };
            let weight_sf = Shapefile::read(&weight_file)?;
            let weight_set = Arc::new(PolySet::from_shapefile(
                &weight_sf,
                &weight_attrs,
                Some(&weight_window),
                weight_ctx.as_ref(),
            )?);
            if verbose {
                println!("Intersecting weight features with data polygons...");
            }
            poly_isect(&weight_set, &data_set)?
        } else {
            if !weight_attrs.is_empty() {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    "A weight attribute requires a weight file.",
                ));
            }
            PolySet::identity_overlay(&data_set)
        };
        let weight_data = Arc::new(weight_data);

        if verbose {
            println!("Intersecting with the output grid...");
        }

        let derived = poly_isect(&weight_data, &grid_set)?;

        if verbose {
            println!("Writing the surrogate report...");
        }

        let options = SurrogateOptions {
            code: code,
            write_header: write_header,
            qa_sum: qa_sum,
            output_numerator: output_numerator,
            output_denominator: output_denominator,
            denominator_threshold: denom_threshold,
            grid_sum_name: if numer_sum.is_empty() {
                None
            } else {
                Some(numer_sum.clone())
            },
        };

        let f = File::create(&output_file)?;
        let mut sink = BufWriter::new(f);
        write_surrogate_report(&mut sink, &derived, &weight_data, &grid_info, &options)?;
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
