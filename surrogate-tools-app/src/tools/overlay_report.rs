/*
This tool is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 03/09/2024
Last Modified: 02/04/2025
License: MIT
*/

use crate::tools::*;
use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Error, ErrorKind};
use std::path;
use std::sync::Arc;
use std::time::Instant;
use surrogate_common::utils::get_formatted_elapsed_time;
use surrogate_overlay::grid::{
    bounding_box_set, egrid, regular_grid, GridDesc, GridInfo, OutputKind, OverlayKind,
};
use surrogate_overlay::intersect::poly_isect;
use surrogate_overlay::projection::ProjectionContext;
use surrogate_overlay::report::overlay::{write_overlay_report, OverlayOptions};
use surrogate_overlay::union::poly_union;
use surrogate_overlay::PolySet;
use surrogate_vector::Shapefile;

/// This tool reports which input features fall inside an overlay region, one
/// delimited row per overlapping piece with the attribute values of the input
/// feature it came from. The region can be a named grid from a grid
/// description file (`REGULAR_GRID`), an e-grid polygon file (`EGRID`), a
/// `x1,y1,x2,y2` bounding box (`BOUNDING_BOX`), the individual polygons of a
/// shapefile (`POLYGON`), or the merged outline of a shapefile (`SHAPEFILE`).
/// With `--cellid`, grid overlays also report the column and row of each
/// overlapping cell; an e-grid overlay then needs `--griddesc` and `--grid`
/// to recover cell positions from cell identifiers. The report is written to
/// the output file, or to standard output when no output file is given.
pub struct OverlayReport {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl OverlayReport {
    pub fn new() -> OverlayReport {
        // public constructor
        let name = "OverlayReport".to_string();
        let toolbox = "Overlay Analysis".to_string();
        let description =
            "Reports the attributes of input features that overlap a grid, bounding box or polygon region."
                .to_string();

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
            name: "Input Attributes".to_owned(),
            flags: vec!["--input_attrs".to_owned()],
            description: "Comma-separated attributes to report, or ALL.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: Some("ALL".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Overlay Type".to_owned(),
            flags: vec!["--overlay_type".to_owned()],
            description: "Kind of overlay region.".to_owned(),
            parameter_type: ParameterType::OptionList(vec![
                "REGULAR_GRID".to_owned(),
                "EGRID".to_owned(),
                "BOUNDING_BOX".to_owned(),
                "POLYGON".to_owned(),
                "SHAPEFILE".to_owned(),
            ]),
            default_value: Some("SHAPEFILE".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Overlay Region".to_owned(),
            flags: vec!["--overlay".to_owned()],
            description:
                "Overlay region: a shapefile, an e-grid file, or a 'x1,y1,x2,y2' bounding box."
                    .to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Grid Description File".to_owned(),
            flags: vec!["--griddesc".to_owned()],
            description: "Grid description file naming the overlay grid.".to_owned(),
            parameter_type: ParameterType::ExistingFile(ParameterFileType::Text),
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Grid Name".to_owned(),
            flags: vec!["--grid".to_owned()],
            description: "Name of the grid within the grid description file.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Delimiter".to_owned(),
            flags: vec!["--delimiter".to_owned()],
            description: "Column delimiter used in the report.".to_owned(),
            parameter_type: ParameterType::OptionList(vec![
                "COMMA".to_owned(),
                "SEMICOLON".to_owned(),
                "PIPE".to_owned(),
                "SPACE".to_owned(),
            ]),
            default_value: Some("COMMA".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Write Header Row?".to_owned(),
            flags: vec!["--header".to_owned()],
            description: "Write a header row naming the reported attributes.".to_owned(),
            parameter_type: ParameterType::Boolean,
            default_value: Some("true".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Report Cell Positions?".to_owned(),
            flags: vec!["--cellid".to_owned()],
            description: "Report the column and row of each overlapping grid cell.".to_owned(),
            parameter_type: ParameterType::Boolean,
            default_value: Some("false".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Output Report File".to_owned(),
            flags: vec!["-o".to_owned(), "--output".to_owned()],
            description: "Output report file; written to standard output when absent.".to_owned(),
            parameter_type: ParameterType::NewFile(ParameterFileType::Csv),
            default_value: None,
            optional: true,
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
            name: "Overlay Projection".to_owned(),
            flags: vec!["--overlay_proj".to_owned()],
            description: "PROJ description of the overlay coordinate system.".to_owned(),
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
            ">>.*{0} -r={1} -v --wd=\"*path*to*data*\" -i=ports.shp --input_attrs=NAME,BERTHS --overlay_type=REGULAR_GRID --griddesc=GRIDDESC.txt --grid=US36KM --cellid -o=ports_grid.csv",
            short_exe, name
        ).replace("*", &sep);

        OverlayReport {
            name: name,
            description: description,
            toolbox: toolbox,
            parameters: parameters,
            example_usage: usage,
        }
    }
}

impl SurrogateTool for OverlayReport {
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
        let mut input_attrs: String = "ALL".to_string();
        let mut overlay_type: String = "SHAPEFILE".to_string();
        let mut overlay: String = "".to_string();
        let mut griddesc_file: String = "".to_string();
        let mut grid_name: String = "".to_string();
        let mut delimiter_name: String = "COMMA".to_string();
        let mut write_header = true;
        let mut cell_id = false;
        let mut output_file: String = "".to_string();
        let mut input_proj: String = "".to_string();
        let mut overlay_proj: String = "".to_string();

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
            } else if flag_val == "-input_attrs" {
                input_attrs = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-overlay_type" {
                overlay_type = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-overlay" {
                overlay = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
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
            } else if flag_val == "-delimiter" {
                delimiter_name = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-header" {
                if keyval && vec[1].to_lowercase().contains("false") {
                    write_header = false;
                }
            } else if flag_val == "-cellid" {
                if vec.len() == 1 || !vec[1].to_string().to_lowercase().contains("false") {
                    cell_id = true;
                }
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
            } else if flag_val == "-overlay_proj" {
                overlay_proj = if keyval {
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

        let kind = match OverlayKind::from_name(&overlay_type) {
            Some(k) => k,
            None => {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("The overlay type {} is not recognized.", overlay_type),
                ))
            }
        };

        if !input_file.contains(&sep) && !input_file.contains("/") {
            input_file = format!("{}{}", working_directory, input_file);
        }

        // the overlay argument is a file for these kinds, a bounding box or
        // grid name otherwise
        if kind == OverlayKind::EGrid || kind == OverlayKind::Polygon || kind == OverlayKind::ShapeFile
        {
            if overlay.is_empty() {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    "An overlay file must be specified for this overlay type.",
                ));
            }
            if !overlay.contains(&sep) && !overlay.contains("/") {
                overlay = format!("{}{}", working_directory, overlay);
            }
        }

        if !griddesc_file.is_empty() && !griddesc_file.contains(&sep) && !griddesc_file.contains("/")
        {
            griddesc_file = format!("{}{}", working_directory, griddesc_file);
        }

        if !output_file.is_empty() && !output_file.contains(&sep) && !output_file.contains("/") {
            output_file = format!("{}{}", working_directory, output_file);
        }

        let reproject = match (input_proj.trim().is_empty(), overlay_proj.trim().is_empty()) {
            (true, true) => None,
            (false, false) => Some(ProjectionContext::new(&input_proj, &overlay_proj)?),
            _ => {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    "Either both or neither of --input_proj and --overlay_proj must be given.",
                ))
            }
        };

        if verbose {
            println!("Building the overlay region...");
        }

        let mut grid_info: Option<GridInfo> = None;
        let overlay_set = match kind {
            OverlayKind::RegularGrid => {
                if griddesc_file.is_empty() || grid_name.is_empty() {
                    return Err(Error::new(
                        ErrorKind::InvalidInput,
                        "A grid description file and grid name are required for a REGULAR_GRID overlay.",
                    ));
                }
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
                grid_info = Some(GridInfo {
                    kind: OutputKind::RegularGrid,
                    name: def.name.clone(),
                    coord: coord.clone(),
                    xorig: def.xorig,
                    yorig: def.yorig,
                    xcell: def.xcell,
                    ycell: def.ycell,
                    ncols: def.ncols,
                    nrows: def.nrows,
                });
                regular_grid(def, None, None)?
            }
            OverlayKind::EGrid => {
                if cell_id {
                    // cell positions are recovered from cell identifiers, which
                    // takes the grid dimensions
                    if griddesc_file.is_empty() || grid_name.is_empty() {
                        return Err(Error::new(
                            ErrorKind::InvalidInput,
                            "Reporting e-grid cell positions requires --griddesc and --grid.",
                        ));
                    }
                    let desc = GridDesc::read(&griddesc_file)?;
                    let (def, coord) = match desc.find_grid(&grid_name) {
                        Some(g) => g,
                        None => {
                            return Err(Error::new(
                                ErrorKind::InvalidInput,
                                format!(
                                    "The grid {} was not found in {}.",
                                    grid_name, griddesc_file
                                ),
                            ))
                        }
                    };
                    grid_info = Some(GridInfo {
                        kind: OutputKind::EGrid,
                        name: def.name.clone(),
                        coord: coord.clone(),
                        xorig: def.xorig,
                        yorig: def.yorig,
                        xcell: def.xcell,
                        ycell: def.ycell,
                        ncols: def.ncols,
                        nrows: def.nrows,
                    });
                }
                egrid(&overlay, None)?
            }
            OverlayKind::BoundingBox => bounding_box_set(&overlay, None)?,
            OverlayKind::Polygon => {
                let sf = Shapefile::read(&overlay)?;
                PolySet::from_shapefile(&sf, &[], None, None)?
            }
            OverlayKind::ShapeFile => {
                let sf = Shapefile::read(&overlay)?;
                let set = PolySet::from_shapefile(&sf, &[], None, None)?;
                poly_union(&Arc::new(set))?
            }
        };

        if verbose {
            println!("Reading input features...");
        }

        let sf_in = Shapefile::read(&input_file)?;
        let mut attr_names: Vec<(String, i32)> = vec![];
        if input_attrs.trim().is_empty() || input_attrs.trim().to_uppercase() == "ALL" {
            for a in 0..sf_in.attributes.get_num_fields() {
                attr_names.push((sf_in.attributes.get_field(a).name.clone(), 0));
            }
        } else {
            for name in input_attrs.split(',') {
                let name = name.trim();
                if !name.is_empty() {
                    attr_names.push((name.to_string(), 0));
                }
            }
        }

        let input_set = Arc::new(PolySet::from_shapefile(
            &sf_in,
            &attr_names,
            None,
            reproject.as_ref(),
        )?);
        let overlay_set = Arc::new(overlay_set);

        if verbose {
            println!("Intersecting input features with the overlay...");
        }

        let derived = poly_isect(&input_set, &overlay_set)?;
        if derived.num_shapes() == 0 {
            println!("Warning: No overlaps were found between the input and overlay features.");
            return Ok(());
        }

        let delimiter = match delimiter_name.to_uppercase().as_str() {
            "SEMICOLON" => ';',
            "PIPE" => '|',
            "SPACE" => ' ',
            _ => ',',
        };
        let options = OverlayOptions {
            delimiter: delimiter,
            write_header: write_header,
            cell_id: cell_id,
        };

        if output_file.is_empty() {
            let out = io::stdout();
            let mut sink = out.lock();
            write_overlay_report(&mut sink, &derived, kind, grid_info.as_ref(), &options)?;
        } else {
            let f = File::create(&output_file)?;
            let mut sink = BufWriter::new(f);
            write_overlay_report(&mut sink, &derived, kind, grid_info.as_ref(), &options)?;
            if verbose {
                println!("Output file written")
            }
        }

        let elapsed_time = get_formatted_elapsed_time(start);

        if verbose {
            println!("{}", &format!("Elapsed Time: {}", elapsed_time));
        }

        Ok(())
    }
}
