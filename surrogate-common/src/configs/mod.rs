/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 21/04/2023
Last Modified: 03/10/2024
License: MIT
*/
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::io::prelude::*;
use std::io::Error;
use std::path;

/// A structure to hold environment settings. Backed by settings.json file in same directory
#[derive(Serialize, Deserialize, Debug)]
pub struct Configs {
    pub verbose_mode: bool,
    pub working_directory: String,
}

impl Configs {
    pub fn new() -> Configs {
        Configs {
            verbose_mode: true,
            working_directory: String::new(),
        }
    }
}

impl Default for Configs {
    fn default() -> Configs {
        Configs::new()
    }
}

pub fn get_configs() -> std::result::Result<Configs, Error> {
    let exe_path = std::env::current_dir()?
        .to_str()
        .unwrap_or("No exe path found.")
        .to_string();
    let config_file = exe_path + &path::MAIN_SEPARATOR.to_string() + "settings.json";
    let configs: Configs = match fs::read_to_string(config_file) {
        Ok(contents) => {
            serde_json::from_str(&contents).expect("Failed to parse settings.json file.")
        }
        Err(_) => Configs::new(),
    };
    Ok(configs)
}

pub fn save_configs(configs: &Configs) -> std::result::Result<(), Error> {
    let configs_json =
        serde_json::to_string_pretty(&configs).expect("Error converting Configs object to JSON.");
    let exe_path = std::env::current_dir()?
        .to_str()
        .unwrap_or("No exe path found.")
        .to_string();
    let config_file = exe_path + &path::MAIN_SEPARATOR.to_string() + "settings.json";
    let mut file = File::create(config_file).expect("Error creating output settings.json file.");
    file.write_all(configs_json.as_bytes())
        .expect("Error writing to output settings.json file.");
    Ok(())
}
