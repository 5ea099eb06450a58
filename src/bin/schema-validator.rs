//! # SCIM Schema Validator
//!
//! A command-line utility for checking SCIM schema files and resource
//! documents with the same code the library uses at runtime.
//!
//! ## Usage
//!
//! ### Validate a Single Schema File
//!
//! ```bash
//! cargo run --bin schema-validator schemas/Device.json
//! ```
//!
//! ### Validate All Schemas in a Directory
//!
//! ```bash
//! cargo run --bin schema-validator ./schemas/
//! ```
//!
//! ### Validate a Resource Document
//!
//! Builds and validates the document against one of the embedded resource
//! types (`User`, `Group`) and lists every error found.
//!
//! ```bash
//! cargo run --bin schema-validator --resource User bjensen.json
//! ```
//!
//! ### Check a Filter Expression
//!
//! ```bash
//! cargo run --bin schema-validator --filter 'userName sw "bj" and not (active eq false)'
//! ```
//!
//! ## Output Examples
//!
//! ```text
//! Validating schema file: schemas/Device.json
//! ✓ Schema is valid!
//!
//! Schema Summary:
//!   ID: urn:example:params:scim:schemas:core:2.0:Device
//!   Name: Device
//!   Attributes: 4
//!   Required attributes: 1
//!   Multi-valued attributes: 0
//! ```
//!
//! ```text
//! Validating User resource: bjensen.json
//! ❌ 2 error(s):
//!   - Required attribute 'userName' is missing
//!   - Attribute 'active' has invalid type, expected boolean, got string
//! ```
//!
//! ## Exit Codes
//!
//! - `0`: Everything checked is valid
//! - `1`: Something is invalid or could not be read

use scim_core::schema::{AttributeDefinition, Schema, SchemaRegistry};
use scim_core::{Filter, ValidationErrors};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("--resource") if args.len() == 4 => validate_resource(&args[2], Path::new(&args[3])),
        Some("--filter") if args.len() == 3 => check_filter(&args[2]),
        Some(path) if args.len() == 2 && !path.starts_with("--") => {
            let path = Path::new(path);
            if path.is_file() {
                validate_single_file(path);
            } else if path.is_dir() {
                validate_directory(path);
            } else {
                eprintln!("Error: '{}' is not a valid file or directory", path.display());
                process::exit(1);
            }
        }
        _ => usage(&args[0]),
    }
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <schema-file-or-directory>", program);
    eprintln!("       {} --resource <User|Group> <resource.json>", program);
    eprintln!("       {} --filter <expression>", program);
    process::exit(1);
}

fn load_schema(path: &Path) -> Result<Schema, Box<dyn std::error::Error>> {
    let schema = SchemaRegistry::load_schema_from_file(path)?;
    if !schema.id.starts_with("urn:") && !schema.id.starts_with("http") {
        return Err("Schema ID should be a URI (starting with 'urn:' or 'http')".into());
    }
    SchemaRegistry::validate_definitions(&schema.attributes, &schema.id)?;
    Ok(schema)
}

fn validate_single_file(file_path: &Path) {
    println!("Validating schema file: {}", file_path.display());

    match load_schema(file_path) {
        Ok(schema) => {
            println!("✓ Schema is valid!");
            print_schema_summary(&schema);
        }
        Err(e) => {
            eprintln!("❌ Schema validation failed: {}", e);
            process::exit(1);
        }
    }
}

fn validate_directory(dir_path: &Path) {
    println!("Validating schemas in directory: {}", dir_path.display());

    let entries = match fs::read_dir(dir_path) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Error reading directory: {}", e);
            process::exit(1);
        }
    };

    let mut valid_count = 0;
    let mut error_count = 0;
    for path in entries.filter_map(Result::ok).map(|entry| entry.path()) {
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        println!("\nValidating: {}", path.display());
        match load_schema(&path) {
            Ok(schema) => {
                println!("  ✓ Valid - {} ({})", schema.name, schema.id);
                valid_count += 1;
            }
            Err(e) => {
                eprintln!("  ❌ Invalid - {}", e);
                error_count += 1;
            }
        }
    }

    println!("\nValidation Summary:");
    println!("  Valid schemas: {}", valid_count);
    println!("  Invalid schemas: {}", error_count);
    if error_count > 0 {
        process::exit(1);
    }

    println!("\nTesting schema registry loading...");
    match SchemaRegistry::from_schema_dir(dir_path) {
        Ok(registry) => {
            println!("✓ Schema registry loaded successfully");
            for schema in registry.get_schemas() {
                println!("    - {} ({})", schema.name, schema.id);
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to load schema registry: {}", e);
            process::exit(1);
        }
    }
}

fn validate_resource(resource_type: &str, file_path: &Path) {
    println!("Validating {} resource: {}", resource_type, file_path.display());

    let registry = match SchemaRegistry::with_embedded_schemas() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("❌ Failed to load embedded schemas: {}", e);
            process::exit(1);
        }
    };
    let Some(resource_type) = registry.resource_type(resource_type) else {
        eprintln!("❌ Unknown resource type '{}'", resource_type);
        process::exit(1);
    };

    let raw: serde_json::Value = match fs::read_to_string(file_path)
        .map_err(|e| e.to_string())
        .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()))
    {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("❌ Cannot read resource: {}", e);
            process::exit(1);
        }
    };

    let (tree, build_errors) = resource_type.build_tree(&raw);
    let mut errors = ValidationErrors::from(build_errors);
    if let Err(validation_errors) = resource_type.validate(&tree) {
        errors.extend(validation_errors);
    }

    if errors.is_empty() {
        println!("✓ Resource is valid!");
    } else {
        eprintln!("❌ {} error(s):", errors.len());
        for error in errors.iter() {
            eprintln!("  - {}", error);
        }
        process::exit(1);
    }
}

fn check_filter(text: &str) {
    match Filter::parse(text) {
        Ok(filter) => {
            println!("✓ Filter is valid!");
            println!("  Normalized: {}", filter);
            let rpn: Vec<String> = filter.to_rpn().iter().map(ToString::to_string).collect();
            println!("  RPN: {}", rpn.join(" | "));
            println!("  Attributes: {}", filter.expr().paths().join(", "));
        }
        Err(e) => {
            eprintln!("❌ Invalid filter: {}", e);
            process::exit(1);
        }
    }
}

fn print_schema_summary(schema: &Schema) {
    println!();
    println!("Schema Summary:");
    println!("  ID: {}", schema.id);
    println!("  Name: {}", schema.name);
    if !schema.description.is_empty() {
        println!("  Description: {}", schema.description);
    }
    println!("  Attributes: {}", schema.attributes.len());

    let required: Vec<&str> = schema
        .attributes
        .iter()
        .filter(|attr| attr.required)
        .map(|attr| attr.name.as_str())
        .collect();
    let multi_valued = schema.attributes.iter().filter(|attr| attr.multi_valued).count();

    println!("  Required attributes: {}", required.len());
    println!("  Multi-valued attributes: {}", multi_valued);

    let mut type_counts = BTreeMap::new();
    count_types(&schema.attributes, &mut type_counts);
    println!("  Attribute types (including sub-attributes):");
    for (attr_type, count) in type_counts {
        println!("    - {}: {}", attr_type, count);
    }

    if !required.is_empty() {
        println!("  Required attribute names: {}", required.join(", "));
    }
}

fn count_types(attributes: &[AttributeDefinition], counts: &mut BTreeMap<String, usize>) {
    for attr in attributes {
        *counts.entry(attr.data_type.to_string()).or_insert(0) += 1;
        count_types(&attr.sub_attributes, counts);
    }
}
