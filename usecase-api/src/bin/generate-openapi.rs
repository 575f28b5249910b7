//! OpenAPI Specification Generator Binary
//!
//! Prints the Use Case API OpenAPI document as JSON to stdout.
//!
//! Usage:
//!   cargo run -p usecase-api --bin generate-openapi > openapi.json

use usecase_api::ApiDoc;

fn main() {
    match ApiDoc::to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize OpenAPI spec: {}", e);
            std::process::exit(1);
        }
    }
}
