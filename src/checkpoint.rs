//! Persisted state: the server's current best, written as the individual's
//! own document augmented with both fitness values at the top level.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::EsError;
use crate::individual::Individual;

pub fn write_checkpoint<I: Individual>(
    path: impl AsRef<Path>,
    individual: &I,
    fitness: f64,
    fitness2: f64,
) -> Result<(), EsError> {
    let mut doc = individual.to_document();
    if let Value::Object(map) = &mut doc {
        map.insert("fitness".to_string(), Value::from(fitness));
        map.insert("fitness2".to_string(), Value::from(fitness2));
    } else {
        doc = serde_json::json!({
            "state": doc,
            "fitness": fitness,
            "fitness2": fitness2,
        });
    }
    fs::write(path, serde_json::to_string_pretty(&doc)?)?;
    Ok(())
}

pub fn read_checkpoint<I: Individual>(path: impl AsRef<Path>, individual: &mut I) -> Result<(), EsError> {
    let text = fs::read_to_string(path)?;
    let doc: Value = serde_json::from_str(&text)?;
    individual.from_document(&doc)
}
