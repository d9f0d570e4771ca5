#![no_main]

use libfuzzer_sys::fuzz_target;
use reorder_fields::{reorder_fields, SourceCorpus, SourceModel};
use std::path::PathBuf;

fuzz_target!(|data: &[u8]| {
    // Lex and parse errors are fine, panics are not
    if let Ok(input) = std::str::from_utf8(data) {
        let Ok(corpus) = SourceCorpus::from_sources(vec![(PathBuf::from("fuzz.cpp"), input.to_string())]) else {
            return;
        };
        if let Ok(record) = corpus.find_record("S") {
            let _ = corpus.constructors(&record);
            let _ = corpus.aggregate_inits(&record);
            let mut names: Vec<String> = record.fields.iter().map(|f| f.name.clone()).collect();
            names.reverse();
            let _ = reorder_fields(&corpus, "S", names.as_slice());
        }
    }
});
