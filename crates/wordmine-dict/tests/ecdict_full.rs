use std::env;
use std::path::PathBuf;

use wordmine_dict::{Dictionary, EcdictDictionary, LoadMode};

fn dict_path() -> Option<PathBuf> {
    env::var("WORDMINE_DICT").ok().map(PathBuf::from)
}

#[test]
fn loads_full_ecdict_export() {
    let Some(path) = dict_path() else {
        eprintln!("skipping: WORDMINE_DICT not set");
        return;
    };
    let dict = EcdictDictionary::load_with_mode(&path, LoadMode::Mmap).expect("load ecdict");

    assert!(dict.len() > 100_000, "dictionary too small");
    assert!(dict.contains("dog"));
    let did = dict.query_batch(&["did".to_string()]);
    assert!(did.iter().any(|e| e.inflections.contains("0:do")));
}
