use std::path::PathBuf;

use wordmine_dict::{Dictionary, EcdictDictionary};
use wordmine_morph::{InflectionTable, Morphy};

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../wordmine-dict/tests/fixtures/ecdict.csv")
}

#[test]
fn declared_lemmas_come_from_exchange_field() {
    let dict = EcdictDictionary::load(fixture()).expect("load fixture");
    let entries = dict.query_batch(&["did".to_string(), "dogs".to_string(), "do".to_string()]);
    let lemmas: Vec<Option<&str>> = entries
        .iter()
        .map(|e| InflectionTable::parse(&e.inflections).lemma_of(&e.value))
        .collect();
    assert_eq!(lemmas, vec![Some("do"), Some("dog"), None]);
}

#[test]
fn rules_fall_back_to_dictionary_membership() {
    let dict = EcdictDictionary::load(fixture()).expect("load fixture");
    let morph = Morphy::builtin();
    assert_eq!(
        morph.guess_lemma("doing", |w| dict.contains(w)).as_deref(),
        Some("do")
    );
    assert_eq!(morph.guess_lemma("zeitgeists", |w| dict.contains(w)).as_deref(), Some("zeitgeist"));
    assert_eq!(morph.guess_lemma("dog", |w| dict.contains(w)), None);
}
