use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use wordmine_dict::{Dictionary, EcdictDictionary, LoadMode};
use wordmine_morph::{InflectionTable, Morphy};

const USAGE: &str =
    "usage: cargo run -p wordmine-morph --example lookup -- <ecdict.csv> [--exc <dir>] [--demo | <word>]";

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let dict_path = args.next().map(PathBuf::from).context(USAGE)?;

    let mut exc_dir = None;
    let mut words = Vec::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--exc" => exc_dir = Some(PathBuf::from(args.next().context(USAGE)?)),
            "--demo" => words.extend(
                ["running", "better", "children", "dogs", "happiest", "did"].map(String::from),
            ),
            _ => words.push(arg),
        }
    }
    if words.is_empty() {
        bail!(USAGE);
    }

    let dict = EcdictDictionary::load_with_mode(&dict_path, LoadMode::Mmap)
        .with_context(|| format!("loading dictionary from {}", dict_path.display()))?;
    let morph = match &exc_dir {
        Some(dir) => Morphy::load(dir)
            .with_context(|| format!("loading exceptions from {}", dir.display()))?,
        None => Morphy::builtin(),
    };

    println!("Dictionary: {}", dict_path.display());

    for word in words {
        println!("\nSurface: {word}");
        let declared = dict.query_batch(std::slice::from_ref(&word));
        if let Some(entry) = declared.first() {
            match InflectionTable::parse(&entry.inflections).lemma_of(&entry.value) {
                Some(lemma) => println!("  declared lemma: {lemma}"),
                None => println!("  declared lemma: (none)"),
            }
        } else {
            println!("  not in dictionary");
        }

        for candidate in morph.lemmas_for(&word, |w| dict.contains(w)) {
            println!(
                "  {:?}: {} ({:?})",
                candidate.class, candidate.lemma, candidate.source
            );
        }
    }

    Ok(())
}
