use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use wordmine_dict::{EcdictDictionary, LoadMode};

fn main() -> Result<()> {
    let path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: cargo run -p wordmine-dict --example stats -- <path-to-ecdict.csv>")?;

    let dict = EcdictDictionary::load_with_mode(&path, LoadMode::Mmap)
        .with_context(|| format!("loading dictionary from {}", path.display()))?;

    let mut bnc_ranked = 0usize;
    let mut coca_ranked = 0usize;
    let mut with_lemma = 0usize;
    let mut oxford = 0usize;

    for entry in dict.iter_entries() {
        if entry.bnc_rank > 0 {
            bnc_ranked += 1;
        }
        if entry.coca_rank > 0 {
            coca_ranked += 1;
        }
        if entry.inflections.split('/').any(|pair| pair.starts_with("0:")) {
            with_lemma += 1;
        }
        if entry.oxford {
            oxford += 1;
        }
    }

    println!("Dictionary: {}", path.display());
    println!("Headwords: {}", dict.len());
    println!("BNC ranked: {bnc_ranked}");
    println!("COCA ranked: {coca_ranked}");
    println!("Inflected forms (declare a lemma): {with_lemma}");
    println!("Oxford 3000: {oxford}");

    Ok(())
}
