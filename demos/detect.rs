use std::env;
use std::fs;
use tree_records::{
    evaluate, mark_evaluation, mark_records, parse_document, record_text, reference_nodes,
    DetectConfig, Encoding, StructTree,
};

/// Detects record groups in an HTML or JSON file and prints their text.
///
/// Usage: cargo run --example detect <filename> [--encoding tag|signature|htp|structure]
///        [--len N] [--freq N] [--height N] [--size N] [--greedy] [--evaluate ATTR]
///        [--output FILE]
///
/// With `--evaluate`, elements carrying the attribute ATTR are the reference
/// records and recall/precision are printed. With `--output`, the document is
/// written to FILE as HTML with the detected records (or the evaluation
/// hits, misses and mistakes) marked by attributes and borders.
fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <filename> [options]", args[0]);
        std::process::exit(1);
    }

    let filename = &args[1];
    let mut config = DetectConfig::default();
    let mut reference_attr: Option<String> = None;
    let mut output: Option<String> = None;

    let mut rest = args[2..].iter();
    while let Some(flag) = rest.next() {
        if flag == "--greedy" {
            config.greedy = true;
            continue;
        }
        let value = rest.next().unwrap_or_else(|| {
            eprintln!("Missing value for {}", flag);
            std::process::exit(1);
        });
        match flag.as_str() {
            "--encoding" => {
                config.encoding = value.parse::<Encoding>().unwrap_or_else(|err| {
                    eprintln!("{}", err);
                    std::process::exit(1);
                })
            }
            "--len" => config.len_thresh = parse_number(flag, value),
            "--freq" => config.freq_thresh = parse_number(flag, value),
            "--height" => config.record_height_thresh = parse_number(flag, value),
            "--size" => config.record_size_thresh = parse_number(flag, value),
            "--evaluate" => reference_attr = Some(value.clone()),
            "--output" => output = Some(value.clone()),
            _ => {
                eprintln!("Unknown option {}", flag);
                std::process::exit(1);
            }
        }
    }

    let input = fs::read_to_string(filename).unwrap_or_else(|_| {
        eprintln!("File \"{}\" not found.", filename);
        std::process::exit(1);
    });

    let mut doc = parse_document(&input);
    let tree = StructTree::build(&doc);
    let region = tree.record_boundary(&doc, &config).unwrap_or_else(|err| {
        eprintln!("{}", err);
        std::process::exit(1);
    });

    println!("{} nodes, {} record groups", tree.len(), region.len());
    for (i, group) in region.iter().enumerate() {
        println!("\n=== Group {} ({} records) ===", i, group.len());
        for &index in group {
            let tag = doc.tag(tree[index].key);
            println!("  [{}] <{}> {}", index, tag, record_text(&tree, &doc, index));
        }
    }

    if let Some(attr) = reference_attr {
        let reference = reference_nodes(&tree, &doc, &attr);
        match evaluate(&tree, &doc, &region, &reference) {
            Ok(result) => {
                println!(
                    "\nRecall = {:.2}, precision = {:.2} ({} hits, {} misses, {} mistakes)",
                    result.recall(),
                    result.precision(),
                    result.hits.len(),
                    result.misses.len(),
                    result.mistakes.len()
                );
                mark_evaluation(&mut doc, &tree, &result);
            }
            Err(err) => {
                eprintln!("\n{} (attribute {})", err, attr);
                std::process::exit(1);
            }
        }
    } else {
        mark_records(&mut doc, &tree, &region);
    }

    if let Some(path) = output {
        if let Err(err) = fs::write(&path, doc.to_html()) {
            eprintln!("Cannot write \"{}\": {}", path, err);
            std::process::exit(1);
        }
        println!("Marked document written to {}", path);
    }
}

fn parse_number(flag: &str, value: &str) -> usize {
    value.parse().unwrap_or_else(|_| {
        eprintln!("{} expects a number, got {}", flag, value);
        std::process::exit(1);
    })
}
