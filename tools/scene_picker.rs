/// Scene picker: runs the selector on a stored draft and prints what it
/// chose and why.
///
/// Usage: scene_picker --draft <path.json> [--salt <s>] [--count <n>]

use rp_sheet::core::selector::{self, DEFAULT_SCENE_COUNT};
use rp_sheet::core::store::decode_draft;
use std::process;

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    let mut draft_path = None;
    let mut salt = String::from("preview");
    let mut count = DEFAULT_SCENE_COUNT;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--draft" if i + 1 < args.len() => {
                i += 1;
                draft_path = Some(args[i].clone());
            }
            "--salt" if i + 1 < args.len() => {
                i += 1;
                salt = args[i].clone();
            }
            "--count" if i + 1 < args.len() => {
                i += 1;
                count = args[i].parse().unwrap_or(DEFAULT_SCENE_COUNT);
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let Some(path) = draft_path else {
        print_usage();
        process::exit(1);
    };

    let contents = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: cannot read {}: {}", path, e);
            process::exit(1);
        }
    };
    let draft = match decode_draft(&contents) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("ERROR: {} is not a draft: {}", path, e);
            process::exit(1);
        }
    };

    println!("Seed: {:#010x} (salt '{}')", selector::seed_for(&draft, &salt), salt);

    let scores = selector::score_categories(&draft);
    println!("\nCategory scores:");
    for score in scores.iter().filter(|s| s.score > 0) {
        println!("  {:<14} {}", score.id, score.score);
    }

    let selection = selector::select(&draft, count, &salt);
    if selection.focus.is_empty() {
        println!("\nFocus: none, whole corpus ({} templates)", selection.pool_size);
    } else {
        println!(
            "\nFocus: {} ({} templates)",
            selection.focus.join(", "),
            selection.pool_size
        );
    }
    println!("Picked: {}", selection.ids().join(", "));

    for template in &selection.picks {
        let scene = selector::render(template, &draft);
        println!("\n=== {} [{}] {} ===", scene.id, scene.category_title, scene.title);
        println!("{}", scene.text);
    }
}

fn print_usage() {
    println!("Usage: scene_picker --draft <path.json> [--salt <s>] [--count <n>]");
    println!();
    println!("Print the scenes the selector picks for a draft file.");
    println!();
    println!("Options:");
    println!("  --draft <path>   Draft as a JSON object of field names to text");
    println!("  --salt <s>       Seed salt (default: preview)");
    println!("  --count <n>      Number of scenes (default: 2)");
}
