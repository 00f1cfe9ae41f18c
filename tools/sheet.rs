/// Sheet: interactive terminal host for the character sheet wizard.
///
/// Usage: sheet [--config <path>] [--data-dir <path>] [--step <name>] [--setup]
///
/// Commands:
///   steps                 list steps with their done flags
///   next / prev           move one step
///   goto <step>           open a step by name
///   set <field> <text>    set a draft field (empty text clears it)
///   show                  print the current step's fields
///   generate [salt]       pick scenes for the draft
///   scenes                print generated or saved scenes
///   copy <1|2>            copy a scene to the clipboard
///   library [id]          list templates, or print one filled
///   copylib <id>          copy a library template, filled
///   review                print the review summary
///   endpoint <url>        store an endpoint override (setup mode)
///   submit                send the sheet
///   clear                 wipe the draft
///   help                  list commands
///   quit                  exit

use async_trait::async_trait;
use copypasta::{ClipboardContext, ClipboardProvider};
use rp_sheet::core::config::SheetConfig;
use rp_sheet::core::store::{FileStore, KeyValueStore};
use rp_sheet::core::submit::SubmitOutcome;
use rp_sheet::core::wizard::{Clipboard, ClipboardError, Severity, Wizard};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use rp_sheet::schema::step::{StepId, STEPS};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// System clipboard through copypasta.
struct SystemClipboard;

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn copy(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut ctx =
            ClipboardContext::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        ctx.set_contents(text.to_string())
            .map_err(|e| ClipboardError::Rejected(e.to_string()))
    }
}

/// Writes the text to a file the user can open and copy from.
struct FileDrop {
    path: PathBuf,
}

#[async_trait]
impl Clipboard for FileDrop {
    async fn copy(&mut self, text: &str) -> Result<(), ClipboardError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| ClipboardError::Rejected(e.to_string()))?;
        }
        std::fs::write(&self.path, text).map_err(|e| ClipboardError::Rejected(e.to_string()))?;
        println!("(written to {})", self.path.display());
        Ok(())
    }
}

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    let mut config_path = None;
    let mut data_dir = None;
    let mut step = StepId::Profile;
    let mut setup = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return;
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(PathBuf::from(&args[i]));
            }
            "--data-dir" if i + 1 < args.len() => {
                i += 1;
                data_dir = Some(PathBuf::from(&args[i]));
            }
            "--step" if i + 1 < args.len() => {
                i += 1;
                step = match StepId::parse(&args[i]) {
                    Some(s) => s,
                    None => {
                        eprintln!("Unknown step: {}", args[i]);
                        std::process::exit(1);
                    }
                };
            }
            "--setup" => setup = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(ref path) => load_config(path),
        None => SheetConfig::default(),
    }
    .with_env_overrides();
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    config.setup_mode |= setup;

    let runtime = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("ERROR: cannot start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let drop_path = config.data_dir.join("clipboard.txt");
    let backend = FileStore::new(config.data_dir.clone());
    let mut wizard = Wizard::new(backend, config, step);

    println!("Draft stored in {}", wizard.store().backend().dir().display());
    println!("Type 'help' for commands.\n");
    print_step(&wizard);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut pending: Option<JoinHandle<SubmitOutcome>> = None;

    loop {
        if pending.as_ref().is_some_and(|h| h.is_finished()) {
            if let Some(handle) = pending.take() {
                settle(&runtime, &mut wizard, handle);
            }
        }

        print!("sheet[{}]> ", wizard.current_step().id.name());
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (cmd, rest) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd.to_lowercase(), rest.trim()),
            None => (line.to_lowercase(), ""),
        };

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "steps" => {
                for (id, done) in wizard.step_states() {
                    let marker = if id == wizard.current_step().id { ">" } else { " " };
                    let check = if done { "x" } else { " " };
                    println!("{} [{}] {}", marker, check, id.name());
                }
            }
            "next" => {
                wizard.go_to_step(1);
                print_step(&wizard);
            }
            "prev" => {
                wizard.go_to_step(-1);
                print_step(&wizard);
            }
            "goto" => match StepId::parse(rest) {
                Some(id) => {
                    wizard.open(id);
                    print_step(&wizard);
                }
                None => println!("Usage: goto <profile|backstory|traits|connections|goals|scenes>"),
            },
            "set" => {
                let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                if field.is_empty() {
                    println!("Usage: set <field> <text>");
                    continue;
                }
                if !STEPS.iter().any(|s| s.fields.iter().any(|f| *f == field)) {
                    println!("Unknown field: {}", field);
                    continue;
                }
                wizard.set_field(field, value.trim());
                if let Some(warning) = wizard.dob_warning() {
                    println!("! {}", warning);
                }
            }
            "show" => print_step(&wizard),
            "generate" => {
                if rest.is_empty() {
                    wizard.generate();
                } else {
                    wizard.generate_with_salt(rest);
                }
                print_status(&wizard);
                print_scenes(&wizard);
            }
            "scenes" => print_scenes(&wizard),
            "copy" => {
                let index = match rest.parse::<usize>() {
                    Ok(n @ 1..=2) => n - 1,
                    _ => {
                        println!("Usage: copy <1|2>");
                        continue;
                    }
                };
                if wizard.scene_text(index).is_none() {
                    println!("No scene {} yet. Run 'generate' first.", index + 1);
                    continue;
                }
                let mut system = SystemClipboard;
                let mut file = FileDrop {
                    path: drop_path.clone(),
                };
                let mut chain: [&mut dyn Clipboard; 2] = [&mut system, &mut file];
                runtime.block_on(wizard.copy_scene(index, &mut chain));
                print_status(&wizard);
            }
            "copylib" => {
                if wizard.library_scene(rest).is_none() {
                    println!("Usage: copylib <id>  (see 'library')");
                    continue;
                }
                let mut system = SystemClipboard;
                let mut file = FileDrop {
                    path: drop_path.clone(),
                };
                let mut chain: [&mut dyn Clipboard; 2] = [&mut system, &mut file];
                runtime.block_on(wizard.copy_library_scene(rest, &mut chain));
                print_status(&wizard);
            }
            "library" => {
                if rest.is_empty() {
                    for entry in wizard.library() {
                        println!(
                            "{}  [{}] {} · {}",
                            entry.id, entry.category_title, entry.title, entry.location
                        );
                    }
                } else {
                    match wizard.library_scene(rest) {
                        Some(text) => println!("\n{}\n", text),
                        None => println!("No template '{}'.", rest),
                    }
                }
            }
            "review" => {
                wizard.open(StepId::Scenes);
                for row in wizard.review() {
                    let value = if row.value.is_empty() { "-" } else { row.value.as_str() };
                    println!("{:>12}: {}", row.label, value);
                }
            }
            "endpoint" => {
                if rest.is_empty() {
                    println!("Endpoint: {}", display_endpoint(&wizard.effective_endpoint()));
                    continue;
                }
                if !wizard.set_endpoint(rest) {
                    println!("Endpoint can only be changed with --setup.");
                }
                print_status(&wizard);
            }
            "submit" => {
                if pending.is_some() {
                    println!("A submission is still in flight.");
                    continue;
                }
                if let Some(prepared) = wizard.prepare_submission() {
                    let _guard = runtime.enter();
                    pending = Some(wizard.client().dispatch(prepared.endpoint, prepared.payload));
                }
                print_status(&wizard);
            }
            "clear" => {
                wizard.clear();
                println!("Draft cleared.");
            }
            _ => println!("Unknown command: {}. Type 'help' for commands.", cmd),
        }
    }

    if let Some(handle) = pending.take() {
        println!("Waiting for the submission to finish...");
        settle(&runtime, &mut wizard, handle);
    }
}

/// Wait for a dispatched submission and report its outcome.
fn settle<S: KeyValueStore>(
    runtime: &Runtime,
    wizard: &mut Wizard<S>,
    handle: JoinHandle<SubmitOutcome>,
) {
    let outcome = runtime
        .block_on(handle)
        .unwrap_or_else(|e| SubmitOutcome::TransportError(e.to_string()));
    wizard.finish_submission(&outcome);
    print_status(wizard);
}

fn load_config(path: &Path) -> SheetConfig {
    match SheetConfig::load_from_ron(path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Warning: failed to load config from {}: {}", path.display(), e);
            SheetConfig::default()
        }
    }
}

fn display_endpoint(url: &str) -> &str {
    if url.is_empty() {
        "(not configured)"
    } else {
        url
    }
}

fn print_step<S: KeyValueStore>(wizard: &Wizard<S>) {
    let step = wizard.current_step();
    let progress = wizard.progress();
    println!("--- {} ({}%): {} ---", progress.label(), progress.percent, step.id.name());
    for field in step.fields {
        println!("{:>12}: {}", field, wizard.draft().get(field));
    }
    if step.id == StepId::Scenes && wizard.guide_visible() {
        println!(
            "Endpoint: {} (set {} or run with --setup)",
            display_endpoint(&wizard.effective_endpoint()),
            rp_sheet::core::config::ENDPOINT_ENV
        );
    }
    print_status(wizard);
}

fn print_scenes<S: KeyValueStore>(wizard: &Wizard<S>) {
    if !wizard.scenes().is_empty() {
        for (n, scene) in wizard.scenes().iter().enumerate() {
            println!("\n--- Scene {}: {} [{}] ({}) ---", n + 1, scene.title, scene.category_title, scene.id);
            println!("{}", scene.text);
        }
        println!();
        return;
    }
    match wizard.saved_scenes() {
        Some(saved) => {
            for (n, text) in saved.iter().enumerate() {
                println!("\n--- Saved scene {} ---", n + 1);
                println!("{}", text);
            }
            println!();
        }
        None => println!("No scenes yet. Run 'generate'."),
    }
}

fn print_status<S: KeyValueStore>(wizard: &Wizard<S>) {
    if let Some(status) = wizard.status() {
        let tag = match status.severity {
            Severity::Info => "info",
            Severity::Ok => "ok",
            Severity::Warning => "warn",
            Severity::Error => "error",
        };
        println!("[{}] {}", tag, status.text);
    }
}

fn print_usage() {
    println!("Usage: sheet [--config <path>] [--data-dir <path>] [--step <name>] [--setup]");
    println!();
    println!("Interactive character sheet wizard.");
    println!();
    println!("Options:");
    println!("  --config <path>     RON config file");
    println!("  --data-dir <path>   Directory holding the draft");
    println!("  --step <name>       Step to open first (default: profile)");
    println!("  --setup             Allow editing the submission endpoint");
}

fn print_help() {
    println!("Commands:");
    println!("  steps                 List steps with their done flags");
    println!("  next / prev           Move one step");
    println!("  goto <step>           Open a step by name");
    println!("  set <field> <text>    Set a draft field (empty text clears it)");
    println!("  show                  Print the current step's fields");
    println!("  generate [salt]       Pick scenes for the draft");
    println!("  scenes                Print generated or saved scenes");
    println!("  copy <1|2>            Copy a scene to the clipboard");
    println!("  library [id]          List templates, or print one filled");
    println!("  copylib <id>          Copy a library template, filled");
    println!("  review                Print the review summary");
    println!("  endpoint [url]        Show or set the endpoint (setup mode)");
    println!("  submit                Send the sheet");
    println!("  clear                 Wipe the draft");
    println!("  help                  Show this help");
    println!("  quit                  Exit");
}
