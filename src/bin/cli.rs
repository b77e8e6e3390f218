use chrono::{NaiveDate, Utc};
use study_hub::calendar::{self, format_12h};
use study_hub::chat::{ChatRole, GeminiClient, ImageAttachment};
use study_hub::config::{self, AppConfig, SharedStore};
use study_hub::persistence::{self, MemoryStore};
use study_hub::schedule::CurrentStatus;
use study_hub::ticker::local_now;
use study_hub::{AssessmentType, AssignmentKind, Dashboard, ManualAdjustment, MarkOutcome};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tokio::runtime::Runtime;

fn print_help() {
    println!(
        "Commands:\n  help                                    Show this help\n  status                                  Greeting, current class, next class and deadline\n  week                                    Show the weekly timetable\n  gpa                                     Cumulative GPA with current-term courses\n  grades                                  List recorded assessments\n  grade add <code> <type> <score> [title...]\n                                          Record an assessment (continuous|mid-term|final)\n  grade rm <id>                           Delete an assessment\n  attendance                              Attendance summary per course\n  attend <code> <present|absent> [YYYY-MM-DD]\n                                          Mark a session (same mark again clears it)\n  manual <code> <+|-> <present|absent>    Add or take back a manual session\n  history <code>                          Marks for the days around today\n  skips <code>                            Sessions that can be missed above 80%\n  assignments                             List assignments by due date\n  assign add <code> <YYYY-MM-DD> <type> <title...>\n                                          Add an assignment (assignment|exam|project|quiz)\n  assign done <id>                        Toggle pending/completed\n  assign rm <id>                          Delete an assignment\n  note [text...]                          Show or replace the personal note\n  dark [on|off]                           Show, toggle or set dark mode\n  attach <image_path>                     Attach an image to the next question\n  ask <question...>                       Ask the study assistant\n  chat [clear]                            Show or clear the chat history\n  tips <code>                             Study tips for a course\n  export grades <csv_path>                Write grades to CSV\n  import grades <csv_path>                Replace grades from CSV\n  quit|exit                               Exit"
    );
}

/// Match a course code at the start of `tokens`. Codes may be typed as one
/// token ("MAT1110") or two ("MAT 1110"); returns the code and tokens used.
fn take_course(dashboard: &Dashboard<SharedStore>, tokens: &[&str]) -> Option<(String, usize)> {
    let normalize = |value: &str| -> String {
        value
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase()
    };
    let codes = dashboard.timetable().course_codes();
    for used in (1..=tokens.len().min(2)).rev() {
        let candidate = normalize(&tokens[..used].join(""));
        if let Some(code) = codes.iter().find(|code| normalize(code) == candidate) {
            return Some((code.to_string(), used));
        }
    }
    None
}

fn parse_presence(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "present" | "p" | "yes" => Some(true),
        "absent" | "a" | "no" => Some(false),
        _ => None,
    }
}

fn image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn print_status(dashboard: &Dashboard<SharedStore>) {
    let now = local_now();
    let snapshot = dashboard.snapshot(now);
    println!("{}", dashboard.greeting(now));
    match &snapshot.status {
        CurrentStatus::Active { class } => println!(
            "Now      : {} {} in {} (until {})",
            class.code,
            class.title,
            class.room,
            format_12h(&class.end_time).unwrap_or_else(|_| class.end_time.clone())
        ),
        CurrentStatus::Upcoming {
            class,
            minutes_until,
        } => println!(
            "Upcoming : {} {} in {} minutes",
            class.code, class.title, minutes_until
        ),
        CurrentStatus::Free => println!("Now      : free"),
    }
    match &snapshot.next_class {
        Some(class) => println!(
            "Next     : {} {} {} at {}",
            class.day_name,
            class.code,
            class.title,
            format_12h(&class.start_time).unwrap_or_else(|_| class.start_time.clone())
        ),
        None => println!("Next     : none"),
    }
    match dashboard.next_deadline() {
        Some(assignment) => println!(
            "Deadline : {} ({}) due {}",
            assignment.title, assignment.course_code, assignment.due_date
        ),
        None => println!("Deadline : none"),
    }
    println!("GPA      : {}", dashboard.gpa());
    println!("Note     : {}", dashboard.personal_note());
}

fn print_week(dashboard: &Dashboard<SharedStore>) {
    for day in 0..7u8 {
        let classes = dashboard.timetable().classes_on(day);
        if classes.is_empty() {
            continue;
        }
        println!("{}", calendar::day_name(day).unwrap_or_default());
        for class in classes {
            println!(
                "  {:>8} - {:>8}  {:<9} {:<40} {}",
                format_12h(&class.start_time).unwrap_or_else(|_| class.start_time.clone()),
                format_12h(&class.end_time).unwrap_or_else(|_| class.end_time.clone()),
                class.code,
                class.title,
                class.room
            );
        }
    }
}

fn print_gpa(dashboard: &Dashboard<SharedStore>) {
    let breakdown = dashboard.gpa_breakdown();
    println!("Cumulative GPA: {}", dashboard.gpa());
    println!(
        "  transcript {:.1} credits / {:.2} points, current term {:.1} credits / {:.2} points",
        breakdown.historical_credits,
        breakdown.historical_tgp,
        breakdown.current_credits,
        breakdown.current_tgp
    );
    for summary in dashboard.course_summaries() {
        println!(
            "  {:<9} {:>6.2} marks  {:<3} {:.2}  ({} assessments)",
            summary.code, summary.total_marks, summary.letter, summary.grade_point, summary.assessments
        );
    }
}

fn print_grades(dashboard: &Dashboard<SharedStore>) {
    if dashboard.grades().is_empty() {
        println!("No grades recorded.");
        return;
    }
    for grade in dashboard.grades() {
        println!(
            "  [{}] {:<9} {:<10} {:>5.1}/{:<4} {}",
            grade.id, grade.course_code, grade.kind, grade.score, grade.weight, grade.title
        );
    }
}

fn print_attendance(dashboard: &Dashboard<SharedStore>) {
    for code in dashboard.timetable().course_codes() {
        let detail = dashboard.attendance_detail(code);
        println!(
            "  {:<9} {:>3}/{:<3} {:>3}%  safe skips: {}",
            code,
            detail.present,
            detail.total,
            detail.percentage,
            dashboard.skip_margin(code)
        );
    }
    let totals = dashboard.attendance_totals();
    println!(
        "  overall   {:>3}/{:<3} {:>3}%",
        totals.present, totals.total, totals.percentage
    );
}

fn print_history(dashboard: &Dashboard<SharedStore>, code: &str) {
    let today = local_now().date();
    for date in calendar::attendance_window(today) {
        let key = study_hub::attendance::date_key(code, date);
        let mark = match dashboard.attendance().get(&key) {
            Some(true) => "present",
            Some(false) => "absent",
            None => "-",
        };
        let marker = if date == today { "*" } else { " " };
        println!("  {marker}{} {}", date.format("%a %Y-%m-%d"), mark);
    }
}

fn print_assignments(dashboard: &Dashboard<SharedStore>) {
    let sorted = dashboard.assignments_by_due();
    if sorted.is_empty() {
        println!("No assignments.");
        return;
    }
    for assignment in sorted {
        println!(
            "  [{}] {} {:<9} {:<10} {:<9} {}",
            assignment.id,
            assignment.due_date,
            assignment.course_code,
            assignment.kind,
            assignment.status.as_str(),
            assignment.title
        );
    }
}

fn print_chat(dashboard: &Dashboard<SharedStore>) {
    if dashboard.chat().messages().is_empty() {
        println!("No messages yet.");
        return;
    }
    for message in dashboard.chat().messages() {
        let who = match message.role {
            ChatRole::User => "you",
            ChatRole::Assistant => "assistant",
        };
        let image = if message.image.is_some() { " [image]" } else { "" };
        println!("{who}{image}: {}", message.content);
    }
}

fn open_store(config: &AppConfig) -> SharedStore {
    match config::open_store(config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Could not open data store ({e}); changes will not be saved.");
            Box::new(MemoryStore::new())
        }
    }
}

fn main() {
    config::init_tracing();
    let config = AppConfig::from_env();
    let mut dashboard =
        Dashboard::load(open_store(&config)).with_student_name(config.student_name.clone());

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            return;
        }
    };
    let client = match GeminiClient::new(config.gemini.clone()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to create chat client: {}", e);
            return;
        }
    };
    let mut pending_image: Option<String> = None;

    println!("Study Hub (CLI) - type 'help' for commands\n");
    print_status(&dashboard);

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let tokens: Vec<&str> = input.split_whitespace().collect();
        let cmd = tokens[0];
        let args = &tokens[1..];

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "status" => print_status(&dashboard),
            "week" => print_week(&dashboard),
            "gpa" => print_gpa(&dashboard),
            "grades" => print_grades(&dashboard),
            "attendance" => print_attendance(&dashboard),
            "assignments" => print_assignments(&dashboard),
            "grade" => match args.first().copied() {
                Some("add") => {
                    let rest = &args[1..];
                    let Some((code, used)) = take_course(&dashboard, rest) else {
                        println!("Unknown course");
                        continue;
                    };
                    let rest = &rest[used..];
                    let (Some(kind_s), Some(score_s)) = (rest.first(), rest.get(1)) else {
                        println!("Usage: grade add <code> <type> <score> [title...]");
                        continue;
                    };
                    let Some(kind) = AssessmentType::from_str(kind_s) else {
                        println!("Invalid type (continuous|mid-term|final)");
                        continue;
                    };
                    let score: f64 = match score_s.parse() {
                        Ok(v) => v,
                        Err(_) => {
                            println!("Invalid score");
                            continue;
                        }
                    };
                    let title = rest[2..].join(" ");
                    match dashboard.add_grade(&code, &title, score, kind, Utc::now()) {
                        Ok(grade) => println!(
                            "Recorded {} {} for {} (id {}).",
                            grade.kind, grade.score, grade.course_code, grade.id
                        ),
                        Err(e) => println!("Error: {}", e),
                    }
                }
                Some("rm") => match args.get(1) {
                    Some(id) => match dashboard.remove_grade(id) {
                        Ok(true) => println!("Deleted grade {id}."),
                        Ok(false) => println!("Grade {id} not found."),
                        Err(e) => println!("Error: {}", e),
                    },
                    None => println!("Usage: grade rm <id>"),
                },
                _ => println!("Usage: grade <add|rm> ..."),
            },
            "attend" => {
                let Some((code, used)) = take_course(&dashboard, args) else {
                    println!("Unknown course");
                    continue;
                };
                let rest = &args[used..];
                let Some(present) = rest.first().and_then(|v| parse_presence(v)) else {
                    println!("Usage: attend <code> <present|absent> [YYYY-MM-DD]");
                    continue;
                };
                let date = match rest.get(1) {
                    Some(date_s) => match NaiveDate::parse_from_str(date_s, "%Y-%m-%d") {
                        Ok(d) => d,
                        Err(_) => {
                            println!("Invalid date (YYYY-MM-DD)");
                            continue;
                        }
                    },
                    None => local_now().date(),
                };
                match dashboard.mark_attendance(&code, present, date) {
                    Ok(MarkOutcome::Recorded { key, present }) => println!(
                        "Marked {key} {}.",
                        if present { "present" } else { "absent" }
                    ),
                    Ok(MarkOutcome::Cleared { key }) => println!("Cleared {key}."),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "manual" => {
                let Some((code, used)) = take_course(&dashboard, args) else {
                    println!("Unknown course");
                    continue;
                };
                let rest = &args[used..];
                let increment = match rest.first().copied() {
                    Some("+") => true,
                    Some("-") => false,
                    _ => {
                        println!("Usage: manual <code> <+|-> <present|absent>");
                        continue;
                    }
                };
                let Some(present) = rest.get(1).and_then(|v| parse_presence(v)) else {
                    println!("Usage: manual <code> <+|-> <present|absent>");
                    continue;
                };
                match dashboard.adjust_attendance(&code, increment, present, Utc::now()) {
                    Ok(ManualAdjustment::Added { key }) => println!("Added {key}."),
                    Ok(ManualAdjustment::Removed { key }) => println!("Removed {key}."),
                    Ok(ManualAdjustment::NothingToRemove) => {
                        println!("No manual session to remove for {code}.")
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "history" => match take_course(&dashboard, args) {
                Some((code, _)) => print_history(&dashboard, &code),
                None => println!("Usage: history <code>"),
            },
            "skips" => match take_course(&dashboard, args) {
                Some((code, _)) => {
                    let detail = dashboard.attendance_detail(&code);
                    println!(
                        "{code}: {}% attendance, can miss {} more session(s).",
                        detail.percentage,
                        dashboard.skip_margin(&code)
                    );
                }
                None => println!("Usage: skips <code>"),
            },
            "assign" => match args.first().copied() {
                Some("add") => {
                    let rest = &args[1..];
                    let Some((code, used)) = take_course(&dashboard, rest) else {
                        println!("Unknown course");
                        continue;
                    };
                    let rest = &rest[used..];
                    if rest.len() < 3 {
                        println!("Usage: assign add <code> <YYYY-MM-DD> <type> <title...>");
                        continue;
                    }
                    let due = match NaiveDate::parse_from_str(rest[0], "%Y-%m-%d") {
                        Ok(d) => d,
                        Err(_) => {
                            println!("Invalid date (YYYY-MM-DD)");
                            continue;
                        }
                    };
                    let Some(kind) = AssignmentKind::from_str(rest[1]) else {
                        println!("Invalid type (assignment|exam|project|quiz)");
                        continue;
                    };
                    let title = rest[2..].join(" ");
                    match dashboard.add_assignment(&title, &code, due, kind, Utc::now()) {
                        Ok(assignment) => println!(
                            "Added {} '{}' due {} (id {}).",
                            assignment.kind, assignment.title, assignment.due_date, assignment.id
                        ),
                        Err(e) => println!("Error: {}", e),
                    }
                }
                Some("done") => match args.get(1) {
                    Some(id) => match dashboard.toggle_assignment(id) {
                        Ok(Some(status)) => println!("Assignment {id} is now {}.", status.as_str()),
                        Ok(None) => println!("Assignment {id} not found."),
                        Err(e) => println!("Error: {}", e),
                    },
                    None => println!("Usage: assign done <id>"),
                },
                Some("rm") => match args.get(1) {
                    Some(id) => match dashboard.remove_assignment(id) {
                        Ok(true) => println!("Deleted assignment {id}."),
                        Ok(false) => println!("Assignment {id} not found."),
                        Err(e) => println!("Error: {}", e),
                    },
                    None => println!("Usage: assign rm <id>"),
                },
                _ => println!("Usage: assign <add|done|rm> ..."),
            },
            "note" => {
                if args.is_empty() {
                    println!("{}", dashboard.personal_note());
                } else {
                    match dashboard.set_personal_note(&args.join(" ")) {
                        Ok(()) => println!("Note saved."),
                        Err(e) => println!("Error: {}", e),
                    }
                }
            }
            "dark" => {
                let result = match args.first().copied() {
                    Some("on") => dashboard.set_dark_mode(true).map(|_| true),
                    Some("off") => dashboard.set_dark_mode(false).map(|_| false),
                    None => dashboard.toggle_dark_mode(),
                    Some(_) => {
                        println!("Usage: dark [on|off]");
                        continue;
                    }
                };
                match result {
                    Ok(enabled) => println!("Dark mode {}.", if enabled { "on" } else { "off" }),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "attach" => {
                let Some(path_s) = args.first() else {
                    println!("Usage: attach <image_path>");
                    continue;
                };
                let path = Path::new(path_s);
                let Some(mime) = image_mime(path) else {
                    println!("Unsupported image type (png|jpg|jpeg|gif|webp)");
                    continue;
                };
                match fs::read(path) {
                    Ok(bytes) => {
                        pending_image = Some(ImageAttachment::from_bytes(mime, &bytes).to_data_url());
                        println!("Attached {} for the next question.", path.display());
                    }
                    Err(e) => println!("Error reading image: {}", e),
                }
            }
            "ask" => {
                let question = args.join(" ");
                let image = pending_image.take();
                let result =
                    runtime.block_on(dashboard.ask(&client, &question, image.as_deref()));
                match result {
                    Ok(reply) => println!("{}", reply.content),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "chat" => match args.first().copied() {
                Some("clear") => match dashboard.clear_chat() {
                    Ok(()) => println!("Chat history cleared."),
                    Err(e) => println!("Error: {}", e),
                },
                None => print_chat(&dashboard),
                Some(_) => println!("Usage: chat [clear]"),
            },
            "tips" => match take_course(&dashboard, args) {
                Some((code, _)) => {
                    let tips = runtime.block_on(dashboard.study_tips(&client, &code));
                    println!("{tips}");
                }
                None => println!("Usage: tips <code>"),
            },
            "export" | "import" => {
                let (Some(&"grades"), Some(path)) = (args.first(), args.get(1)) else {
                    println!("Usage: {cmd} grades <csv_path>");
                    continue;
                };
                if cmd == "export" {
                    match persistence::save_grades_to_csv(dashboard.grades(), path) {
                        Ok(()) => println!("Grades exported to {path}."),
                        Err(e) => println!("Error: {}", e),
                    }
                } else {
                    let loaded = persistence::load_grades_from_csv(path)
                        .and_then(|grades| {
                            let count = grades.len();
                            dashboard.replace_grades(grades).map(|_| count)
                        });
                    match loaded {
                        Ok(count) => println!("Imported {count} grades from {path}."),
                        Err(e) => println!("Error: {}", e),
                    }
                }
            }
            _ => println!("Unknown command. Type 'help'."),
        }
    }
}
